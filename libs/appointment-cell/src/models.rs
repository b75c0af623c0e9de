// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use schedule_cell::models::{ProfessionalRef, ProfessionalType};

/// Longest accepted booking note, in characters.
pub const MAX_NOTES_CHARS: usize = 2000;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub professional_type: ProfessionalType,
    pub patient_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    #[serde(default)]
    pub meeting_link: Option<String>,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub platform_fee_cents: Option<i64>,
    #[serde(default)]
    pub professional_amount_cents: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn professional(&self) -> ProfessionalRef {
        ProfessionalRef::new(self.professional_id, self.professional_type)
    }

    /// A checkout was started and its reference recorded.
    pub fn is_paid(&self) -> bool {
        self.payment_reference.is_some()
    }

    pub fn holds_slot(&self) -> bool {
        self.status.holds_slot()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[serde(alias = "pendente")]
    Pending,
    #[serde(alias = "confirmado")]
    Confirmed,
    #[serde(alias = "cancelado")]
    Cancelled,
    #[serde(alias = "concluido")]
    Completed,
}

impl AppointmentStatus {
    /// Pending and confirmed appointments occupy their slot.
    pub fn holds_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pending" | "pendente" => Ok(AppointmentStatus::Pending),
            "confirmed" | "confirmado" => Ok(AppointmentStatus::Confirmed),
            "cancelled" | "canceled" | "cancelado" => Ok(AppointmentStatus::Cancelled),
            "completed" | "concluido" => Ok(AppointmentStatus::Completed),
            other => Err(format!("unknown appointment status '{}'", other)),
        }
    }
}

/// One row of an appointment's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChange {
    pub appointment_id: Uuid,
    pub previous_status: Option<AppointmentStatus>,
    pub new_status: AppointmentStatus,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub professional_id: Uuid,
    pub professional_type: ProfessionalType,
    /// Admins book on behalf of a patient; patients always book for themselves.
    pub patient_id: Option<Uuid>,
    /// Exact UTC start. Alternatively send `date` plus clinic-local `time`.
    pub scheduled_at: Option<DateTime<Utc>>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub notes: Option<String>,
}

impl BookAppointmentRequest {
    pub fn professional(&self) -> ProfessionalRef {
        ProfessionalRef::new(self.professional_id, self.professional_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub patient_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
    pub professional_type: Option<ProfessionalType>,
    pub status: Option<AppointmentStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.professional_id.map_or(true, |id| appointment.professional_id == id)
            && self.professional_type.map_or(true, |t| appointment.professional_type == t)
            && self.status.map_or(true, |s| appointment.status == s)
            && self.from.map_or(true, |from| appointment.scheduled_at >= from)
            && self.to.map_or(true, |to| appointment.scheduled_at < to)
    }
}

/// Payment details recorded on the appointment when a checkout starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRecord {
    pub payment_reference: String,
    pub platform_fee_cents: i64,
    pub professional_amount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutResponse {
    pub appointment_id: Uuid,
    pub checkout_url: String,
    pub payment_reference: String,
    pub amount_cents: i64,
    pub platform_fee_cents: i64,
    pub professional_amount_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefundOutcome {
    NotRequired,
    Refunded { payment_reference: String, refund_id: String },
    Failed { payment_reference: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    pub appointment: Appointment,
    pub previous_status: AppointmentStatus,
    pub refund: RefundOutcome,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("This time slot was just taken, please pick another one")]
    SlotConflict,

    #[error("Professional not found")]
    ProfessionalNotFound,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Requested time is outside the professional's working hours")]
    OutsideWorkingHours,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment status changed concurrently, reload and try again")]
    StaleStatus,

    #[error("Appointment already has a payment")]
    AlreadyPaid,

    #[error("Unauthorized access to appointment: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),
}
