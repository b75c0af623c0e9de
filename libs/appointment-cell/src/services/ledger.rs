use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use schedule_cell::models::ProfessionalRef;
use shared_database::DatabaseError;

use crate::models::{Appointment, AppointmentError, AppointmentFilter, AppointmentStatus, PaymentRecord, StatusChange};

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    /// Another active appointment already holds `(professional_id, scheduled_at)`.
    #[error("slot already taken")]
    SlotTaken,

    /// The row no longer has the expected status.
    #[error("appointment status changed concurrently")]
    StaleStatus,

    #[error("appointment not found")]
    NotFound,

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

impl From<DatabaseError> for LedgerError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Conflict(_) => LedgerError::SlotTaken,
            DatabaseError::NotFound(_) => LedgerError::NotFound,
            other => LedgerError::Unavailable(other.to_string()),
        }
    }
}

impl From<LedgerError> for AppointmentError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::SlotTaken => AppointmentError::SlotConflict,
            LedgerError::StaleStatus => AppointmentError::StaleStatus,
            LedgerError::NotFound => AppointmentError::NotFound,
            LedgerError::Unavailable(msg) => AppointmentError::DatabaseError(msg),
        }
    }
}

/// Authoritative record of appointments.
#[async_trait]
pub trait AppointmentLedger: Send + Sync {
    /// Start instants of pending or confirmed appointments in `[from, to)`.
    async fn occupied_between(
        &self,
        professional: ProfessionalRef,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, LedgerError>;

    /// Atomic check-and-insert on `(professional_id, scheduled_at)` over active statuses.
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, LedgerError>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, LedgerError>;

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, LedgerError>;

    /// Compare-and-set on the current status.
    async fn transition(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        at: DateTime<Utc>,
    ) -> Result<Appointment, LedgerError>;

    async fn set_meeting_link(&self, id: Uuid, link: &str) -> Result<(), LedgerError>;

    /// Records a payment on an appointment that still holds its slot.
    async fn record_payment(
        &self,
        id: Uuid,
        payment: &PaymentRecord,
        at: DateTime<Utc>,
    ) -> Result<Appointment, LedgerError>;

    async fn append_history(&self, change: StatusChange) -> Result<(), LedgerError>;

    async fn status_history(&self, id: Uuid) -> Result<Vec<StatusChange>, LedgerError>;
}

// ==============================================================================
// IN MEMORY
// ==============================================================================

#[derive(Default)]
struct LedgerState {
    appointments: HashMap<Uuid, Appointment>,
    /// `(professional_id, scheduled_at) -> appointment id` for active appointments.
    claims: HashMap<(Uuid, DateTime<Utc>), Uuid>,
    history: HashMap<Uuid, Vec<StatusChange>>,
}

/// Process-local ledger. Every check-and-write runs under one write guard.
#[derive(Default)]
pub struct InMemoryAppointmentLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryAppointmentLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentLedger for InMemoryAppointmentLedger {
    async fn occupied_between(
        &self,
        professional: ProfessionalRef,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, LedgerError> {
        let state = self.state.read().await;
        let mut taken: Vec<DateTime<Utc>> = state
            .appointments
            .values()
            .filter(|a| {
                a.professional_id == professional.id
                    && a.professional_type == professional.professional_type
                    && a.holds_slot()
                    && a.scheduled_at >= from
                    && a.scheduled_at < to
            })
            .map(|a| a.scheduled_at)
            .collect();
        taken.sort();
        Ok(taken)
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, LedgerError> {
        let mut state = self.state.write().await;
        let key = (appointment.professional_id, appointment.scheduled_at);

        if appointment.holds_slot() {
            if state.claims.contains_key(&key) {
                debug!("Slot {} already claimed for {}", appointment.scheduled_at, appointment.professional_id);
                return Err(LedgerError::SlotTaken);
            }
            state.claims.insert(key, appointment.id);
        }

        state.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, LedgerError> {
        Ok(self.state.read().await.appointments.get(&id).cloned())
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, LedgerError> {
        let state = self.state.read().await;
        let mut found: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        found.sort_by_key(|a| (a.scheduled_at, a.created_at));
        Ok(found)
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        at: DateTime<Utc>,
    ) -> Result<Appointment, LedgerError> {
        let mut state = self.state.write().await;
        let appointment = state.appointments.get_mut(&id).ok_or(LedgerError::NotFound)?;

        if appointment.status != expected {
            return Err(LedgerError::StaleStatus);
        }

        appointment.status = next;
        appointment.updated_at = at;
        let updated = appointment.clone();

        if expected.holds_slot() && !next.holds_slot() {
            state.claims.remove(&(updated.professional_id, updated.scheduled_at));
        }

        Ok(updated)
    }

    async fn set_meeting_link(&self, id: Uuid, link: &str) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        let appointment = state.appointments.get_mut(&id).ok_or(LedgerError::NotFound)?;
        appointment.meeting_link = Some(link.to_string());
        Ok(())
    }

    async fn record_payment(
        &self,
        id: Uuid,
        payment: &PaymentRecord,
        at: DateTime<Utc>,
    ) -> Result<Appointment, LedgerError> {
        let mut state = self.state.write().await;
        let appointment = state.appointments.get_mut(&id).ok_or(LedgerError::NotFound)?;

        if !appointment.holds_slot() {
            return Err(LedgerError::StaleStatus);
        }

        appointment.payment_reference = Some(payment.payment_reference.clone());
        appointment.platform_fee_cents = Some(payment.platform_fee_cents);
        appointment.professional_amount_cents = Some(payment.professional_amount_cents);
        appointment.updated_at = at;
        Ok(appointment.clone())
    }

    async fn append_history(&self, change: StatusChange) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        state.history.entry(change.appointment_id).or_default().push(change);
        Ok(())
    }

    async fn status_history(&self, id: Uuid) -> Result<Vec<StatusChange>, LedgerError> {
        let state = self.state.read().await;
        Ok(state.history.get(&id).cloned().unwrap_or_default())
    }
}
