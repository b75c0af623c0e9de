// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use schedule_cell::models::{clock_time, is_on_grid, ClinicTimezone, Professional};
use shared_config::AppConfig;
use shared_models::auth::{Role, Session};
use shared_utils::Clock;

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentStatus, BookAppointmentRequest,
    CheckoutResponse, PaymentRecord, RefundOutcome, StatusChange, StatusTransition, UpdateStatusRequest,
    MAX_NOTES_CHARS,
};
use crate::services::ledger::AppointmentLedger;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::meeting::MeetingLinkGenerator;
use crate::services::notifier::Notifier;
use crate::services::payment::{split_amount, CheckoutRequest, PaymentGateway};
use crate::services::slots::SlotPipeline;
use crate::state::AppointmentState;

pub struct AppointmentBookingService {
    config: Arc<AppConfig>,
    slots: SlotPipeline,
    ledger: Arc<dyn AppointmentLedger>,
    payments: Arc<dyn PaymentGateway>,
    meetings: Arc<dyn MeetingLinkGenerator>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    lifecycle_service: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(state: &AppointmentState) -> Self {
        Self {
            config: state.config().clone(),
            slots: SlotPipeline::new(state),
            ledger: state.ledger.clone(),
            payments: state.payments.clone(),
            meetings: state.meetings.clone(),
            notifier: state.notifier.clone(),
            clock: state.clock().clone(),
            lifecycle_service: AppointmentLifecycleService::new(),
        }
    }

    fn timezone(&self) -> ClinicTimezone {
        self.slots.availability().timezone()
    }

    /// Book a slot. The requested time is never swapped for another one.
    pub async fn create_appointment(
        &self,
        session: &Session,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let professional_ref = request.professional();
        info!("Booking request from {} for professional {}", session.user_id, professional_ref.id);

        // **Step 1: Who is booking for whom**
        let patient_id = self.resolve_patient(session, request.patient_id)?;

        // **Step 2: Timing validation**
        let scheduled_at = self.resolve_start(&request)?;
        let timezone = self.timezone();
        if !is_on_grid(timezone.local_time(scheduled_at)) {
            return Err(AppointmentError::ValidationError(
                "Appointments start on the hour or half hour".to_string(),
            ));
        }
        let now = self.clock.now();
        if scheduled_at < now {
            return Err(AppointmentError::InvalidTime(
                "Cannot book appointments in the past".to_string(),
            ));
        }
        let notes = normalize_notes(request.notes)?;

        // **Step 3: Professional and working hours**
        let professional = self.require_professional(professional_ref).await?;
        let candidates = self
            .slots
            .availability()
            .candidates_for(&professional, timezone.local_date(scheduled_at))
            .await;
        if !candidates.slots.iter().any(|slot| slot.starts_at == scheduled_at) {
            return Err(AppointmentError::OutsideWorkingHours);
        }

        // **Step 4: Fresh occupancy read**
        match self.slots.is_occupied(professional_ref, scheduled_at).await {
            Ok(true) => {
                info!("Slot {} for {} taken before submit", scheduled_at, professional_ref.id);
                return Err(AppointmentError::SlotConflict);
            }
            Ok(false) => {}
            Err(e) => warn!("Occupancy re-check failed, relying on the ledger: {}", e),
        }

        // **Step 5: Atomic commit**
        let appointment = Appointment {
            id: Uuid::new_v4(),
            professional_id: professional_ref.id,
            professional_type: professional_ref.professional_type,
            patient_id,
            scheduled_at,
            status: AppointmentStatus::Pending,
            notes,
            meeting_link: None,
            payment_reference: None,
            platform_fee_cents: None,
            professional_amount_cents: None,
            created_at: now,
            updated_at: now,
        };
        let appointment = self.ledger.insert(appointment).await?;
        info!("Appointment {} booked for {}", appointment.id, appointment.scheduled_at);

        // **Step 6: Post-commit side effects**
        self.record_history(StatusChange {
            appointment_id: appointment.id,
            previous_status: None,
            new_status: AppointmentStatus::Pending,
            changed_by: session.user_id,
            changed_at: now,
            reason: None,
        })
        .await;
        self.spawn_meeting_link(appointment.clone());

        Ok(appointment)
    }

    fn resolve_patient(&self, session: &Session, requested: Option<Uuid>) -> Result<Uuid, AppointmentError> {
        match session.role {
            Role::Admin => requested.ok_or_else(|| {
                AppointmentError::ValidationError("patient_id is required when booking as admin".to_string())
            }),
            Role::Patient => match requested {
                Some(id) if id != session.user_id => Err(AppointmentError::Unauthorized(
                    "Patients can only book for themselves".to_string(),
                )),
                _ => Ok(session.user_id),
            },
            Role::Psychologist | Role::Psychiatrist => Err(AppointmentError::Unauthorized(
                "Only patients can book appointments".to_string(),
            )),
        }
    }

    fn resolve_start(&self, request: &BookAppointmentRequest) -> Result<DateTime<Utc>, AppointmentError> {
        if let Some(at) = request.scheduled_at {
            return Ok(at);
        }

        match (request.date, request.time.as_deref()) {
            (Some(date), Some(time)) => {
                let time = clock_time::parse(time).map_err(AppointmentError::ValidationError)?;
                self.timezone().at(date, time).ok_or_else(|| {
                    AppointmentError::ValidationError(format!("Date {} is out of range", date))
                })
            }
            _ => Err(AppointmentError::ValidationError(
                "Provide scheduled_at, or date and time".to_string(),
            )),
        }
    }

    async fn require_professional(
        &self,
        professional: schedule_cell::models::ProfessionalRef,
    ) -> Result<Professional, AppointmentError> {
        self.slots
            .availability()
            .find_professional(professional)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::ProfessionalNotFound)
    }

    async fn record_history(&self, change: StatusChange) {
        let appointment_id = change.appointment_id;
        if let Err(e) = self.ledger.append_history(change).await {
            warn!("Failed to record status history for {}: {}", appointment_id, e);
        }
    }

    fn spawn_meeting_link(&self, appointment: Appointment) {
        let ledger = self.ledger.clone();
        let meetings = self.meetings.clone();
        let clock = self.clock.clone();

        tokio::spawn(async move {
            if let Err(e) = attach_meeting_link(ledger.as_ref(), meetings.as_ref(), clock.as_ref(), &appointment).await {
                warn!("Meeting link for {} not attached: {}", appointment.id, e);
            }
        });
    }

    // ==========================================================================
    // QUERIES
    // ==========================================================================

    pub async fn get_appointment(&self, session: &Session, id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.ledger.get(id).await?.ok_or(AppointmentError::NotFound)?;
        if !self.lifecycle_service.can_view(session, &appointment) {
            // Existence is not disclosed to strangers.
            return Err(AppointmentError::NotFound);
        }
        Ok(appointment)
    }

    pub async fn list_appointments(
        &self,
        session: &Session,
        filter: AppointmentFilter,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let scoped = self.lifecycle_service.scope_filter(session, filter);
        debug!("Listing appointments for {} with {:?}", session.user_id, scoped);
        Ok(self.ledger.list(&scoped).await?)
    }

    pub async fn status_history(&self, session: &Session, id: Uuid) -> Result<Vec<StatusChange>, AppointmentError> {
        self.get_appointment(session, id).await?;
        Ok(self.ledger.status_history(id).await?)
    }

    // ==========================================================================
    // STATUS TRANSITIONS
    // ==========================================================================

    pub async fn update_status(
        &self,
        session: &Session,
        id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<StatusTransition, AppointmentError> {
        let current = self.get_appointment(session, id).await?;
        let next = request.status;

        self.lifecycle_service.authorize_transition(session, &current, next)?;
        self.lifecycle_service.validate_status_transition(current.status, next)?;

        let now = self.clock.now();
        let updated = self.ledger.transition(id, current.status, next, now).await?;
        info!("Appointment {} moved {} -> {} by {}", id, current.status, next, session.user_id);

        self.record_history(StatusChange {
            appointment_id: id,
            previous_status: Some(current.status),
            new_status: next,
            changed_by: session.user_id,
            changed_at: now,
            reason: request.reason,
        })
        .await;

        let refund = if next == AppointmentStatus::Cancelled {
            self.refund_if_paid(&updated).await
        } else {
            RefundOutcome::NotRequired
        };

        Ok(StatusTransition {
            appointment: updated,
            previous_status: current.status,
            refund,
        })
    }

    /// Runs only for the caller whose compare-and-set won the cancellation.
    async fn refund_if_paid(&self, appointment: &Appointment) -> RefundOutcome {
        let Some(reference) = appointment.payment_reference.clone() else {
            return RefundOutcome::NotRequired;
        };

        match self.payments.refund(&reference).await {
            Ok(refund) => {
                info!("Refunded {} for cancelled appointment {}", reference, appointment.id);
                if let Err(e) = self.notifier.refund_issued(appointment, &refund).await {
                    warn!("Refund notice for appointment {} not sent: {}", appointment.id, e);
                }
                RefundOutcome::Refunded {
                    payment_reference: reference,
                    refund_id: refund.refund_id,
                }
            }
            Err(e) => {
                error!("Refund of {} for appointment {} failed: {}", reference, appointment.id, e);
                RefundOutcome::Failed {
                    payment_reference: reference,
                    reason: e.to_string(),
                }
            }
        }
    }

    // ==========================================================================
    // PAYMENT
    // ==========================================================================

    pub async fn start_checkout(&self, session: &Session, id: Uuid) -> Result<CheckoutResponse, AppointmentError> {
        let appointment = self.get_appointment(session, id).await?;

        if !session.is_user(appointment.patient_id) {
            return Err(AppointmentError::Unauthorized(
                "Only the patient can pay for an appointment".to_string(),
            ));
        }
        if !appointment.holds_slot() {
            return Err(AppointmentError::ValidationError(format!(
                "Appointment is {} and can no longer be paid",
                appointment.status
            )));
        }
        if appointment.is_paid() {
            return Err(AppointmentError::AlreadyPaid);
        }

        let professional = self.require_professional(appointment.professional()).await?;
        let amount_cents = professional.consultation_fee_cents;
        let (platform_fee_cents, professional_amount_cents) =
            split_amount(amount_cents, self.config.platform_fee_percent);

        let frontend = self.config.frontend_url.trim_end_matches('/');
        let checkout = CheckoutRequest {
            appointment_id: appointment.id,
            patient_id: appointment.patient_id,
            professional_id: professional.id,
            description: format!("Consulta online com {}", professional.display_name),
            amount_cents,
            platform_fee_cents,
            professional_amount_cents,
            currency: self.config.payment_currency.clone(),
            success_url: format!("{}/consultas_paciente?status=sucesso", frontend),
            cancel_url: format!("{}/consultas_paciente?status=erro", frontend),
        };

        let session_info = self
            .payments
            .create_checkout(&checkout)
            .await
            .map_err(|e| AppointmentError::ExternalServiceError(e.to_string()))?;

        let record = PaymentRecord {
            payment_reference: session_info.payment_reference.clone(),
            platform_fee_cents,
            professional_amount_cents,
        };
        self.ledger
            .record_payment(appointment.id, &record, self.clock.now())
            .await
            .inspect_err(|e| {
                error!(
                    "Checkout {} opened but not recorded on appointment {}: {}",
                    record.payment_reference, appointment.id, e
                )
            })?;

        Ok(CheckoutResponse {
            appointment_id: appointment.id,
            checkout_url: session_info.checkout_url,
            payment_reference: session_info.payment_reference,
            amount_cents,
            platform_fee_cents,
            professional_amount_cents,
            currency: checkout.currency,
        })
    }
}

/// Generates a room link and stores it on the appointment.
pub async fn attach_meeting_link(
    ledger: &dyn AppointmentLedger,
    meetings: &dyn MeetingLinkGenerator,
    clock: &dyn Clock,
    appointment: &Appointment,
) -> Result<String, AppointmentError> {
    let link = meetings.generate(appointment, clock.now());
    ledger.set_meeting_link(appointment.id, &link).await?;
    debug!("Meeting link attached to {}", appointment.id);
    Ok(link)
}

fn normalize_notes(notes: Option<String>) -> Result<Option<String>, AppointmentError> {
    let Some(raw) = notes else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_NOTES_CHARS {
        return Err(AppointmentError::ValidationError(format!(
            "Notes must be at most {} characters",
            MAX_NOTES_CHARS
        )));
    }
    Ok(Some(trimmed.to_string()))
}
