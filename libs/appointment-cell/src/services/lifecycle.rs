// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_models::auth::{Role, Session};

use crate::models::{Appointment, AppointmentError, AppointmentFilter, AppointmentStatus};

/// Status machine and role rules. Pure; the booking service applies them.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        debug!("Status transition validated: {} -> {}", current_status, new_status);
        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![AppointmentStatus::Confirmed, AppointmentStatus::Cancelled],
            AppointmentStatus::Confirmed => vec![AppointmentStatus::Completed, AppointmentStatus::Cancelled],
            // Terminal states
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => vec![],
        }
    }

    pub fn can_view(&self, session: &Session, appointment: &Appointment) -> bool {
        session.is_admin()
            || session.is_user(appointment.patient_id)
            || session.is_user(appointment.professional_id)
    }

    /// The professional or an admin may make any valid move; the patient may only cancel while pending.
    pub fn authorize_transition(
        &self,
        session: &Session,
        appointment: &Appointment,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if session.is_admin() || session.is_user(appointment.professional_id) {
            return Ok(());
        }

        if session.is_user(appointment.patient_id) {
            if new_status == AppointmentStatus::Cancelled && appointment.status == AppointmentStatus::Pending {
                return Ok(());
            }
            return Err(AppointmentError::Unauthorized(
                "Patients can only cancel pending appointments".to_string(),
            ));
        }

        Err(AppointmentError::Unauthorized(
            "Not a participant of this appointment".to_string(),
        ))
    }

    /// Narrow a listing filter to what the caller may see.
    pub fn scope_filter(&self, session: &Session, mut filter: AppointmentFilter) -> AppointmentFilter {
        match session.role {
            Role::Admin => {}
            Role::Patient => {
                filter.patient_id = Some(session.user_id);
            }
            Role::Psychologist | Role::Psychiatrist => {
                filter.professional_id = Some(session.user_id);
            }
        }
        filter
    }
}
