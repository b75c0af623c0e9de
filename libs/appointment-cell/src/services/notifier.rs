use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::models::Appointment;
use crate::services::payment::Refund;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Tells the patient about money moving on their appointment.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn refund_issued(&self, appointment: &Appointment, refund: &Refund) -> Result<(), NotificationError>;
}

/// Writes notifications to the log. Used until an email sender is wired in.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn refund_issued(&self, appointment: &Appointment, refund: &Refund) -> Result<(), NotificationError> {
        info!(
            patient_id = %appointment.patient_id,
            appointment_id = %appointment.id,
            refund_id = %refund.refund_id,
            "Refund of {} issued to patient",
            refund.payment_reference
        );
        Ok(())
    }
}
