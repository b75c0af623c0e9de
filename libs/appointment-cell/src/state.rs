use std::sync::Arc;

use schedule_cell::ScheduleState;
use shared_config::{AppConfig, StorageBackend};
use shared_utils::Clock;

use crate::services::ledger::{AppointmentLedger, InMemoryAppointmentLedger};
use crate::services::meeting::{JitsiMeetingLinks, MeetingLinkGenerator};
use crate::services::notifier::{LogNotifier, Notifier};
use crate::services::payment::{HttpPaymentGateway, PaymentGateway, SandboxPaymentGateway};
use crate::services::supabase_ledger::SupabaseAppointmentLedger;

#[derive(Clone)]
pub struct AppointmentState {
    pub schedule: ScheduleState,
    pub ledger: Arc<dyn AppointmentLedger>,
    pub payments: Arc<dyn PaymentGateway>,
    pub meetings: Arc<dyn MeetingLinkGenerator>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppointmentState {
    pub fn new(
        schedule: ScheduleState,
        ledger: Arc<dyn AppointmentLedger>,
        payments: Arc<dyn PaymentGateway>,
        meetings: Arc<dyn MeetingLinkGenerator>,
    ) -> Self {
        Self {
            schedule,
            ledger,
            payments,
            meetings,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Ledger and gateway chosen from config, on top of an existing schedule state.
    pub fn from_config(schedule: ScheduleState) -> Self {
        let config = schedule.config.clone();

        let ledger: Arc<dyn AppointmentLedger> = match config.storage_backend {
            StorageBackend::Supabase => Arc::new(SupabaseAppointmentLedger::new(&config)),
            StorageBackend::Memory => Arc::new(InMemoryAppointmentLedger::new()),
        };

        let payments: Arc<dyn PaymentGateway> = if config.is_payment_gateway_configured() {
            Arc::new(HttpPaymentGateway::new(&config))
        } else {
            Arc::new(SandboxPaymentGateway::new(&config))
        };

        Self::new(schedule, ledger, payments, Arc::new(JitsiMeetingLinks::new(&config)))
    }

    pub fn config(&self) -> &Arc<AppConfig> {
        &self.schedule.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.schedule.clock
    }
}
