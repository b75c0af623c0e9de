#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::BookAppointmentRequest;
use appointment_cell::services::{
    InMemoryAppointmentLedger, JitsiMeetingLinks, PaymentGateway, SandboxPaymentGateway,
};
use appointment_cell::AppointmentState;
use schedule_cell::models::{clock_time, ClinicTimezone, Professional, ProfessionalType, WorkingHours};
use schedule_cell::services::{InMemoryProfessionalDirectory, InMemoryWorkingHoursStore, WorkingHoursStore};
use schedule_cell::ScheduleState;
use shared_utils::test_utils::TestConfig;
use shared_utils::FixedClock;

pub const FEE_CENTS: i64 = 15000;

/// Wednesday 2026-10-14, 09:00 in the clinic (UTC-3).
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
}

pub fn next_monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub struct Fixture {
    pub config: TestConfig,
    pub state: AppointmentState,
    pub directory: Arc<InMemoryProfessionalDirectory>,
    pub hours: Arc<InMemoryWorkingHoursStore>,
    pub ledger: Arc<InMemoryAppointmentLedger>,
    pub professional: Professional,
}

impl Fixture {
    pub async fn new() -> Self {
        let config = TestConfig::default();
        let sandbox = Arc::new(SandboxPaymentGateway::new(&config.to_app_config()));
        Self::with_gateway(sandbox).await
    }

    pub async fn with_gateway(payments: Arc<dyn PaymentGateway>) -> Self {
        Self::build(payments, now()).await
    }

    pub async fn at_time(clock: DateTime<Utc>) -> Self {
        let config = TestConfig::default();
        let sandbox = Arc::new(SandboxPaymentGateway::new(&config.to_app_config()));
        Self::build(sandbox, clock).await
    }

    async fn build(payments: Arc<dyn PaymentGateway>, clock: DateTime<Utc>) -> Self {
        let config = TestConfig::default();
        let app_config = config.to_arc();

        let directory = Arc::new(InMemoryProfessionalDirectory::new());
        let hours = Arc::new(InMemoryWorkingHoursStore::new());
        let ledger = Arc::new(InMemoryAppointmentLedger::new());

        let professional = Professional {
            id: Uuid::new_v4(),
            professional_type: ProfessionalType::Psychologist,
            display_name: "Dra. Ana".to_string(),
            consultation_fee_cents: FEE_CENTS,
            active: true,
        };
        directory.insert(professional.clone()).await;

        let schedule = ScheduleState::in_memory(app_config.clone(), directory.clone(), hours.clone())
            .with_clock(Arc::new(FixedClock::new(clock)));
        let state = AppointmentState::new(
            schedule,
            ledger.clone(),
            payments,
            Arc::new(JitsiMeetingLinks::new(&app_config)),
        );

        Self {
            config,
            state,
            directory,
            hours,
            ledger,
            professional,
        }
    }

    pub fn timezone(&self) -> ClinicTimezone {
        self.state.schedule.timezone()
    }

    /// UTC instant of a clinic-local `HH:MM` on `date`.
    pub fn at(&self, date: NaiveDate, time: &str) -> DateTime<Utc> {
        self.timezone().at(date, clock_time::parse(time).unwrap()).unwrap()
    }

    pub async fn set_hours(&self, weekday: u8, start: &str, end: &str) {
        self.hours
            .replace(
                self.professional.id,
                vec![WorkingHours {
                    professional_id: self.professional.id,
                    weekday,
                    start_time: clock_time::parse(start).unwrap(),
                    end_time: clock_time::parse(end).unwrap(),
                    active: true,
                }],
            )
            .await
            .unwrap();
    }

    pub fn book_request(&self, scheduled_at: DateTime<Utc>) -> BookAppointmentRequest {
        BookAppointmentRequest {
            professional_id: self.professional.id,
            professional_type: self.professional.professional_type,
            patient_id: None,
            scheduled_at: Some(scheduled_at),
            date: None,
            time: None,
            notes: None,
        }
    }
}
