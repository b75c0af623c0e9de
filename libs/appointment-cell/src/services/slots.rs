use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use schedule_cell::models::{slot_label, DaySchedule, ProfessionalRef, Slot, SlotSource};
use schedule_cell::services::AvailabilityService;

use crate::models::AppointmentError;
use crate::services::ledger::AppointmentLedger;
use crate::services::reconciler::reconcile;
use crate::state::AppointmentState;

/// Slots a patient can pick right now.
#[derive(Debug, Clone, Serialize)]
pub struct BookableDay {
    pub professional: ProfessionalRef,
    pub date: NaiveDate,
    pub source: SlotSource,
    pub slots: Vec<Slot>,
    pub degraded: bool,
}

/// Occupied `HH:MM` labels for one clinic date.
#[derive(Debug, Clone, Serialize)]
pub struct OccupiedDay {
    pub professional: ProfessionalRef,
    pub date: NaiveDate,
    pub occupied: BTreeSet<String>,
    pub degraded: bool,
}

/// Candidate, occupied and bookable slot views over one ledger.
/// Used for both professional types and by the booking re-check.
pub struct SlotPipeline {
    availability: AvailabilityService,
    ledger: Arc<dyn AppointmentLedger>,
}

impl SlotPipeline {
    pub fn new(state: &AppointmentState) -> Self {
        Self {
            availability: AvailabilityService::new(&state.schedule),
            ledger: state.ledger.clone(),
        }
    }

    pub fn availability(&self) -> &AvailabilityService {
        &self.availability
    }

    pub async fn candidates(&self, professional: ProfessionalRef, date: NaiveDate) -> DaySchedule {
        self.availability.day_schedule(professional, date).await
    }

    /// `HH:MM` labels of pending or confirmed appointments on the clinic-local date.
    pub async fn occupied(
        &self,
        professional: ProfessionalRef,
        date: NaiveDate,
    ) -> Result<BTreeSet<String>, AppointmentError> {
        let timezone = self.availability.timezone();
        let (from, to) = timezone
            .day_bounds(date)
            .ok_or_else(|| AppointmentError::ValidationError(format!("Date {} is out of range", date)))?;

        let taken = self.ledger.occupied_between(professional, from, to).await?;
        let labels: BTreeSet<String> = taken
            .into_iter()
            .map(|instant| slot_label(timezone.local_time(instant)))
            .collect();

        debug!("{} occupied slots for {} on {}", labels.len(), professional.id, date);
        Ok(labels)
    }

    /// Render-time occupied view. An unreadable ledger yields an empty set and `degraded = true`.
    pub async fn occupied_day(&self, professional: ProfessionalRef, date: NaiveDate) -> OccupiedDay {
        let (occupied, degraded) = match self.occupied(professional, date).await {
            Ok(occupied) => (occupied, false),
            Err(e) => {
                warn!("Occupied slots unavailable for {}: {}", professional.id, e);
                (BTreeSet::new(), true)
            }
        };

        OccupiedDay {
            professional,
            date,
            occupied,
            degraded,
        }
    }

    /// Reconciled view. An unreadable ledger yields no slots and `degraded = true`.
    pub async fn bookable(&self, professional: ProfessionalRef, date: NaiveDate) -> BookableDay {
        let schedule = self.candidates(professional, date).await;

        let (slots, degraded) = if schedule.slots.is_empty() {
            (Vec::new(), schedule.degraded)
        } else {
            match self.occupied(professional, date).await {
                Ok(occupied) => (reconcile(&schedule.slots, &occupied), schedule.degraded),
                Err(e) => {
                    warn!("Occupied slots unavailable for {}: {}", professional.id, e);
                    (Vec::new(), true)
                }
            }
        };

        BookableDay {
            professional,
            date,
            source: schedule.source,
            slots,
            degraded,
        }
    }

    /// Fresh read of whether `scheduled_at` is held by an active appointment.
    pub async fn is_occupied(
        &self,
        professional: ProfessionalRef,
        scheduled_at: DateTime<Utc>,
    ) -> Result<bool, AppointmentError> {
        let timezone = self.availability.timezone();
        let date = timezone.local_date(scheduled_at);
        let occupied = self.occupied(professional, date).await?;
        Ok(occupied.contains(&slot_label(timezone.local_time(scheduled_at))))
    }
}
