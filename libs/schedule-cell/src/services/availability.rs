use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use shared_utils::Clock;

use crate::models::{ClinicTimezone, DaySchedule, Professional, ProfessionalRef, ScheduleError, SlotSource};
use crate::services::calculator::{compute_slots, windows_for};
use crate::services::directory::ProfessionalDirectory;
use crate::services::working_hours::WorkingHoursStore;
use crate::state::ScheduleState;

/// Candidate slots per professional and date.
pub struct AvailabilityService {
    directory: Arc<dyn ProfessionalDirectory>,
    working_hours: Arc<dyn WorkingHoursStore>,
    clock: Arc<dyn Clock>,
    timezone: ClinicTimezone,
}

impl AvailabilityService {
    pub fn new(state: &ScheduleState) -> Self {
        Self {
            directory: state.directory.clone(),
            working_hours: state.working_hours.clone(),
            clock: state.clock.clone(),
            timezone: state.timezone(),
        }
    }

    pub fn timezone(&self) -> ClinicTimezone {
        self.timezone
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Active professional matching the reference, if any.
    pub async fn find_professional(
        &self,
        professional: ProfessionalRef,
    ) -> Result<Option<Professional>, ScheduleError> {
        let found = self.directory.find(professional).await?;
        Ok(found.filter(|p| p.active))
    }

    /// Render-time view. Unknown or unreachable professionals yield an empty day.
    pub async fn day_schedule(&self, professional: ProfessionalRef, date: NaiveDate) -> DaySchedule {
        match self.find_professional(professional).await {
            Ok(Some(found)) => self.candidates_for(&found, date).await,
            Ok(None) => {
                debug!("Unknown professional {} ({})", professional.id, professional.professional_type);
                empty_day(professional, date, false)
            }
            Err(e) => {
                warn!("Directory lookup failed for {}: {}", professional.id, e);
                empty_day(professional, date, true)
            }
        }
    }

    /// Candidate slots for a known professional. A failed working-hours read uses the default grid.
    pub async fn candidates_for(&self, professional: &Professional, date: NaiveDate) -> DaySchedule {
        let (hours, degraded) = match self.working_hours.list(professional.id).await {
            Ok(hours) => (hours, false),
            Err(e) => {
                warn!("Working hours unavailable for {}, using default grid: {}", professional.id, e);
                (Vec::new(), true)
            }
        };

        let (source, _) = windows_for(&hours, date);
        let slots = compute_slots(&hours, date, self.clock.now(), self.timezone);

        DaySchedule {
            professional: professional.reference(),
            date,
            source,
            slots,
            degraded,
        }
    }
}

fn empty_day(professional: ProfessionalRef, date: NaiveDate, degraded: bool) -> DaySchedule {
    DaySchedule {
        professional,
        date,
        source: SlotSource::UnknownProfessional,
        slots: Vec::new(),
        degraded,
    }
}
