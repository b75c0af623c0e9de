use std::sync::Arc;

use shared_config::{AppConfig, StorageBackend};
use shared_utils::{Clock, SystemClock};

use crate::models::ClinicTimezone;
use crate::services::directory::{
    InMemoryProfessionalDirectory, ProfessionalDirectory, SupabaseProfessionalDirectory,
};
use crate::services::working_hours::{
    InMemoryWorkingHoursStore, SupabaseWorkingHoursStore, WorkingHoursStore,
};

/// Shared handles for schedule routes and for the booking flow.
#[derive(Clone)]
pub struct ScheduleState {
    pub config: Arc<AppConfig>,
    pub directory: Arc<dyn ProfessionalDirectory>,
    pub working_hours: Arc<dyn WorkingHoursStore>,
    pub clock: Arc<dyn Clock>,
}

impl ScheduleState {
    pub fn new(
        config: Arc<AppConfig>,
        directory: Arc<dyn ProfessionalDirectory>,
        working_hours: Arc<dyn WorkingHoursStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            directory,
            working_hours,
            clock,
        }
    }

    /// Backends chosen by `config.storage_backend`.
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        match config.storage_backend {
            StorageBackend::Supabase => Self::new(
                config.clone(),
                Arc::new(SupabaseProfessionalDirectory::new(&config)),
                Arc::new(SupabaseWorkingHoursStore::new(&config)),
                Arc::new(SystemClock),
            ),
            StorageBackend::Memory => Self::in_memory(
                config,
                Arc::new(InMemoryProfessionalDirectory::new()),
                Arc::new(InMemoryWorkingHoursStore::new()),
            ),
        }
    }

    pub fn in_memory(
        config: Arc<AppConfig>,
        directory: Arc<InMemoryProfessionalDirectory>,
        working_hours: Arc<InMemoryWorkingHoursStore>,
    ) -> Self {
        Self::new(config, directory, working_hours, Arc::new(SystemClock))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn timezone(&self) -> ClinicTimezone {
        ClinicTimezone::from_offset_minutes(self.config.clinic_utc_offset_minutes)
    }
}
