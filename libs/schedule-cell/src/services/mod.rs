pub mod availability;
pub mod calculator;
pub mod directory;
pub mod working_hours;

pub use availability::AvailabilityService;
pub use directory::{InMemoryProfessionalDirectory, ProfessionalDirectory, SupabaseProfessionalDirectory};
pub use working_hours::{
    validate_entries, InMemoryWorkingHoursStore, SupabaseWorkingHoursStore, WorkingHoursService, WorkingHoursStore,
};
