use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use appointment_cell::AppointmentState;
use schedule_cell::models::{Professional, WorkingHours, WorkingHoursEntry};
use schedule_cell::services::{
    validate_entries, InMemoryProfessionalDirectory, InMemoryWorkingHoursStore, WorkingHoursStore,
};
use schedule_cell::ScheduleState;
use shared_config::{AppConfig, StorageBackend};

/// Professionals and their weeks for the in-memory backend.
#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub professionals: Vec<Professional>,
    #[serde(default)]
    pub working_hours: Vec<WorkingHours>,
}

impl SeedFile {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid professionals seed file")
    }
}

pub async fn apply_seed(
    seed: SeedFile,
    directory: &InMemoryProfessionalDirectory,
    hours: &InMemoryWorkingHoursStore,
) -> Result<()> {
    let professionals = seed.professionals.len();
    for professional in seed.professionals {
        directory.insert(professional).await;
    }

    let mut weeks: BTreeMap<Uuid, Vec<WorkingHours>> = BTreeMap::new();
    for entry in seed.working_hours {
        weeks.entry(entry.professional_id).or_default().push(entry);
    }
    for (professional_id, entries) in weeks {
        let checked: Vec<WorkingHoursEntry> = entries.iter().map(WorkingHoursEntry::from).collect();
        validate_entries(&checked).with_context(|| format!("invalid seeded working hours for {}", professional_id))?;

        hours
            .replace(professional_id, entries)
            .await
            .with_context(|| format!("seeding working hours for {}", professional_id))?;
    }

    info!("Seeded {} professionals", professionals);
    Ok(())
}

/// Builds both cell states over the configured backend.
pub async fn build(config: Arc<AppConfig>) -> Result<(ScheduleState, AppointmentState)> {
    let schedule = match (config.storage_backend, config.professionals_seed_path.as_deref()) {
        (StorageBackend::Memory, Some(seed_path)) => {
            let raw = tokio::fs::read_to_string(seed_path)
                .await
                .with_context(|| format!("reading {}", seed_path))?;

            let directory = Arc::new(InMemoryProfessionalDirectory::new());
            let hours = Arc::new(InMemoryWorkingHoursStore::new());
            apply_seed(SeedFile::parse(&raw)?, &directory, &hours).await?;

            ScheduleState::in_memory(config.clone(), directory, hours)
        }
        (StorageBackend::Supabase, Some(_)) => {
            warn!("PROFESSIONALS_SEED_PATH is ignored with the Supabase backend");
            ScheduleState::from_config(config.clone())
        }
        _ => ScheduleState::from_config(config.clone()),
    };

    info!("Using {:?} storage", config.storage_backend);
    let appointments = AppointmentState::from_config(schedule.clone());
    Ok((schedule, appointments))
}
