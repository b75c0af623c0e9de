use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::Session;

use crate::models::{
    is_on_grid, slot_label, ReplaceWorkingHoursRequest, ScheduleError, WorkingHours, WorkingHoursEntry,
};

#[async_trait]
pub trait WorkingHoursStore: Send + Sync {
    async fn list(&self, professional_id: Uuid) -> Result<Vec<WorkingHours>, ScheduleError>;

    /// Replaces the professional's whole week.
    async fn replace(
        &self,
        professional_id: Uuid,
        entries: Vec<WorkingHours>,
    ) -> Result<Vec<WorkingHours>, ScheduleError>;
}

// ==============================================================================
// SUPABASE
// ==============================================================================

pub struct SupabaseWorkingHoursStore {
    supabase: SupabaseClient,
}

impl SupabaseWorkingHoursStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl WorkingHoursStore for SupabaseWorkingHoursStore {
    async fn list(&self, professional_id: Uuid) -> Result<Vec<WorkingHours>, ScheduleError> {
        let path = format!(
            "/rest/v1/working_hours?professional_id=eq.{}&order=weekday.asc",
            professional_id
        );
        let rows: Vec<WorkingHours> = self.supabase.request(Method::GET, &path, None, None).await?;
        debug!("Loaded {} working-hours rows for {}", rows.len(), professional_id);
        Ok(rows)
    }

    async fn replace(
        &self,
        professional_id: Uuid,
        entries: Vec<WorkingHours>,
    ) -> Result<Vec<WorkingHours>, ScheduleError> {
        let delete_path = format!("/rest/v1/working_hours?professional_id=eq.{}", professional_id);
        self.supabase.execute(Method::DELETE, &delete_path, None, None).await?;

        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!(entries);
        let rows: Vec<WorkingHours> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/working_hours",
                None,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        Ok(rows)
    }
}

// ==============================================================================
// IN MEMORY
// ==============================================================================

#[derive(Default)]
pub struct InMemoryWorkingHoursStore {
    weeks: RwLock<HashMap<Uuid, Vec<WorkingHours>>>,
}

impl InMemoryWorkingHoursStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkingHoursStore for InMemoryWorkingHoursStore {
    async fn list(&self, professional_id: Uuid) -> Result<Vec<WorkingHours>, ScheduleError> {
        let weeks = self.weeks.read().await;
        Ok(weeks.get(&professional_id).cloned().unwrap_or_default())
    }

    async fn replace(
        &self,
        professional_id: Uuid,
        mut entries: Vec<WorkingHours>,
    ) -> Result<Vec<WorkingHours>, ScheduleError> {
        entries.sort_by_key(|e| e.weekday);
        let mut weeks = self.weeks.write().await;
        weeks.insert(professional_id, entries.clone());
        Ok(entries)
    }
}

// ==============================================================================
// SERVICE
// ==============================================================================

pub struct WorkingHoursService {
    store: Arc<dyn WorkingHoursStore>,
}

impl WorkingHoursService {
    pub fn new(store: Arc<dyn WorkingHoursStore>) -> Self {
        Self { store }
    }

    pub async fn get_working_hours(&self, professional_id: Uuid) -> Result<Vec<WorkingHours>, ScheduleError> {
        self.store.list(professional_id).await
    }

    pub async fn replace_working_hours(
        &self,
        session: &Session,
        request: ReplaceWorkingHoursRequest,
    ) -> Result<Vec<WorkingHours>, ScheduleError> {
        let target = request.professional_id.unwrap_or(session.user_id);

        if !session.is_admin() {
            if !session.role.is_professional() {
                return Err(ScheduleError::Unauthorized(
                    "Only professionals can edit working hours".to_string(),
                ));
            }
            if target != session.user_id {
                return Err(ScheduleError::Unauthorized(
                    "Professionals can only edit their own working hours".to_string(),
                ));
            }
        }

        validate_entries(&request.entries)?;

        let rows = request
            .entries
            .into_iter()
            .map(|entry| WorkingHours {
                professional_id: target,
                weekday: entry.weekday,
                start_time: entry.start_time,
                end_time: entry.end_time,
                active: entry.active,
            })
            .collect();

        let saved = self.store.replace(target, rows).await?;
        info!("Replaced working hours for {} ({} weekdays)", target, saved.len());
        Ok(saved)
    }
}

pub fn validate_entries(entries: &[WorkingHoursEntry]) -> Result<(), ScheduleError> {
    let mut seen = HashSet::new();

    for entry in entries {
        if entry.weekday > 6 {
            return Err(ScheduleError::Validation(format!(
                "Weekday must be between 0 (Monday) and 6 (Sunday), got {}",
                entry.weekday
            )));
        }
        if !seen.insert(entry.weekday) {
            return Err(ScheduleError::Validation(format!(
                "Weekday {} appears more than once",
                entry.weekday
            )));
        }
        if !is_on_grid(entry.start_time) || !is_on_grid(entry.end_time) {
            return Err(ScheduleError::Validation(format!(
                "Times must be on the half hour ({} - {})",
                slot_label(entry.start_time),
                slot_label(entry.end_time)
            )));
        }
        if entry.active && entry.start_time >= entry.end_time {
            return Err(ScheduleError::Validation(format!(
                "Start time must be before end time on weekday {}",
                entry.weekday
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn entry(weekday: u8, start: (u32, u32), end: (u32, u32)) -> WorkingHoursEntry {
        WorkingHoursEntry {
            weekday,
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            active: true,
        }
    }

    #[test]
    fn accepts_a_normal_week() {
        let week = vec![entry(0, (8, 0), (12, 0)), entry(2, (13, 30), (18, 0))];
        assert!(validate_entries(&week).is_ok());
    }

    #[test]
    fn rejects_bad_entries() {
        assert!(validate_entries(&[entry(7, (8, 0), (12, 0))]).is_err());
        assert!(validate_entries(&[entry(1, (8, 0), (12, 0)), entry(1, (13, 0), (14, 0))]).is_err());
        assert!(validate_entries(&[entry(1, (8, 15), (12, 0))]).is_err());
        assert!(validate_entries(&[entry(1, (12, 0), (12, 0))]).is_err());
    }

    #[test]
    fn inactive_entry_skips_ordering_check() {
        let mut day = entry(3, (12, 0), (9, 0));
        day.active = false;
        assert!(validate_entries(&[day]).is_ok());
    }
}
