use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use schedule_cell::models::ProfessionalRef;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, PaymentRecord, StatusChange};
use crate::services::ledger::{AppointmentLedger, LedgerError};

const APPOINTMENTS: &str = "/rest/v1/appointments";
const HISTORY: &str = "/rest/v1/appointment_status_history";

#[derive(Debug, Deserialize)]
struct ScheduledAtRow {
    scheduled_at: DateTime<Utc>,
}

/// PostgREST-backed ledger. Slot uniqueness is enforced by the
/// `appointments_active_slot_key` partial unique index.
pub struct SupabaseAppointmentLedger {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentLedger {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn patch_returning(&self, path: &str, body: serde_json::Value) -> Result<Vec<Appointment>, LedgerError> {
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                path,
                None,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        Ok(rows)
    }

    /// An empty conditional PATCH means either a missing row or a status mismatch.
    async fn explain_empty_patch(&self, id: Uuid) -> LedgerError {
        match self.get(id).await {
            Ok(Some(_)) => LedgerError::StaleStatus,
            Ok(None) => LedgerError::NotFound,
            Err(e) => e,
        }
    }
}

fn timestamp(instant: DateTime<Utc>) -> String {
    urlencoding::encode(&instant.to_rfc3339_opts(SecondsFormat::Secs, true)).into_owned()
}

fn filter_query(filter: &AppointmentFilter) -> String {
    let mut query = vec!["select=*".to_string()];

    if let Some(patient_id) = filter.patient_id {
        query.push(format!("patient_id=eq.{}", patient_id));
    }
    if let Some(professional_id) = filter.professional_id {
        query.push(format!("professional_id=eq.{}", professional_id));
    }
    if let Some(professional_type) = filter.professional_type {
        query.push(format!("professional_type=eq.{}", professional_type));
    }
    if let Some(status) = filter.status {
        query.push(format!("status=eq.{}", status));
    }
    if let Some(from) = filter.from {
        query.push(format!("scheduled_at=gte.{}", timestamp(from)));
    }
    if let Some(to) = filter.to {
        query.push(format!("scheduled_at=lt.{}", timestamp(to)));
    }

    query.push("order=scheduled_at.asc".to_string());
    query.join("&")
}

#[async_trait]
impl AppointmentLedger for SupabaseAppointmentLedger {
    async fn occupied_between(
        &self,
        professional: ProfessionalRef,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, LedgerError> {
        let path = format!(
            "{}?professional_id=eq.{}&professional_type=eq.{}&status=in.(pending,confirmed)&scheduled_at=gte.{}&scheduled_at=lt.{}&select=scheduled_at&order=scheduled_at.asc",
            APPOINTMENTS,
            professional.id,
            professional.professional_type,
            timestamp(from),
            timestamp(to)
        );

        let rows: Vec<ScheduledAtRow> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().map(|r| r.scheduled_at).collect())
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, LedgerError> {
        let body = json!(appointment);
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::POST,
                APPOINTMENTS,
                None,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(|e| {
                let mapped = LedgerError::from(e);
                if mapped == LedgerError::SlotTaken {
                    debug!("Insert for {} lost the slot race", appointment.scheduled_at);
                }
                mapped
            })?;

        rows.into_iter()
            .next()
            .ok_or_else(|| LedgerError::Unavailable("insert returned no rows".to_string()))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, LedgerError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, id);
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, LedgerError> {
        let path = format!("{}?{}", APPOINTMENTS, filter_query(filter));
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows)
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        at: DateTime<Utc>,
    ) -> Result<Appointment, LedgerError> {
        let path = format!("{}?id=eq.{}&status=eq.{}", APPOINTMENTS, id, expected);
        let rows = self
            .patch_returning(&path, json!({ "status": next, "updated_at": at }))
            .await?;

        match rows.into_iter().next() {
            Some(updated) => Ok(updated),
            None => Err(self.explain_empty_patch(id).await),
        }
    }

    async fn set_meeting_link(&self, id: Uuid, link: &str) -> Result<(), LedgerError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, id);
        self.supabase
            .execute(Method::PATCH, &path, None, Some(json!({ "meeting_link": link })))
            .await?;
        Ok(())
    }

    async fn record_payment(
        &self,
        id: Uuid,
        payment: &PaymentRecord,
        at: DateTime<Utc>,
    ) -> Result<Appointment, LedgerError> {
        let path = format!("{}?id=eq.{}&status=in.(pending,confirmed)", APPOINTMENTS, id);
        let rows = self
            .patch_returning(
                &path,
                json!({
                    "payment_reference": payment.payment_reference,
                    "platform_fee_cents": payment.platform_fee_cents,
                    "professional_amount_cents": payment.professional_amount_cents,
                    "updated_at": at
                }),
            )
            .await?;

        match rows.into_iter().next() {
            Some(updated) => Ok(updated),
            None => {
                warn!("Payment for {} not recorded, appointment no longer active", id);
                Err(self.explain_empty_patch(id).await)
            }
        }
    }

    async fn append_history(&self, change: StatusChange) -> Result<(), LedgerError> {
        self.supabase
            .execute(Method::POST, HISTORY, None, Some(json!(change)))
            .await?;
        Ok(())
    }

    async fn status_history(&self, id: Uuid) -> Result<Vec<StatusChange>, LedgerError> {
        let path = format!("{}?appointment_id=eq.{}&order=changed_at.asc", HISTORY, id);
        let rows: Vec<StatusChange> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_are_query_safe() {
        let instant = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        assert_eq!(timestamp(instant), "2026-10-19T12%3A00%3A00Z");
    }

    #[test]
    fn filter_query_includes_only_set_fields() {
        let filter = AppointmentFilter {
            status: Some(AppointmentStatus::Confirmed),
            ..Default::default()
        };
        assert_eq!(filter_query(&filter), "select=*&status=eq.confirmed&order=scheduled_at.asc");
    }
}
