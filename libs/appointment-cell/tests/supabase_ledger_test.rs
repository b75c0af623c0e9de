use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest};
use appointment_cell::services::{
    AppointmentBookingService, AppointmentLedger, LedgerError, SlotPipeline, SupabaseAppointmentLedger,
};
use appointment_cell::AppointmentState;
use schedule_cell::models::{ProfessionalRef, ProfessionalType};
use schedule_cell::ScheduleState;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig, TestUser};
use shared_utils::FixedClock;

/// Monday 2026-10-19, 10:00 in the clinic.
fn monday_ten() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 13, 0, 0).unwrap()
}

fn appointment_row(id: Uuid, professional_id: Uuid, patient_id: Uuid, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "professional_id": professional_id,
        "professional_type": "psychologist",
        "patient_id": patient_id,
        "scheduled_at": "2026-10-19T13:00:00Z",
        "status": status,
        "notes": null,
        "meeting_link": null,
        "created_at": "2026-10-14T12:00:00Z",
        "updated_at": "2026-10-14T12:00:00Z"
    })
}

fn pending(professional_id: Uuid, patient_id: Uuid) -> Appointment {
    let created = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
    Appointment {
        id: Uuid::new_v4(),
        professional_id,
        professional_type: ProfessionalType::Psychologist,
        patient_id,
        scheduled_at: monday_ten(),
        status: AppointmentStatus::Pending,
        notes: None,
        meeting_link: None,
        payment_reference: None,
        platform_fee_cents: None,
        professional_amount_cents: None,
        created_at: created,
        updated_at: created,
    }
}

#[tokio::test]
async fn unique_violation_on_insert_is_slot_taken() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase(&mock_server.uri()).to_app_config();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("Prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "duplicate key value violates unique constraint \"appointments_active_slot_key\"",
            "23505",
        )))
        .mount(&mock_server)
        .await;

    let ledger = SupabaseAppointmentLedger::new(&config);
    let result = ledger.insert(pending(Uuid::new_v4(), Uuid::new_v4())).await;

    assert_matches!(result, Err(LedgerError::SlotTaken));
}

#[tokio::test]
async fn foreign_key_violation_is_not_a_slot_conflict() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase(&mock_server.uri()).to_app_config();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "insert or update on table \"appointments\" violates foreign key constraint",
            "23503",
        )))
        .mount(&mock_server)
        .await;

    let ledger = SupabaseAppointmentLedger::new(&config);
    let result = ledger.insert(pending(Uuid::new_v4(), Uuid::new_v4())).await;

    assert_matches!(result, Err(LedgerError::Unavailable(_)));
}

#[tokio::test]
async fn losing_the_insert_race_reports_slot_conflict() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase(&mock_server.uri()).to_arc();
    let professional_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/professionals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::professional_response(professional_id, "psychologist", 15000)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/working_hours"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // The pre-submit read still sees the slot free.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "duplicate key value violates unique constraint",
            "23505",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
    let schedule = ScheduleState::from_config(config).with_clock(Arc::new(FixedClock::new(now)));
    let state = AppointmentState::from_config(schedule);
    let service = AppointmentBookingService::new(&state);

    let request = BookAppointmentRequest {
        professional_id,
        professional_type: ProfessionalType::Psychologist,
        patient_id: None,
        scheduled_at: Some(monday_ten()),
        date: None,
        time: None,
        notes: None,
    };
    let result = service
        .create_appointment(&TestUser::patient("b@example.com").to_session(), request)
        .await;

    assert_matches!(result, Err(AppointmentError::SlotConflict));
}

#[tokio::test]
async fn occupied_reads_only_active_rows_in_range() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase(&mock_server.uri()).to_app_config();
    let professional_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("professional_id", format!("eq.{}", professional_id)))
        .and(query_param("professional_type", "eq.psychologist"))
        .and(query_param("status", "in.(pending,confirmed)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "scheduled_at": "2026-10-19T13:00:00+00:00" },
            { "scheduled_at": "2026-10-19T17:30:00+00:00" }
        ])))
        .mount(&mock_server)
        .await;

    let ledger = SupabaseAppointmentLedger::new(&config);
    let from = Utc.with_ymd_and_hms(2026, 10, 19, 3, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2026, 10, 20, 3, 0, 0).unwrap();
    let occupied = ledger
        .occupied_between(ProfessionalRef::new(professional_id, ProfessionalType::Psychologist), from, to)
        .await
        .unwrap();

    assert_eq!(occupied, vec![monday_ten(), Utc.with_ymd_and_hms(2026, 10, 19, 17, 30, 0).unwrap()]);
}

#[tokio::test]
async fn conditional_patch_with_no_rows_is_stale() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase(&mock_server.uri()).to_app_config();
    let id = Uuid::new_v4();
    let professional_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // Someone else already cancelled it.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(id, professional_id, patient_id, "cancelled")
        ])))
        .mount(&mock_server)
        .await;

    let ledger = SupabaseAppointmentLedger::new(&config);
    let result = ledger
        .transition(id, AppointmentStatus::Pending, AppointmentStatus::Cancelled, Utc::now())
        .await;

    assert_matches!(result, Err(LedgerError::StaleStatus));
}

#[tokio::test]
async fn conditional_patch_on_missing_row_is_not_found() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase(&mock_server.uri()).to_app_config();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let ledger = SupabaseAppointmentLedger::new(&config);
    let result = ledger
        .transition(Uuid::new_v4(), AppointmentStatus::Confirmed, AppointmentStatus::Completed, Utc::now())
        .await;

    assert_matches!(result, Err(LedgerError::NotFound));
}

#[tokio::test]
async fn winning_transition_returns_updated_row() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase(&mock_server.uri()).to_app_config();
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(id, Uuid::new_v4(), Uuid::new_v4(), "confirmed")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let ledger = SupabaseAppointmentLedger::new(&config);
    let updated = ledger
        .transition(id, AppointmentStatus::Pending, AppointmentStatus::Confirmed, Utc::now())
        .await
        .unwrap();

    assert_eq!(updated.id, id);
    assert_eq!(updated.status, AppointmentStatus::Confirmed);
    assert!(!updated.is_paid());
}

#[tokio::test]
async fn unreachable_database_is_unavailable() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&mock_server)
        .await;

    let ledger = SupabaseAppointmentLedger::new(&config);
    let result = ledger.get(Uuid::new_v4()).await;

    assert_matches!(result, Err(LedgerError::Unavailable(_)));
}

#[tokio::test]
async fn occupied_view_degrades_when_the_ledger_is_down() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase(&mock_server.uri()).to_arc();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = AppointmentState::from_config(ScheduleState::from_config(config));
    let professional = ProfessionalRef::new(Uuid::new_v4(), ProfessionalType::Psychologist);
    let date = chrono::NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

    let day = SlotPipeline::new(&state).occupied_day(professional, date).await;

    assert!(day.degraded);
    assert!(day.occupied.is_empty());
    assert_eq!(day.date, date);
}
