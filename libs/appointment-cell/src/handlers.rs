use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use schedule_cell::models::{ProfessionalRef, ProfessionalType};
use shared_models::auth::Session;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentFilter, AppointmentStatus, BookAppointmentRequest, UpdateStatusRequest,
};
use crate::services::booking::AppointmentBookingService;
use crate::services::slots::SlotPipeline;
use crate::state::AppointmentState;

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        let message = e.to_string();
        match e {
            AppointmentError::NotFound => AppError::NotFound(message),
            AppointmentError::SlotConflict => AppError::SlotConflict(message),
            AppointmentError::ProfessionalNotFound => AppError::NotFound(message),
            AppointmentError::InvalidTime(_)
            | AppointmentError::OutsideWorkingHours
            | AppointmentError::ValidationError(_) => AppError::ValidationError(message),
            AppointmentError::InvalidStatusTransition { .. } => AppError::BadRequest(message),
            AppointmentError::StaleStatus | AppointmentError::AlreadyPaid => AppError::Conflict(message),
            AppointmentError::Unauthorized(_) => AppError::Forbidden(message),
            AppointmentError::DatabaseError(_) => AppError::Database(message),
            AppointmentError::ExternalServiceError(_) => AppError::ExternalService(message),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ListAppointmentsQuery {
    pub professional_type: Option<ProfessionalType>,
    pub status: Option<AppointmentStatus>,
    pub professional_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

fn professional_ref(professional_type: &str, professional_id: Uuid) -> Result<ProfessionalRef, AppError> {
    let professional_type = professional_type
        .parse::<ProfessionalType>()
        .map_err(AppError::BadRequest)?;
    Ok(ProfessionalRef::new(professional_id, professional_type))
}

/// Professional reference and a clinic date that maps onto UTC instants.
fn availability_target(
    state: &AppointmentState,
    professional_type: &str,
    professional_id: Uuid,
    date: NaiveDate,
) -> Result<(ProfessionalRef, NaiveDate), AppError> {
    let professional = professional_ref(professional_type, professional_id)?;
    let date = state.schedule.timezone().check_date(date)?;
    Ok((professional, date))
}

// ==============================================================================
// PUBLIC AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_candidate_slots(
    State(state): State<AppointmentState>,
    Path((professional_type, professional_id)): Path<(String, Uuid)>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Value>, AppError> {
    let (professional, date) = availability_target(&state, &professional_type, professional_id, query.date)?;
    let schedule = SlotPipeline::new(&state).candidates(professional, date).await;

    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn get_occupied_slots(
    State(state): State<AppointmentState>,
    Path((professional_type, professional_id)): Path<(String, Uuid)>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Value>, AppError> {
    let (professional, date) = availability_target(&state, &professional_type, professional_id, query.date)?;
    let occupied = SlotPipeline::new(&state).occupied_day(professional, date).await;

    Ok(Json(json!(occupied)))
}

#[axum::debug_handler]
pub async fn get_bookable_slots(
    State(state): State<AppointmentState>,
    Path((professional_type, professional_id)): Path<(String, Uuid)>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Value>, AppError> {
    let (professional, date) = availability_target(&state, &professional_type, professional_id, query.date)?;
    let day = SlotPipeline::new(&state).bookable(professional, date).await;

    Ok(Json(json!(day)))
}

// ==============================================================================
// APPOINTMENT HANDLERS (AUTHENTICATED)
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppointmentState>,
    Extension(session): Extension<Session>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service.create_appointment(&session, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "appointment": appointment,
            "message": "Appointment booked"
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppointmentState>,
    Extension(session): Extension<Session>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    let filter = AppointmentFilter {
        patient_id: query.patient_id,
        professional_id: query.professional_id,
        professional_type: query.professional_type,
        status: query.status,
        from: query.from,
        to: query.to,
    };

    let service = AppointmentBookingService::new(&state);
    let appointments = service.list_appointments(&session, filter).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentState>,
    Extension(session): Extension<Session>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service.get_appointment(&session, appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_status_history(
    State(state): State<AppointmentState>,
    Extension(session): Extension<Session>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let history = service.status_history(&session, appointment_id).await?;

    Ok(Json(json!({
        "appointment_id": appointment_id,
        "history": history
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<AppointmentState>,
    Extension(session): Extension<Session>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let transition = service.update_status(&session, appointment_id, request).await?;

    Ok(Json(json!(transition)))
}

#[axum::debug_handler]
pub async fn start_checkout(
    State(state): State<AppointmentState>,
    Extension(session): Extension<Session>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let checkout = service.start_checkout(&session, appointment_id).await?;

    Ok(Json(json!(checkout)))
}
