use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::Session;
use shared_models::error::AppError;

use crate::models::{ReplaceWorkingHoursRequest, ScheduleError};
use crate::services::working_hours::WorkingHoursService;
use crate::state::ScheduleState;

impl From<ScheduleError> for AppError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::Validation(msg) => AppError::ValidationError(msg),
            ScheduleError::Unauthorized(msg) => AppError::Forbidden(msg),
            ScheduleError::Upstream(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn get_working_hours(
    State(state): State<ScheduleState>,
    Path(professional_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = WorkingHoursService::new(state.working_hours.clone());
    let hours = service.get_working_hours(professional_id).await?;

    Ok(Json(json!({
        "professional_id": professional_id,
        "configured": hours.iter().any(|h| h.active),
        "working_hours": hours
    })))
}

#[axum::debug_handler]
pub async fn replace_working_hours(
    State(state): State<ScheduleState>,
    Extension(session): Extension<Session>,
    Json(request): Json<ReplaceWorkingHoursRequest>,
) -> Result<Json<Value>, AppError> {
    let service = WorkingHoursService::new(state.working_hours.clone());
    let hours = service.replace_working_hours(&session, request).await?;

    Ok(Json(json!({
        "working_hours": hours,
        "message": "Working hours updated"
    })))
}
