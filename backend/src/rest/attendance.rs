use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{
    AttendanceWithStudent, BulkMarkRequest, BulkMarkResponse, MarkAttendanceRequest,
    MarkAttendanceResponse, StudentHistory, StudentWithAttendance, SummaryQuery,
};
use tracing::info;

use crate::auth::AuthAdmin;
use crate::error::ApiError;
use crate::rest::AppState;

/// GET /api/attendance/date/:date
pub async fn attendance_by_date(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(date): Path<String>,
) -> Result<Json<Vec<StudentWithAttendance>>, ApiError> {
    info!("GET /api/attendance/date/{}", date);

    let entries = state.attendance_service.attendance_by_date(&date).await?;
    Ok(Json(entries))
}

/// GET /api/attendance/student/:id
pub async fn student_history(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> Result<Json<StudentHistory>, ApiError> {
    info!("GET /api/attendance/student/{}", id);

    let history = state.attendance_service.student_history(&id).await?;
    Ok(Json(history))
}

/// POST /api/attendance/mark
pub async fn mark_attendance(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Json(request): Json<MarkAttendanceRequest>,
) -> Result<Json<MarkAttendanceResponse>, ApiError> {
    info!(
        "POST /api/attendance/mark - student: {:?}, date: {:?}",
        request.student_id, request.date
    );

    let response = state.attendance_service.mark_attendance(request).await?;
    Ok(Json(response))
}

/// POST /api/attendance/bulk
pub async fn mark_attendance_bulk(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Json(request): Json<BulkMarkRequest>,
) -> Result<Json<BulkMarkResponse>, ApiError> {
    info!(
        "POST /api/attendance/bulk - date: {:?}, records: {}",
        request.date,
        request.records.as_ref().map(|r| r.len()).unwrap_or(0)
    );

    let response = state.attendance_service.mark_attendance_bulk(request).await?;
    Ok(Json(response))
}

/// GET /api/attendance/summary?startDate=...&endDate=...
pub async fn attendance_summary(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Vec<AttendanceWithStudent>>, ApiError> {
    info!(
        "GET /api/attendance/summary - {:?} to {:?}",
        query.start_date, query.end_date
    );

    let rows = state
        .attendance_service
        .summary(query.start_date, query.end_date)
        .await?;
    Ok(Json(rows))
}
