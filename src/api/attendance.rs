use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::attendance::{AttendanceSession, PresenceStatus, SessionStatus, SessionView},
    store::{NewSession, NewSubmission, Store},
    utils::validation::Validator,
};

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "batch": "FYCSO",
    "course": "Data Structures",
    "date": "2026-03-02T09:00:00Z",
    "expiresAt": "2026-03-02T10:30:00Z"
}))]
pub struct CreateSession {
    pub batch: Option<String>,
    pub course: Option<String>,
    /// ISO-8601 date or date-time
    pub date: Option<String>,
    /// ISO-8601 date or date-time, after `date`
    pub expires_at: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "status": "present" }))]
pub struct SubmitAttendance {
    /// present or late
    pub status: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "status": "closed" }))]
pub struct SetSessionStatus {
    /// active or closed
    pub status: Option<String>,
}

/// Open an attendance session for a batch
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = CreateSession,
    responses(
        (status = 201, description = "Session created", body = AttendanceSession),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Professors only"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn create_session(
    auth: AuthUser,
    body: web::Json<CreateSession>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let batch = v
        .required("batch", body.batch.as_deref(), "Batch is required")
        .and_then(|b| v.batch("batch", &b));
    let course = v.required("course", body.course.as_deref(), "Course is required");
    let date = v.date("date", body.date.as_deref(), "Invalid date format");
    let expires_at = v.date("expiresAt", body.expires_at.as_deref(), "Invalid expiration date format");
    if let (Some(date), Some(expires_at)) = (date, expires_at) {
        v.check(expires_at > date, "expiresAt", "Expiration must be after the session date");
    }
    v.finish()?;

    let (Some(batch), Some(course), Some(date), Some(expires_at)) = (batch, course, date, expires_at) else {
        return Err(ApiError::internal("validated fields missing"));
    };

    let session = store
        .insert_session(NewSession {
            batch,
            course,
            professor_id: auth.user_id,
            date,
            expires_at,
        })
        .await?;

    info!(session_id = session.id, professor_id = auth.user_id, batch = %session.batch, "Attendance session opened");
    Ok(HttpResponse::Created().json(session))
}

/// Sessions created by the calling professor
#[utoipa::path(
    get,
    path = "/api/attendance/professor",
    responses(
        (status = 200, description = "Sessions, latest first", body = [AttendanceSession]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Professors only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn professor_sessions(
    auth: AuthUser,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let sessions = store.sessions_by_professor(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(sessions))
}

/// Active sessions for a batch, with the current check-in window
#[utoipa::path(
    get,
    path = "/api/attendance/student/{batch}",
    params(("batch" = String, Path, description = "Batch code", example = "FYCSO")),
    responses(
        (status = 200, description = "Active sessions, latest first", body = [SessionView]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Students only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn student_sessions(
    path: web::Path<String>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let now = Utc::now();
    let views: Vec<SessionView> = store
        .active_sessions_for_batch(path.trim())
        .await?
        .into_iter()
        .map(|session| SessionView::at(session, now))
        .collect();

    Ok(HttpResponse::Ok().json(views))
}

/// Check in to a session
///
/// Every call appends a submission; repeats and late check-ins are recorded as sent.
#[utoipa::path(
    post,
    path = "/api/attendance/{id}/submit",
    params(("id" = u64, Path, description = "Session id")),
    request_body = SubmitAttendance,
    responses(
        (status = 200, description = "Updated session", body = AttendanceSession),
        (status = 400, description = "Invalid status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Students only"),
        (status = 404, description = "Session not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn submit_attendance(
    auth: AuthUser,
    path: web::Path<u64>,
    body: web::Json<SubmitAttendance>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let mut v = Validator::new();
    // NA is reserved for professors marking absentees
    let status = match v.one_of::<PresenceStatus>("status", body.status.as_deref(), "Invalid status") {
        Some(PresenceStatus::NotApplicable) => {
            v.fail("status", "Invalid status");
            None
        }
        other => other,
    };
    v.finish()?;
    let Some(status) = status else {
        return Err(ApiError::internal("validated fields missing"));
    };

    let session = store
        .append_submission(
            id,
            NewSubmission {
                student_id: auth.user_id,
                status,
                submitted_at: Utc::now(),
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Attendance session not found"))?;

    info!(session_id = id, student_id = auth.user_id, status = %status, "Attendance submitted");
    Ok(HttpResponse::Ok().json(session))
}

/// Close or reopen a session
#[utoipa::path(
    put,
    path = "/api/attendance/{id}",
    params(("id" = u64, Path, description = "Session id")),
    request_body = SetSessionStatus,
    responses(
        (status = 200, description = "Updated session", body = AttendanceSession),
        (status = 400, description = "Invalid status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Professors only"),
        (status = 404, description = "Session not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn set_session_status(
    auth: AuthUser,
    path: web::Path<u64>,
    body: web::Json<SetSessionStatus>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let mut v = Validator::new();
    let status = v.one_of::<SessionStatus>("status", body.status.as_deref(), "Invalid status");
    v.finish()?;
    let Some(status) = status else {
        return Err(ApiError::internal("validated fields missing"));
    };

    let session = store
        .set_session_status(id, status)
        .await?
        .ok_or_else(|| ApiError::not_found("Attendance session not found"))?;

    info!(session_id = id, professor_id = auth.user_id, status = %status, "Attendance session status changed");
    Ok(HttpResponse::Ok().json(session))
}
