use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::meeting::Meeting,
    store::{MeetingChanges, NewMeeting, Store},
    utils::validation::Validator,
};

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "title": "Project review",
    "date": "2026-03-10",
    "time": "14:30",
    "description": "Bring your mid-term reports",
    "batches": ["FYCSO", "SYCSO"]
}))]
pub struct CreateMeeting {
    pub title: Option<String>,
    /// ISO-8601 date or date-time
    pub date: Option<String>,
    pub time: Option<String>,
    pub description: Option<String>,
    pub batches: Option<Vec<String>>,
}

/// Only the fields sent are changed.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateMeeting {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub description: Option<String>,
    pub batches: Option<Vec<String>>,
}

/// Schedule a meeting for one or more batches
#[utoipa::path(
    post,
    path = "/api/meetings",
    request_body = CreateMeeting,
    responses(
        (status = 201, description = "Meeting created", body = Meeting),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Professors only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Meetings"
)]
pub async fn create_meeting(
    auth: AuthUser,
    body: web::Json<CreateMeeting>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let mut v = Validator::new();
    let title = v.required("title", body.title.as_deref(), "Title is required");
    let date = v.date("date", body.date.as_deref(), "Invalid date format");
    let time = v.required("time", body.time.as_deref(), "Time is required");
    let batches = match body.batches.as_deref() {
        Some(list) => v.batches("batches", list),
        None => {
            v.fail("batches", "Batches must be an array");
            None
        }
    };
    v.finish()?;

    let (Some(title), Some(date), Some(time), Some(batches)) = (title, date, time, batches) else {
        return Err(ApiError::internal("validated fields missing"));
    };

    let meeting = store
        .insert_meeting(NewMeeting {
            title,
            date,
            time,
            description: body.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            batches,
            professor_id: auth.user_id,
        })
        .await?;

    info!(meeting_id = meeting.id, professor_id = auth.user_id, "Meeting scheduled");
    Ok(HttpResponse::Created().json(meeting))
}

/// Meetings created by the calling professor
#[utoipa::path(
    get,
    path = "/api/meetings",
    responses(
        (status = 200, description = "Meetings, latest date first", body = [Meeting]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Professors only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Meetings"
)]
pub async fn professor_meetings(
    auth: AuthUser,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let meetings = store.meetings_by_professor(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(meetings))
}

/// Meetings addressed to a batch
#[utoipa::path(
    get,
    path = "/api/meetings/student/{batch}",
    params(("batch" = String, Path, description = "Batch code", example = "FYCSO")),
    responses(
        (status = 200, description = "Meetings, soonest first", body = [Meeting]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Students only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Meetings"
)]
pub async fn batch_meetings(
    path: web::Path<String>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let meetings = store.meetings_for_batch(path.trim()).await?;
    Ok(HttpResponse::Ok().json(meetings))
}

/// Edit a meeting
#[utoipa::path(
    put,
    path = "/api/meetings/{id}",
    params(("id" = u64, Path, description = "Meeting id")),
    request_body = UpdateMeeting,
    responses(
        (status = 200, description = "Updated meeting", body = Meeting),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Professors only"),
        (status = 404, description = "Meeting not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Meetings"
)]
pub async fn update_meeting(
    path: web::Path<u64>,
    body: web::Json<UpdateMeeting>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let body = body.into_inner();

    let mut v = Validator::new();
    let title = v.optional_text("title", body.title.as_deref(), "Title is required");
    let date = match body.date.as_deref() {
        Some(raw) => v.date("date", Some(raw), "Invalid date format"),
        None => None,
    };
    let time = v.optional_text("time", body.time.as_deref(), "Time is required");
    let batches = body.batches.as_deref().and_then(|list| v.batches("batches", list));
    v.finish()?;

    let changes = MeetingChanges {
        title,
        date,
        time,
        description: body.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        batches,
    };

    let meeting = store
        .update_meeting(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Meeting not found"))?;

    info!(meeting_id = id, "Meeting updated");
    Ok(HttpResponse::Ok().json(meeting))
}

/// Cancel a meeting
#[utoipa::path(
    delete,
    path = "/api/meetings/{id}",
    params(("id" = u64, Path, description = "Meeting id")),
    responses(
        (status = 204, description = "Meeting deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Professors only"),
        (status = 404, description = "Meeting not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Meetings"
)]
pub async fn delete_meeting(
    path: web::Path<u64>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    if !store.delete_meeting(id).await? {
        return Err(ApiError::not_found("Meeting not found"));
    }

    info!(meeting_id = id, "Meeting deleted");
    Ok(HttpResponse::NoContent().finish())
}
