use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::{
        request::{Approval, Decision, Pagination, RequestList, RequestStatus, RequestType},
        role::Role,
    },
    store::{NewRequest, RequestChanges, RequestQuery, RequestScope, Store},
    utils::validation::Validator,
};

const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 100;
const MAX_REMARKS: usize = 500;

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "title": "Leave for sister's wedding",
    "content": "Requesting leave from 3rd to 5th March.",
    "professorId": 7,
    "type": "leave"
}))]
pub struct CreateRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub professor_id: Option<u64>,
    /// leave, deadline-extension, special or custom
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ApprovalInput {
    /// approved or rejected
    pub status: Option<String>,
    pub remarks: Option<String>,
    /// ISO-8601; defaults to now
    pub date: Option<String>,
}

/// Every field is optional; only the ones sent are changed.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "status": "forwarded",
    "professorApproval": { "status": "approved", "remarks": "Forwarded to HOD" }
}))]
pub struct UpdateRequest {
    pub status: Option<String>,
    pub remarks: Option<String>,
    pub professor_approval: Option<ApprovalInput>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "status": "approved", "remarks": "Granted" }))]
pub struct HodDecision {
    /// approved or rejected
    pub status: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RequestFilter {
    /// Page number, starting at 1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    /// Items per page (1-100, default 10)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// A request status, or `all`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// A request type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl RequestFilter {
    fn into_query(self, scope: RequestScope, fixed_status: Option<RequestStatus>) -> Result<RequestQuery, ApiError> {
        let mut v = Validator::new();

        let status = match (fixed_status, self.status.as_deref()) {
            (Some(fixed), _) => Some(fixed),
            (None, None | Some("all") | Some("")) => None,
            (None, raw) => v.one_of("status", raw, "Invalid status"),
        };
        let kind = match self.kind.as_deref() {
            None | Some("") => None,
            raw => v.one_of("type", raw, "Invalid request type"),
        };
        v.finish()?;

        Ok(RequestQuery {
            scope,
            status,
            kind,
            page: self.page.unwrap_or(1).max(1),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        })
    }
}

async fn list(store: &dyn Store, query: RequestQuery) -> Result<HttpResponse, ApiError> {
    let page = store.list_requests(&query).await?;
    Ok(HttpResponse::Ok().json(RequestList {
        requests: page.items,
        pagination: Pagination::new(query.page, query.limit, page.total),
    }))
}

/// Submit a permission request to a professor
#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = CreateRequest,
    responses(
        (status = 201, description = "Request created", body = crate::model::request::PermissionRequest),
        (status = 400, description = "Validation failed or unknown professor"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Students only"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn create_request(
    auth: AuthUser,
    body: web::Json<CreateRequest>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let title = v.required("title", body.title.as_deref(), "Title is required");
    let content = v.required("content", body.content.as_deref(), "Content is required");
    v.check(body.professor_id.is_some(), "professorId", "Professor ID is required");
    let kind = v.one_of::<RequestType>("type", body.kind.as_deref(), "Invalid request type");
    v.finish()?;

    let (Some(title), Some(content), Some(professor_id), Some(kind)) = (title, content, body.professor_id, kind)
    else {
        return Err(ApiError::internal("validated fields missing"));
    };

    let professor = store.user_by_id(professor_id).await?;
    if professor.is_none_or(|p| p.role != Role::Professor) {
        return Err(ApiError::bad_request("Professor not found"));
    }

    let request = store
        .insert_request(NewRequest {
            title,
            content,
            student_id: auth.user_id,
            professor_id,
            kind,
            created_at: Utc::now(),
        })
        .await?;

    info!(request_id = request.id, student_id = auth.user_id, professor_id, "Request submitted");
    Ok(HttpResponse::Created().json(request))
}

/// The calling student's requests
#[utoipa::path(
    get,
    path = "/api/requests/student",
    params(RequestFilter),
    responses(
        (status = 200, description = "Paginated requests, newest first", body = RequestList),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Students only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn student_requests(
    auth: AuthUser,
    filter: web::Query<RequestFilter>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let query = filter.into_inner().into_query(RequestScope::Student(auth.user_id), None)?;
    list(store.get_ref(), query).await
}

/// Requests addressed to the calling professor
#[utoipa::path(
    get,
    path = "/api/requests/professor",
    params(RequestFilter),
    responses(
        (status = 200, description = "Paginated requests, newest first", body = RequestList),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Professors only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn professor_requests(
    auth: AuthUser,
    filter: web::Query<RequestFilter>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let query = filter.into_inner().into_query(RequestScope::Professor(auth.user_id), None)?;
    list(store.get_ref(), query).await
}

/// Requests forwarded to the head of department
#[utoipa::path(
    get,
    path = "/api/requests/hod",
    params(RequestFilter),
    responses(
        (status = 200, description = "Forwarded requests, newest first; `status` is ignored", body = RequestList),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HOD only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn hod_requests(
    filter: web::Query<RequestFilter>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let query = filter
        .into_inner()
        .into_query(RequestScope::Everyone, Some(RequestStatus::Forwarded))?;
    list(store.get_ref(), query).await
}

/// Change status, remarks or the professor's approval
#[utoipa::path(
    put,
    path = "/api/requests/{id}",
    params(("id" = u64, Path, description = "Request id")),
    request_body = UpdateRequest,
    responses(
        (status = 200, description = "Updated request", body = crate::model::request::PermissionRequest),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn update_request(
    auth: AuthUser,
    path: web::Path<u64>,
    body: web::Json<UpdateRequest>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let body = body.into_inner();

    let mut v = Validator::new();
    let status = match body.status.as_deref() {
        Some(raw) => v.one_of::<RequestStatus>("status", Some(raw), "Invalid status"),
        None => None,
    };
    let remarks = match body.remarks.as_deref().map(str::trim) {
        Some(r) => v
            .check(
                (1..=MAX_REMARKS).contains(&r.chars().count()),
                "remarks",
                "Remarks must be between 1 and 500 characters",
            )
            .then(|| r.to_string()),
        None => None,
    };
    let professor_approval = match &body.professor_approval {
        Some(input) => approval_from(&mut v, input),
        None => None,
    };
    v.finish()?;

    let updated = store
        .update_request(
            id,
            RequestChanges {
                status,
                remarks,
                professor_approval,
                hod_approval: None,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Request not found"))?;

    info!(request_id = id, by = auth.user_id, status = %updated.status, "Request updated");
    Ok(HttpResponse::Ok().json(updated))
}

fn approval_from(v: &mut Validator, input: &ApprovalInput) -> Option<Approval> {
    let status = v.one_of::<Decision>(
        "professorApproval.status",
        input.status.as_deref(),
        "Invalid approval status",
    );
    let remarks_ok = v.max_len(
        "professorApproval.remarks",
        input.remarks.as_deref(),
        MAX_REMARKS,
        "Approval remarks must not exceed 500 characters",
    );
    let date = match input.date.as_deref() {
        Some(raw) => v.date("professorApproval.date", Some(raw), "Invalid date format"),
        None => Some(Utc::now()),
    };

    match (status, remarks_ok, date) {
        (Some(status), true, Some(date)) => Some(Approval {
            status,
            remarks: trimmed(input.remarks.as_deref()),
            date,
        }),
        _ => None,
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Final decision on a forwarded request
#[utoipa::path(
    put,
    path = "/api/requests/{id}/hod",
    params(("id" = u64, Path, description = "Request id")),
    request_body = HodDecision,
    responses(
        (status = 200, description = "Decided request", body = crate::model::request::PermissionRequest),
        (status = 400, description = "Validation failed or request not forwarded", body = Object, example = json!({
            "message": "Only forwarded requests can be decided by the HOD"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HOD only"),
        (status = 404, description = "Request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn hod_decision(
    auth: AuthUser,
    path: web::Path<u64>,
    body: web::Json<HodDecision>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let mut v = Validator::new();
    let decision = v.one_of::<Decision>("status", body.status.as_deref(), "Invalid approval status");
    v.max_len("remarks", body.remarks.as_deref(), MAX_REMARKS, "Remarks must not exceed 500 characters");
    v.finish()?;
    let Some(decision) = decision else {
        return Err(ApiError::internal("validated fields missing"));
    };

    let request = store
        .request_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Request not found"))?;
    if request.status != RequestStatus::Forwarded {
        return Err(ApiError::bad_request("Only forwarded requests can be decided by the HOD"));
    }

    let updated = store
        .update_request(
            id,
            RequestChanges {
                status: Some(decision.into()),
                hod_approval: Some(Approval {
                    status: decision,
                    remarks: trimmed(body.remarks.as_deref()),
                    date: Utc::now(),
                }),
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Request not found"))?;

    info!(request_id = id, hod_id = auth.user_id, decision = %decision, "HOD decision recorded");
    Ok(HttpResponse::Ok().json(updated))
}
