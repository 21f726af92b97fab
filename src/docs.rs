use crate::api::attendance::{CreateSession, SetSessionStatus, SubmitAttendance};
use crate::api::meeting::{CreateMeeting, UpdateMeeting};
use crate::api::request::{ApprovalInput, CreateRequest, HodDecision, UpdateRequest};
use crate::error::FieldError;
use crate::model::attendance::{AttendanceSession, PresenceStatus, SessionStatus, SessionView, Submission, Window};
use crate::model::meeting::Meeting;
use crate::model::request::{
    Approval, Decision, Pagination, PartySummary, PermissionRequest, RequestDetail, RequestList, RequestStatus,
    RequestType,
};
use crate::model::role::Role;
use crate::model::user::{ProfessorEntry, PublicUser};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, UpdateUserRequest};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Permitdesk API",
        version = "1.0.0",
        description = r#"
## Student permission requests and attendance

- **Users**: register, log in, update a profile, list professors
- **Requests**: students apply for leave or deadline extensions; professors approve, reject or forward to the HOD
- **Attendance**: professors open time-boxed sessions, students check in
- **Meetings**: professors schedule meetings for one or more batches

Every endpoint except register, login and health expects `Authorization: Bearer <token>`.
Validation failures return `{"errors": [{"field", "message"}]}`; every other error returns `{"message"}`.
"#,
    ),
    paths(
        crate::routes::health,

        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::update_user,
        crate::auth::handlers::professors,

        crate::api::request::create_request,
        crate::api::request::student_requests,
        crate::api::request::professor_requests,
        crate::api::request::hod_requests,
        crate::api::request::update_request,
        crate::api::request::hod_decision,

        crate::api::attendance::create_session,
        crate::api::attendance::professor_sessions,
        crate::api::attendance::student_sessions,
        crate::api::attendance::submit_attendance,
        crate::api::attendance::set_session_status,

        crate::api::meeting::create_meeting,
        crate::api::meeting::professor_meetings,
        crate::api::meeting::batch_meetings,
        crate::api::meeting::update_meeting,
        crate::api::meeting::delete_meeting
    ),
    components(
        schemas(
            FieldError,
            Role,
            PublicUser,
            ProfessorEntry,
            RegisterRequest,
            LoginRequest,
            UpdateUserRequest,
            AuthResponse,
            RequestStatus,
            RequestType,
            Decision,
            Approval,
            PermissionRequest,
            PartySummary,
            RequestDetail,
            Pagination,
            RequestList,
            CreateRequest,
            ApprovalInput,
            UpdateRequest,
            HodDecision,
            SessionStatus,
            PresenceStatus,
            Submission,
            AttendanceSession,
            Window,
            SessionView,
            CreateSession,
            SubmitAttendance,
            SetSessionStatus,
            Meeting,
            CreateMeeting,
            UpdateMeeting
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "Registration, login and profiles"),
        (name = "Requests", description = "Permission requests and their approval stages"),
        (name = "Attendance", description = "Attendance sessions and check-ins"),
        (name = "Meetings", description = "Batch meetings"),
        (name = "Health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/api/users/register",
            "/api/requests/{id}/hod",
            "/api/attendance/student/{batch}",
            "/api/meetings/{id}",
            "/api/health",
        ] {
            assert!(paths.iter().any(|p| *p == expected), "missing {expected}");
        }
        assert!(doc.components.unwrap().security_schemes.contains_key("bearer_auth"));
    }
}
