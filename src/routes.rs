use crate::{
    api::{attendance, meeting, request},
    auth::{
        handlers,
        middleware::{auth_middleware, role_guard},
    },
    config::Config,
    error::ApiError,
    model::role::Role,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{
    HttpResponse,
    body::BoxBody,
    dev::ServiceRequest,
    middleware::{Next, from_fn},
    web,
};
use serde_json::json;
use std::sync::Arc;

const STUDENT: &[Role] = &[Role::Student];
const PROFESSOR: &[Role] = &[Role::Professor];
const HOD: &[Role] = &[Role::Hod];

/// Liveness probe
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = Object, example = json!({ "status": "ok" }))
    ),
    tag = "Health"
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::not_found("Not found"))
}

fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(60_000 / requests_per_min as u64)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // malformed input is a 400 with the usual `{message}` body
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::bad_request(format!("Invalid JSON body: {err}")).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::bad_request(format!("Invalid query string: {err}")).into()),
    )
    .app_data(web::PathConfig::default().error_handler(|_err, _req| ApiError::not_found("Not found").into()));

    cfg.service(
        web::scope(&config.api_prefix)
            .route("/health", web::get().to(health))
            .service(
                web::scope("/users")
                    .service(
                        web::resource("/register")
                            .wrap(register_limiter)
                            .route(web::post().to(handlers::register)),
                    )
                    .service(
                        web::resource("/login")
                            .wrap(login_limiter)
                            .route(web::post().to(handlers::login)),
                    )
                    .service(
                        web::resource("/update")
                            .wrap(from_fn(auth_middleware))
                            .wrap(protected_limiter.clone())
                            .route(web::put().to(handlers::update_user)),
                    )
                    .service(
                        web::resource("/professors")
                            .wrap(from_fn(auth_middleware))
                            .wrap(protected_limiter.clone())
                            .route(web::get().to(handlers::professors)),
                    ),
            )
            .service(
                web::scope("/requests")
                    .wrap(from_fn(auth_middleware))
                    .wrap(protected_limiter.clone())
                    // /requests
                    .service(
                        web::resource("")
                            .wrap(from_fn(|req: ServiceRequest, next: Next<BoxBody>| role_guard(req, next, STUDENT)))
                            .route(web::post().to(request::create_request)),
                    )
                    .service(
                        web::resource("/student")
                            .wrap(from_fn(|req: ServiceRequest, next: Next<BoxBody>| role_guard(req, next, STUDENT)))
                            .route(web::get().to(request::student_requests)),
                    )
                    .service(
                        web::resource("/professor")
                            .wrap(from_fn(|req: ServiceRequest, next: Next<BoxBody>| role_guard(req, next, PROFESSOR)))
                            .route(web::get().to(request::professor_requests)),
                    )
                    .service(
                        web::resource("/hod")
                            .wrap(from_fn(|req: ServiceRequest, next: Next<BoxBody>| role_guard(req, next, HOD)))
                            .route(web::get().to(request::hod_requests)),
                    )
                    // /requests/{id}: any signed-in user
                    .service(web::resource("/{id}").route(web::put().to(request::update_request)))
                    // /requests/{id}/hod
                    .service(
                        web::resource("/{id}/hod")
                            .wrap(from_fn(|req: ServiceRequest, next: Next<BoxBody>| role_guard(req, next, HOD)))
                            .route(web::put().to(request::hod_decision)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .wrap(from_fn(auth_middleware))
                    .wrap(protected_limiter.clone())
                    // /attendance
                    .service(
                        web::resource("")
                            .wrap(from_fn(|req: ServiceRequest, next: Next<BoxBody>| role_guard(req, next, PROFESSOR)))
                            .route(web::post().to(attendance::create_session)),
                    )
                    .service(
                        web::resource("/professor")
                            .wrap(from_fn(|req: ServiceRequest, next: Next<BoxBody>| role_guard(req, next, PROFESSOR)))
                            .route(web::get().to(attendance::professor_sessions)),
                    )
                    .service(
                        web::resource("/student/{batch}")
                            .wrap(from_fn(|req: ServiceRequest, next: Next<BoxBody>| role_guard(req, next, STUDENT)))
                            .route(web::get().to(attendance::student_sessions)),
                    )
                    // /attendance/{id}/submit
                    .service(
                        web::resource("/{id}/submit")
                            .wrap(from_fn(|req: ServiceRequest, next: Next<BoxBody>| role_guard(req, next, STUDENT)))
                            .route(web::post().to(attendance::submit_attendance)),
                    )
                    // /attendance/{id}
                    .service(
                        web::resource("/{id}")
                            .wrap(from_fn(|req: ServiceRequest, next: Next<BoxBody>| role_guard(req, next, PROFESSOR)))
                            .route(web::put().to(attendance::set_session_status)),
                    ),
            )
            .service(
                web::scope("/meetings")
                    .wrap(from_fn(auth_middleware))
                    .wrap(protected_limiter)
                    // /meetings
                    .service(
                        web::resource("")
                            .wrap(from_fn(|req: ServiceRequest, next: Next<BoxBody>| role_guard(req, next, PROFESSOR)))
                            .route(web::post().to(meeting::create_meeting))
                            .route(web::get().to(meeting::professor_meetings)),
                    )
                    .service(
                        web::resource("/professor")
                            .wrap(from_fn(|req: ServiceRequest, next: Next<BoxBody>| role_guard(req, next, PROFESSOR)))
                            .route(web::get().to(meeting::professor_meetings)),
                    )
                    .service(
                        web::resource("/student/{batch}")
                            .wrap(from_fn(|req: ServiceRequest, next: Next<BoxBody>| role_guard(req, next, STUDENT)))
                            .route(web::get().to(meeting::batch_meetings)),
                    )
                    // /meetings/{id}
                    .service(
                        web::resource("/{id}")
                            .wrap(from_fn(|req: ServiceRequest, next: Next<BoxBody>| role_guard(req, next, PROFESSOR)))
                            .route(web::put().to(meeting::update_meeting))
                            .route(web::delete().to(meeting::delete_meeting)),
                    ),
            ),
    );

    cfg.default_service(web::to(not_found));
}
