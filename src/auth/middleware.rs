use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
};

use crate::auth::auth::{AuthUser, authenticate};
use crate::error::ApiError;
use crate::model::role::Role;

/// Rejects requests without a valid bearer token and stores the caller in the
/// request extensions for handlers and [`role_guard`].
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let user = match authenticate(req.request()) {
        Ok(user) => user,
        Err(err) => {
            tracing::debug!(path = %req.path(), error = %err, "Rejected unauthenticated request");
            return Ok(req.into_response(err.error_response()));
        }
    };

    req.extensions_mut().insert(user);
    next.call(req).await
}

/// Must run inside [`auth_middleware`].
pub async fn role_guard(
    req: ServiceRequest,
    next: Next<BoxBody>,
    allowed: &'static [Role],
) -> Result<ServiceResponse<BoxBody>, Error> {
    let role = req.extensions().get::<AuthUser>().map(|u| u.role);

    let err = match role {
        Some(role) if allowed.contains(&role) => return next.call(req).await,
        Some(_) => ApiError::forbidden("Access denied"),
        None => ApiError::unauthorized("Not authorized, no token"),
    };
    Ok(req.into_response(err.error_response()))
}
