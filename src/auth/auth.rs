use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use crate::models::Claims;

/// The caller, as established by the bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.sub,
            role: claims.role,
        }
    }
}

/// Pulls the token out of an `Authorization: Bearer ...` header value.
pub fn bearer_token(req: &HttpRequest) -> Result<&str, ApiError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| ApiError::unauthorized("Not authorized, no token"))?;

    header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Authorization header must start with Bearer"))
}

pub fn authenticate(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| ApiError::internal("App config missing"))?;

    let token = bearer_token(req)?;
    verify_token(token, &config.jwt_secret)
        .map(AuthUser::from)
        .map_err(|_| ApiError::unauthorized("Not authorized, token failed"))
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // the middleware has usually decoded the token already
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }
        ready(authenticate(req))
    }
}
