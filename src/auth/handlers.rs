use actix_web::{HttpResponse, web};
use tracing::{debug, error, info, instrument};

use crate::{
    auth::{
        auth::AuthUser,
        jwt::generate_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    error::ApiError,
    model::{
        role::Role,
        user::{ProfessorEntry, PublicUser, User},
    },
    models::{AuthResponse, LoginRequest, RegisterRequest, UpdateUserRequest},
    store::{NewUser, Store, UserChanges},
    utils::{
        email_index::EmailIndex,
        validation::{Validator, is_email, normalize_email},
    },
};

const MIN_PASSWORD_LEN: usize = 6;

fn issue_token(user: &User, config: &Config) -> Result<String, ApiError> {
    generate_token(user, &config.jwt_secret, config.token_ttl).map_err(|e| {
        error!(error = %e, user_id = user.id, "Failed to sign token");
        ApiError::internal("Failed to issue token")
    })
}

fn hash(password: &str) -> Result<String, ApiError> {
    hash_password(password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ApiError::internal("Failed to hash password")
    })
}

fn check_email(v: &mut Validator, email: Option<&str>) -> Option<String> {
    let email = email.map(normalize_email).filter(|e| is_email(e));
    if email.is_none() {
        v.fail("email", "Invalid email format");
    }
    email
}

fn check_password(v: &mut Validator, password: Option<&str>) -> Option<String> {
    let ok = password.is_some_and(|p| p.chars().count() >= MIN_PASSWORD_LEN);
    v.check(ok, "password", "Password must be at least 6 characters long")
        .then(|| password.unwrap_or_default().to_string())
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = AuthResponse),
        (status = 400, description = "Validation failed or user already exists", body = Object, example = json!({
            "message": "User already exists"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users"
)]
pub async fn register(
    body: web::Json<RegisterRequest>,
    store: web::Data<dyn Store>,
    emails: web::Data<EmailIndex>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let mut v = Validator::new();
    let name = v.required("name", body.name.as_deref(), "Name is required");
    let email = check_email(&mut v, body.email.as_deref());
    let password = check_password(&mut v, body.password.as_deref());
    let role = v.one_of::<Role>("role", body.role.as_deref(), "Invalid role");
    let batch = body.batch.as_deref().and_then(|b| v.batch("batch", b));
    let batches = body.batches.as_deref().and_then(|b| v.batches("batches", b));
    v.finish()?;

    let (Some(name), Some(email), Some(password), Some(role)) = (name, email, password, role) else {
        return Err(ApiError::internal("validated fields missing"));
    };

    if !emails.is_available(&email, store.get_ref()).await? {
        info!(%email, "Registration rejected: email taken");
        return Err(ApiError::bad_request("User already exists"));
    }

    let (batch, batches) = if role.has_single_batch() {
        (batch, Vec::new())
    } else {
        (None, batches.unwrap_or_default())
    };

    let user = store
        .insert_user(NewUser {
            name,
            email,
            password_hash: hash(&password)?,
            role,
            batch,
            batches,
        })
        .await?;
    emails.mark_taken(&user.email).await;

    info!(user_id = user.id, role = %user.role, "User registered");

    Ok(HttpResponse::Created().json(AuthResponse {
        token: issue_token(&user, &config)?,
        user: PublicUser::from(&user),
    }))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Invalid credentials", body = Object, example = json!({
            "message": "Invalid credentials"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users"
)]
#[instrument(
    name = "auth_login",
    skip(store, config, body),
    fields(email = %body.email.as_deref().unwrap_or_default())
)]
pub async fn login(
    body: web::Json<LoginRequest>,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    let mut v = Validator::new();
    let email = check_email(&mut v, body.email.as_deref());
    let password = v.required("password", body.password.as_deref(), "Password is required");
    v.finish()?;
    let (Some(email), Some(_)) = (email, password) else {
        return Err(ApiError::internal("validated fields missing"));
    };

    debug!("Fetching user");
    let Some(user) = store.user_by_email(&email).await? else {
        info!("Invalid credentials: user not found");
        return Err(ApiError::bad_request("Invalid credentials"));
    };

    // verify against the raw password, not the trimmed one
    let raw_password = body.password.as_deref().unwrap_or_default();
    if let Err(e) = verify_password(raw_password, &user.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::bad_request("Invalid credentials"));
    }

    info!(user_id = user.id, "Login successful");

    Ok(HttpResponse::Ok().json(AuthResponse {
        token: issue_token(&user, &config)?,
        user: PublicUser::from(&user),
    }))
}

/// Update the calling user's profile
#[utoipa::path(
    put,
    path = "/api/users/update",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated profile", body = PublicUser),
        (status = 400, description = "Validation failed or email already taken"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    body: web::Json<UpdateUserRequest>,
    store: web::Data<dyn Store>,
    emails: web::Data<EmailIndex>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let mut v = Validator::new();
    let name = v.optional_text("name", body.name.as_deref(), "Name is required");
    let email = match body.email.as_deref() {
        Some(e) => check_email(&mut v, Some(e)),
        None => None,
    };
    let password = match body.password.as_deref() {
        Some(p) => check_password(&mut v, Some(p)),
        None => None,
    };
    let batch = body.batch.as_deref().and_then(|b| v.batch("batch", b));
    let batches = body.batches.as_deref().and_then(|b| v.batches("batches", b));
    v.finish()?;

    let Some(current) = store.user_by_id(auth.user_id).await? else {
        return Err(ApiError::not_found("User not found"));
    };

    let moved_email = email.filter(|e| *e != current.email);
    if let Some(new_email) = &moved_email {
        if !emails.is_available(new_email, store.get_ref()).await? {
            return Err(ApiError::bad_request("User already exists"));
        }
    }

    let changes = UserChanges {
        name,
        email: moved_email.clone(),
        password_hash: password.as_deref().map(hash).transpose()?,
        batch,
        batches,
    };

    let updated = store
        .update_user(auth.user_id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if moved_email.is_some() {
        emails.forget(&current.email).await;
        emails.mark_taken(&updated.email).await;
    }

    info!(user_id = updated.id, "Profile updated");
    Ok(HttpResponse::Ok().json(PublicUser::from(&updated)))
}

/// List professors for the request form
#[utoipa::path(
    get,
    path = "/api/users/professors",
    responses(
        (status = 200, description = "Professors ordered by name", body = [ProfessorEntry]),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn professors(store: web::Data<dyn Store>) -> Result<HttpResponse, ApiError> {
    let professors: Vec<ProfessorEntry> = store
        .users_with_role(Role::Professor)
        .await?
        .iter()
        .map(ProfessorEntry::from)
        .collect();

    Ok(HttpResponse::Ok().json(professors))
}
