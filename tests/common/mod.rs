#![allow(dead_code, unused_macros)]

use std::sync::Arc;

use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::{Method, StatusCode},
    test::{self, TestRequest},
};
use serde_json::Value;

use permitdesk::{
    auth::{jwt::generate_token, password::hash_password},
    config::Config,
    model::{role::Role, user::User},
    state::AppState,
    store::{MemoryStore, NewUser},
};

pub const SECRET: &str = "integration-test-secret";

pub fn state() -> AppState {
    AppState::new(Config::with_secret(SECRET), Arc::new(MemoryStore::new()))
}

/// Builds the full service over `$state`, the way `main` mounts it.
macro_rules! test_app {
    ($state:expr) => {{
        let state = $state.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(actix_web::middleware::NormalizePath::trim())
                .configure(move |cfg| state.configure(cfg)),
        )
        .await
    }};
}

/// The rate limiter keys on the peer address, so every test request needs one.
pub fn request(method: Method, uri: &str) -> TestRequest {
    TestRequest::default()
        .method(method)
        .uri(uri)
        .peer_addr("127.0.0.1:40000".parse().unwrap())
}

pub fn authed(method: Method, uri: &str, token: &str) -> TestRequest {
    request(method, uri).insert_header(("Authorization", format!("Bearer {token}")))
}

/// Sends a request and decodes the JSON body (`Null` when empty).
pub async fn send<S, R, B>(app: &S, req: R) -> (StatusCode, Value)
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Inserts a user straight into the store and signs a token for them.
pub async fn seed(state: &AppState, name: &str, email: &str, role: Role, batches: &[&str]) -> (User, String) {
    let (batch, batches) = if role.has_single_batch() {
        (batches.first().map(|b| b.to_string()), Vec::new())
    } else {
        (None, batches.iter().map(|b| b.to_string()).collect())
    };

    let user = state
        .store
        .insert_user(NewUser {
            name: name.into(),
            email: email.into(),
            password_hash: hash_password("secret1").unwrap(),
            role,
            batch,
            batches,
        })
        .await
        .unwrap();
    state.emails.mark_taken(&user.email).await;

    let token = generate_token(&user, SECRET, 3600).unwrap();
    (user, token)
}

pub async fn student(state: &AppState, name: &str) -> (User, String) {
    let email = format!("{}@students.college.edu", name.to_lowercase());
    seed(state, name, &email, Role::Student, &["FYCSO"]).await
}

pub async fn professor(state: &AppState, name: &str) -> (User, String) {
    let email = format!("{}@staff.college.edu", name.to_lowercase());
    seed(state, name, &email, Role::Professor, &["FYCSO", "SYCSO"]).await
}

pub async fn hod(state: &AppState, name: &str) -> (User, String) {
    let email = format!("{}@office.college.edu", name.to_lowercase());
    seed(state, name, &email, Role::Hod, &["FYCSO"]).await
}
