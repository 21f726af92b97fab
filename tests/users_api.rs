#[macro_use]
mod common;

use actix_web::http::{Method, StatusCode};
use serde_json::json;

use common::{authed, request, send};
use permitdesk::auth::jwt::verify_token;
use permitdesk::model::role::Role;

#[actix_web::test]
async fn register_returns_token_and_public_user() {
    let state = common::state();
    let app = test_app!(state);

    let req = request(Method::POST, "/api/users/register")
        .set_json(json!({
            "name": "Asha Patil",
            "email": "Asha@College.edu",
            "password": "secret1",
            "role": "student",
            "batch": "FYCSO"
        }))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["email"], "asha@college.edu");
    assert_eq!(body["user"]["role"], "student");
    assert_eq!(body["user"]["batch"], "FYCSO");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("passwordHash").is_none());
}

#[actix_web::test]
async fn professor_keeps_batches_not_batch() {
    let state = common::state();
    let app = test_app!(state);

    let req = request(Method::POST, "/api/users/register")
        .set_json(json!({
            "name": "Dr. Kulkarni",
            "email": "kulkarni@college.edu",
            "password": "secret1",
            "role": "professor",
            "batch": "FYCSO",
            "batches": ["FYCSO", "SYCSO"]
        }))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["batches"], json!(["FYCSO", "SYCSO"]));
    assert!(body["user"].get("batch").is_none());
}

#[actix_web::test]
async fn duplicate_email_is_rejected_case_insensitively() {
    let state = common::state();
    let app = test_app!(state);
    common::seed(&state, "Asha", "asha@college.edu", Role::Student, &["FYCSO"]).await;

    let req = request(Method::POST, "/api/users/register")
        .set_json(json!({
            "name": "Other Asha",
            "email": "ASHA@college.edu",
            "password": "secret1",
            "role": "student"
        }))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");
    assert_eq!(state.store.all_emails().await.unwrap(), ["asha@college.edu"]);
    let students = state.store.users_with_role(Role::Student).await.unwrap();
    assert!(students.iter().all(|u| u.name != "Other Asha"));
}

#[actix_web::test]
async fn register_reports_every_bad_field() {
    let state = common::state();
    let app = test_app!(state);

    let req = request(Method::POST, "/api/users/register")
        .set_json(json!({
            "name": "  ",
            "email": "not-an-email",
            "password": "123",
            "role": "admin",
            "batch": "XX"
        }))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["name", "email", "password", "role", "batch"]);
}

#[actix_web::test]
async fn login_checks_credentials() {
    let state = common::state();
    let app = test_app!(state);
    let (asha, _) = common::seed(&state, "Asha", "asha@college.edu", Role::Student, &["FYCSO"]).await;

    let ok = request(Method::POST, "/api/users/login")
        .set_json(json!({ "email": "asha@college.edu", "password": "secret1" }))
        .to_request();
    let (status, body) = send(&app, ok).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Asha");
    let claims = verify_token(body["token"].as_str().unwrap(), common::SECRET).unwrap();
    assert_eq!(claims.user_id, asha.id);
    assert_eq!(claims.role, Role::Student);

    for (email, password) in [("asha@college.edu", "wrong-pass"), ("nobody@college.edu", "secret1")] {
        let req = request(Method::POST, "/api/users/login")
            .set_json(json!({ "email": email, "password": password }))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid credentials");
    }
}

#[actix_web::test]
async fn login_requires_a_password() {
    let state = common::state();
    let app = test_app!(state);

    let req = request(Method::POST, "/api/users/login")
        .set_json(json!({ "email": "asha@college.edu" }))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "password");
    assert_eq!(body["errors"][0]["message"], "Password is required");
}

#[actix_web::test]
async fn update_changes_own_profile() {
    let state = common::state();
    let app = test_app!(state);
    let (_, token) = common::student(&state, "Asha").await;
    common::student(&state, "Ravi").await;

    let req = authed(Method::PUT, "/api/users/update", &token)
        .set_json(json!({ "name": "Asha P.", "batch": "SYCSO" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Asha P.");
    assert_eq!(body["batch"], "SYCSO");

    let taken = authed(Method::PUT, "/api/users/update", &token)
        .set_json(json!({ "email": "ravi@students.college.edu" }))
        .to_request();
    let (status, body) = send(&app, taken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");

    let moved = authed(Method::PUT, "/api/users/update", &token)
        .set_json(json!({ "email": "asha.p@students.college.edu", "password": "newsecret" }))
        .to_request();
    let (status, _) = send(&app, moved).await;
    assert_eq!(status, StatusCode::OK);

    let relogin = request(Method::POST, "/api/users/login")
        .set_json(json!({ "email": "asha.p@students.college.edu", "password": "newsecret" }))
        .to_request();
    let (status, _) = send(&app, relogin).await;
    assert_eq!(status, StatusCode::OK);

    // the old address is free again
    let reuse = request(Method::POST, "/api/users/register")
        .set_json(json!({
            "name": "New Asha",
            "email": "asha@students.college.edu",
            "password": "secret1",
            "role": "student"
        }))
        .to_request();
    let (status, _) = send(&app, reuse).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[actix_web::test]
async fn update_requires_a_token() {
    let state = common::state();
    let app = test_app!(state);

    let req = request(Method::PUT, "/api/users/update")
        .set_json(json!({ "name": "Nobody" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());

    let req = authed(Method::PUT, "/api/users/update", "garbage")
        .set_json(json!({ "name": "Nobody" }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn professors_are_listed_by_name() {
    let state = common::state();
    let app = test_app!(state);
    let (_, token) = common::student(&state, "Asha").await;
    common::professor(&state, "Zeenat").await;
    common::professor(&state, "Bhosale").await;
    common::hod(&state, "Deshmukh").await;

    let (status, body) = send(&app, authed(Method::GET, "/api/users/professors", &token).to_request()).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body.as_array().unwrap().iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Bhosale", "Zeenat"]);
    assert!(body[0].get("email").is_none());
}

#[actix_web::test]
async fn health_unknown_routes_and_bad_json() {
    let state = common::state();
    let app = test_app!(state);

    let (status, body) = send(&app, request(Method::GET, "/api/health").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, request(Method::GET, "/api/nowhere").to_request()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not found");

    let req = request(Method::POST, "/api/users/login")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Invalid JSON body"));
}
