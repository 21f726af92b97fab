use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;
use crate::model::user::PublicUser;

/// JWT payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Email at issue time
    pub sub: String,
    pub role: Role,
    pub exp: u64,
    pub jti: String,
}

/// Fields arrive as raw strings so every problem is reported as a field error
/// instead of a single deserialization failure.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "Asha Patil",
    "email": "asha@college.edu",
    "password": "secret1",
    "role": "student",
    "batch": "FYCSO"
}))]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// student, professor or hod
    pub role: Option<String>,
    /// Students only
    pub batch: Option<String>,
    /// Professors and HODs
    pub batches: Option<Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "email": "asha@college.edu", "password": "secret1" }))]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Absent fields are left unchanged.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub batch: Option<String>,
    pub batches: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}
