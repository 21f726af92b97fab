use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

/// Stored user. Never serialized directly; responses go through [`PublicUser`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    /// Set for students only
    pub batch: Option<String>,
    /// Set for professors and HODs
    pub batches: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "name": "Asha",
    "email": "asha@college.edu",
    "role": "student",
    "batch": "FYCSO"
}))]
pub struct PublicUser {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batches: Option<Vec<String>>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        let (batch, batches) = if user.role.has_single_batch() {
            (user.batch.clone(), None)
        } else {
            (None, Some(user.batches.clone()))
        };

        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            batch,
            batches,
        }
    }
}

/// Entry of the professor picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProfessorEntry {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = "Dr. Kulkarni")]
    pub name: String,
}

impl From<&User> for ProfessorEntry {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
        }
    }
}
