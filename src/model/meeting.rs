use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: u64,
    #[schema(example = "Project review")]
    pub title: String,
    pub date: DateTime<Utc>,
    /// Free-form time of day as entered by the professor
    #[schema(example = "14:30")]
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[schema(example = json!(["FYCSO", "SYCSO"]))]
    pub batches: Vec<String>,
    pub professor_id: u64,
}

impl Meeting {
    pub fn targets(&self, batch: &str) -> bool {
        self.batches.iter().any(|b| b == batch)
    }
}
