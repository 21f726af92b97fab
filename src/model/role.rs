use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Student,
    Professor,
    /// Head of department, the second approval stage.
    Hod,
}

impl Role {
    /// Students carry a single batch, everyone else a list.
    pub fn has_single_batch(&self) -> bool {
        *self == Role::Student
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lowercase_names() {
        assert_eq!("student".parse::<Role>().ok(), Some(Role::Student));
        assert_eq!("hod".parse::<Role>().ok(), Some(Role::Hod));
        assert!("admin".parse::<Role>().is_err());
        assert!("Professor".parse::<Role>().is_err());
    }

    #[test]
    fn display_matches_wire_name() {
        assert_eq!(Role::Professor.to_string(), "professor");
        assert_eq!(serde_json::to_string(&Role::Hod).unwrap(), "\"hod\"");
    }
}
