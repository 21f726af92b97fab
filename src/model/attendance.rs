use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Check-ins more than this many minutes after the session start count as late.
pub const LATE_AFTER_MINUTES: i64 = 60;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Closed,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
pub enum PresenceStatus {
    #[serde(rename = "present")]
    #[strum(serialize = "present")]
    Present,
    #[serde(rename = "late")]
    #[strum(serialize = "late")]
    Late,
    /// Recorded by the professor for students who never checked in.
    #[serde(rename = "NA")]
    #[strum(serialize = "NA")]
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub student_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    pub status: PresenceStatus,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSession {
    pub id: u64,
    #[schema(example = "FYCSO")]
    pub batch: String,
    #[schema(example = "Data Structures")]
    pub course: String,
    pub professor_id: u64,
    pub date: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub students: Vec<Submission>,
}

/// Where "now" falls relative to a session, as shown to students.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    Open,
    Late,
    Expired,
}

impl AttendanceSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_late_at(&self, now: DateTime<Utc>) -> bool {
        now > self.date + Duration::minutes(LATE_AFTER_MINUTES)
    }

    pub fn window_at(&self, now: DateTime<Utc>) -> Window {
        if self.is_expired_at(now) {
            Window::Expired
        } else if self.is_late_at(now) {
            Window::Late
        } else {
            Window::Open
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: AttendanceSession,
    pub window: Window,
}

impl SessionView {
    pub fn at(session: AttendanceSession, now: DateTime<Utc>) -> Self {
        let window = session.window_at(now);
        Self { session, window }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(minutes_open: i64) -> AttendanceSession {
        let date = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        AttendanceSession {
            id: 1,
            batch: "FYCSO".into(),
            course: "DSA".into(),
            professor_id: 2,
            date,
            expires_at: date + Duration::minutes(minutes_open),
            status: SessionStatus::Active,
            students: Vec::new(),
        }
    }

    #[test]
    fn classifies_open_late_and_expired() {
        let s = session(90);
        assert_eq!(s.window_at(s.date), Window::Open);
        assert_eq!(s.window_at(s.date + Duration::minutes(60)), Window::Open);
        assert_eq!(s.window_at(s.date + Duration::minutes(61)), Window::Late);
        assert_eq!(s.window_at(s.date + Duration::minutes(90)), Window::Late);
        assert_eq!(s.window_at(s.date + Duration::minutes(91)), Window::Expired);
    }

    #[test]
    fn short_session_expires_before_it_can_be_late() {
        let s = session(30);
        assert_eq!(s.window_at(s.date + Duration::minutes(45)), Window::Expired);
    }

    #[test]
    fn presence_status_wire_names() {
        assert_eq!("NA".parse::<PresenceStatus>().ok(), Some(PresenceStatus::NotApplicable));
        assert_eq!(serde_json::to_string(&PresenceStatus::Late).unwrap(), "\"late\"");
        assert!("absent".parse::<PresenceStatus>().is_err());
    }

    #[test]
    fn view_carries_window_next_to_session_fields() {
        let s = session(90);
        let json = serde_json::to_value(SessionView::at(s.clone(), s.date)).unwrap();
        assert_eq!(json["window"], "open");
        assert_eq!(json["batch"], "FYCSO");
        assert!(json.get("expiresAt").is_some());
    }
}
