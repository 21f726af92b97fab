//! Persistence boundary.
//!
//! Handlers only see [`Store`]; [`mysql::MySqlStore`] backs production and
//! [`memory::MemoryStore`] serves local runs without a database and the tests.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::Display;

use crate::model::{
    attendance::{AttendanceSession, PresenceStatus, SessionStatus},
    meeting::Meeting,
    request::{Approval, PermissionRequest, RequestDetail, RequestStatus, RequestType},
    role::Role,
    user::User,
};

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Display)]
pub enum StoreError {
    /// Unique email constraint hit
    #[display(fmt = "email already registered: {}", _0)]
    Conflict(String),
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
    #[display(fmt = "migration failed: {}", _0)]
    Migration(sqlx::migrate::MigrateError),
    /// A stored value no longer parses into its domain type.
    #[display(fmt = "corrupt record: {}", _0)]
    Corrupt(String),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(err)
    }
}

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub batch: Option<String>,
    pub batches: Vec<String>,
}

/// Fields a user may overwrite on their own profile. `None` leaves a field as is.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub batch: Option<String>,
    pub batches: Option<Vec<String>>,
}

pub struct NewRequest {
    pub title: String,
    pub content: String,
    pub student_id: u64,
    pub professor_id: u64,
    pub kind: RequestType,
    pub created_at: DateTime<Utc>,
}

/// Whose requests a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestScope {
    Student(u64),
    Professor(u64),
    Everyone,
}

#[derive(Debug, Clone)]
pub struct RequestQuery {
    pub scope: RequestScope,
    pub status: Option<RequestStatus>,
    pub kind: Option<RequestType>,
    /// 1-based
    pub page: u64,
    pub limit: u64,
}

impl RequestQuery {
    /// Saturates for page numbers far past the last row.
    pub fn offset(&self) -> u64 {
        (self.page.max(1) - 1).saturating_mul(self.limit)
    }

    pub fn matches(&self, request: &PermissionRequest) -> bool {
        let in_scope = match self.scope {
            RequestScope::Student(id) => request.student_id == id,
            RequestScope::Professor(id) => request.professor_id == id,
            RequestScope::Everyone => true,
        };
        in_scope
            && self.status.is_none_or(|s| request.status == s)
            && self.kind.is_none_or(|k| request.kind == k)
    }
}

#[derive(Debug, Default)]
pub struct RequestChanges {
    pub status: Option<RequestStatus>,
    pub remarks: Option<String>,
    pub professor_approval: Option<Approval>,
    pub hod_approval: Option<Approval>,
}

/// One page of results plus the unpaged count.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

pub struct NewSession {
    pub batch: String,
    pub course: String,
    pub professor_id: u64,
    pub date: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub struct NewSubmission {
    pub student_id: u64,
    pub status: PresenceStatus,
    pub submitted_at: DateTime<Utc>,
}

pub struct NewMeeting {
    pub title: String,
    pub date: DateTime<Utc>,
    pub time: String,
    pub description: Option<String>,
    pub batches: Vec<String>,
    pub professor_id: u64,
}

#[derive(Debug, Default)]
pub struct MeetingChanges {
    pub title: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub time: Option<String>,
    pub description: Option<String>,
    pub batches: Option<Vec<String>>,
}

#[async_trait]
pub trait Store: Send + Sync {
    // users
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn user_by_id(&self, id: u64) -> Result<Option<User>, StoreError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn update_user(&self, id: u64, changes: UserChanges) -> Result<Option<User>, StoreError>;
    /// Sorted by name.
    async fn users_with_role(&self, role: Role) -> Result<Vec<User>, StoreError>;
    async fn all_emails(&self) -> Result<Vec<String>, StoreError>;

    // requests
    async fn insert_request(&self, request: NewRequest) -> Result<PermissionRequest, StoreError>;
    async fn request_by_id(&self, id: u64) -> Result<Option<PermissionRequest>, StoreError>;
    /// Newest first.
    async fn list_requests(&self, query: &RequestQuery) -> Result<Page<RequestDetail>, StoreError>;
    async fn update_request(
        &self,
        id: u64,
        changes: RequestChanges,
    ) -> Result<Option<PermissionRequest>, StoreError>;

    // attendance
    async fn insert_session(&self, session: NewSession) -> Result<AttendanceSession, StoreError>;
    async fn session_by_id(&self, id: u64) -> Result<Option<AttendanceSession>, StoreError>;
    /// Latest session date first.
    async fn sessions_by_professor(&self, professor_id: u64) -> Result<Vec<AttendanceSession>, StoreError>;
    /// Active sessions only, latest session date first.
    async fn active_sessions_for_batch(&self, batch: &str) -> Result<Vec<AttendanceSession>, StoreError>;
    /// Appends unconditionally; `None` when the session does not exist.
    async fn append_submission(
        &self,
        session_id: u64,
        submission: NewSubmission,
    ) -> Result<Option<AttendanceSession>, StoreError>;
    async fn set_session_status(
        &self,
        id: u64,
        status: SessionStatus,
    ) -> Result<Option<AttendanceSession>, StoreError>;

    // meetings
    async fn insert_meeting(&self, meeting: NewMeeting) -> Result<Meeting, StoreError>;
    /// Latest date first.
    async fn meetings_by_professor(&self, professor_id: u64) -> Result<Vec<Meeting>, StoreError>;
    /// Soonest date first.
    async fn meetings_for_batch(&self, batch: &str) -> Result<Vec<Meeting>, StoreError>;
    async fn update_meeting(&self, id: u64, changes: MeetingChanges) -> Result<Option<Meeting>, StoreError>;
    async fn delete_meeting(&self, id: u64) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: u64, limit: u64) -> RequestQuery {
        RequestQuery {
            scope: RequestScope::Everyone,
            status: None,
            kind: None,
            page,
            limit,
        }
    }

    #[test]
    fn offset_counts_whole_pages() {
        assert_eq!(query(1, 10).offset(), 0);
        assert_eq!(query(3, 10).offset(), 20);
        assert_eq!(query(0, 10).offset(), 0);
    }

    #[test]
    fn offset_saturates_on_huge_pages() {
        assert_eq!(query(u64::MAX, 100).offset(), u64::MAX);
    }
}
