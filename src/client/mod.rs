//! Typed client for the REST API plus per-resource state stores that keep a
//! local copy of what the server last returned.

pub mod attendance_store;
pub mod auth_store;
pub mod http;
pub mod meeting_store;
pub mod request_store;

pub use attendance_store::AttendanceStore;
pub use auth_store::AuthStore;
pub use http::{ApiClient, ClientError};
pub use meeting_store::{MeetingStore, MeetingWhen};
pub use request_store::{RequestStore, RequestView};

/// Stores the outcome of a call in a store's `error` slot and hands it back.
fn record<T>(error: &mut Option<String>, result: Result<T, ClientError>) -> Result<T, ClientError> {
    *error = result.as_ref().err().map(ClientError::user_message);
    result
}
