use chrono::{DateTime, Utc};
use serde_json::json;

use crate::api::attendance::CreateSession;
use crate::client::{ApiClient, ClientError, record};
use crate::model::attendance::{AttendanceSession, PresenceStatus, SessionStatus, SessionView};

pub struct AttendanceStore {
    client: ApiClient,
    pub sessions: Vec<AttendanceSession>,
    pub error: Option<String>,
}

impl AttendanceStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            sessions: Vec::new(),
            error: None,
        }
    }

    pub async fn fetch_professor(&mut self) -> Result<&[AttendanceSession], ClientError> {
        let result = self.client.get("/attendance/professor").await;
        self.sessions = record(&mut self.error, result)?;
        Ok(&self.sessions)
    }

    pub async fn fetch_student(&mut self, batch: &str) -> Result<&[AttendanceSession], ClientError> {
        let result = self
            .client
            .get::<Vec<SessionView>>(&format!("/attendance/student/{batch}"))
            .await;
        self.sessions = record(&mut self.error, result)?
            .into_iter()
            .map(|view| view.session)
            .collect();
        Ok(&self.sessions)
    }

    /// New sessions go to the front.
    pub async fn add(&mut self, body: &CreateSession) -> Result<AttendanceSession, ClientError> {
        let result = self.client.post::<_, AttendanceSession>("/attendance", body).await;
        let session = record(&mut self.error, result)?;
        self.sessions.insert(0, session.clone());
        Ok(session)
    }

    pub async fn submit(&mut self, id: u64, status: PresenceStatus) -> Result<AttendanceSession, ClientError> {
        let result = self
            .client
            .post::<_, AttendanceSession>(&format!("/attendance/{id}/submit"), &json!({ "status": status }))
            .await;
        let session = record(&mut self.error, result)?;
        self.replace(&session);
        Ok(session)
    }

    pub async fn set_status(&mut self, id: u64, status: SessionStatus) -> Result<AttendanceSession, ClientError> {
        let result = self
            .client
            .put::<_, AttendanceSession>(&format!("/attendance/{id}"), &json!({ "status": status }))
            .await;
        let session = record(&mut self.error, result)?;
        self.replace(&session);
        Ok(session)
    }

    fn replace(&mut self, session: &AttendanceSession) {
        if let Some(cached) = self.sessions.iter_mut().find(|s| s.id == session.id) {
            *cached = session.clone();
        }
    }

    /// Sessions a student of `batch` can still check into.
    pub fn pending_for(&self, batch: &str, now: DateTime<Utc>) -> Vec<&AttendanceSession> {
        self.sessions
            .iter()
            .filter(|s| s.batch == batch && s.status == SessionStatus::Active && !s.is_expired_at(now))
            .collect()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(id: u64, batch: &str, status: SessionStatus, expires_in_minutes: i64) -> AttendanceSession {
        let now = Utc::now();
        AttendanceSession {
            id,
            batch: batch.into(),
            course: "DSA".into(),
            professor_id: 1,
            date: now - Duration::minutes(10),
            expires_at: now + Duration::minutes(expires_in_minutes),
            status,
            students: Vec::new(),
        }
    }

    #[test]
    fn pending_excludes_closed_expired_and_other_batches() {
        let mut store = AttendanceStore::new(ApiClient::new("http://127.0.0.1:9/api"));
        store.sessions = vec![
            session(1, "FYCSO", SessionStatus::Active, 30),
            session(2, "FYCSO", SessionStatus::Closed, 30),
            session(3, "FYCSO", SessionStatus::Active, -5),
            session(4, "SYCSO", SessionStatus::Active, 30),
        ];

        let ids: Vec<u64> = store.pending_for("FYCSO", Utc::now()).iter().map(|s| s.id).collect();
        assert_eq!(ids, [1]);
    }
}
