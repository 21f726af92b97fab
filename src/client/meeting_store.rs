use chrono::{DateTime, Utc};

use crate::api::meeting::{CreateMeeting, UpdateMeeting};
use crate::client::{ApiClient, ClientError, record};
use crate::model::meeting::Meeting;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeetingWhen {
    #[default]
    All,
    /// Strictly after now
    Upcoming,
    Past,
}

pub struct MeetingStore {
    client: ApiClient,
    pub meetings: Vec<Meeting>,
    pub error: Option<String>,
}

impl MeetingStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            meetings: Vec::new(),
            error: None,
        }
    }

    /// The calling professor's meetings.
    pub async fn fetch(&mut self) -> Result<&[Meeting], ClientError> {
        let result = self.client.get("/meetings/professor").await;
        self.meetings = record(&mut self.error, result)?;
        Ok(&self.meetings)
    }

    pub async fn fetch_for_batch(&mut self, batch: &str) -> Result<&[Meeting], ClientError> {
        let result = self.client.get(&format!("/meetings/student/{batch}")).await;
        self.meetings = record(&mut self.error, result)?;
        Ok(&self.meetings)
    }

    pub async fn add(&mut self, body: &CreateMeeting) -> Result<Meeting, ClientError> {
        let result = self.client.post::<_, Meeting>("/meetings", body).await;
        let meeting = record(&mut self.error, result)?;
        self.meetings.push(meeting.clone());
        Ok(meeting)
    }

    pub async fn update(&mut self, id: u64, body: &UpdateMeeting) -> Result<Meeting, ClientError> {
        let result = self.client.put::<_, Meeting>(&format!("/meetings/{id}"), body).await;
        let meeting = record(&mut self.error, result)?;
        if let Some(cached) = self.meetings.iter_mut().find(|m| m.id == id) {
            *cached = meeting.clone();
        }
        Ok(meeting)
    }

    pub async fn delete(&mut self, id: u64) -> Result<(), ClientError> {
        let result = self.client.delete(&format!("/meetings/{id}")).await;
        record(&mut self.error, result)?;
        self.meetings.retain(|m| m.id != id);
        Ok(())
    }

    /// Latest date first.
    pub fn filtered(&self, when: MeetingWhen, now: DateTime<Utc>) -> Vec<&Meeting> {
        let mut matching: Vec<&Meeting> = self
            .meetings
            .iter()
            .filter(|m| match when {
                MeetingWhen::All => true,
                MeetingWhen::Upcoming => m.date > now,
                MeetingWhen::Past => m.date <= now,
            })
            .collect();
        matching.sort_by(|a, b| b.date.cmp(&a.date));
        matching
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn meeting(id: u64, days_from_now: i64) -> Meeting {
        Meeting {
            id,
            title: format!("Meeting {id}"),
            date: Utc::now() + Duration::days(days_from_now),
            time: "10:00".into(),
            description: None,
            batches: vec!["FYCSO".into()],
            professor_id: 1,
        }
    }

    #[test]
    fn splits_upcoming_from_past() {
        let mut store = MeetingStore::new(ApiClient::new("http://127.0.0.1:9/api"));
        store.meetings = vec![meeting(1, -3), meeting(2, 2), meeting(3, 7), meeting(4, -1)];
        let now = Utc::now();

        let ids = |when| store.filtered(when, now).iter().map(|m| m.id).collect::<Vec<_>>();
        assert_eq!(ids(MeetingWhen::All), [3, 2, 4, 1]);
        assert_eq!(ids(MeetingWhen::Upcoming), [3, 2]);
        assert_eq!(ids(MeetingWhen::Past), [4, 1]);
    }
}
