use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{
    MeetingChanges, NewMeeting, NewRequest, NewSession, NewSubmission, NewUser, Page, RequestChanges,
    RequestQuery, Store, StoreError, UserChanges,
};
use crate::model::{
    attendance::{AttendanceSession, SessionStatus, Submission},
    meeting::Meeting,
    request::{PartySummary, PermissionRequest, RequestDetail, RequestStatus},
    role::Role,
    user::User,
};

#[derive(Default)]
struct Tables {
    last_id: u64,
    users: BTreeMap<u64, User>,
    requests: BTreeMap<u64, PermissionRequest>,
    sessions: BTreeMap<u64, AttendanceSession>,
    meetings: BTreeMap<u64, Meeting>,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn email_taken(&self, email: &str, except: Option<u64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn summary(&self, id: u64) -> Option<PartySummary> {
        self.users.get(&id).map(|u| PartySummary {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            batch: u.batch.clone(),
        })
    }

    /// Copies a session with current student names filled in.
    fn hydrate(&self, session: &AttendanceSession) -> AttendanceSession {
        let mut session = session.clone();
        for submission in &mut session.students {
            submission.student_name = self.users.get(&submission.student_id).map(|u| u.name.clone());
        }
        session
    }
}

/// Process-local store. Each record kind lives in an id-ordered map behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // a panic while holding the lock cannot leave a map half-written, so poisoning is ignored
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.write();
        if tables.email_taken(&user.email, None) {
            return Err(StoreError::Conflict(user.email));
        }

        let id = tables.next_id();
        let user = User {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            batch: user.batch,
            batches: user.batches,
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: u64) -> Result<Option<User>, StoreError> {
        Ok(self.read().users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read().users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: u64, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut tables = self.write();
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(StoreError::Conflict(email.clone()));
            }
        }

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(batch) = changes.batch {
            user.batch = Some(batch);
        }
        if let Some(batches) = changes.batches {
            user.batches = batches;
        }
        Ok(Some(user.clone()))
    }

    async fn users_with_role(&self, role: Role) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self
            .read()
            .users
            .values()
            .filter(|u| u.role == role)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn all_emails(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read().users.values().map(|u| u.email.clone()).collect())
    }

    async fn insert_request(&self, request: NewRequest) -> Result<PermissionRequest, StoreError> {
        let mut tables = self.write();
        let id = tables.next_id();
        let request = PermissionRequest {
            id,
            title: request.title,
            content: request.content,
            student_id: request.student_id,
            professor_id: request.professor_id,
            status: RequestStatus::Pending,
            kind: request.kind,
            created_at: request.created_at,
            remarks: None,
            professor_approval: None,
            hod_approval: None,
        };
        tables.requests.insert(id, request.clone());
        Ok(request)
    }

    async fn request_by_id(&self, id: u64) -> Result<Option<PermissionRequest>, StoreError> {
        Ok(self.read().requests.get(&id).cloned())
    }

    async fn list_requests(&self, query: &RequestQuery) -> Result<Page<RequestDetail>, StoreError> {
        let tables = self.read();
        let mut matching: Vec<&PermissionRequest> =
            tables.requests.values().filter(|r| query.matches(r)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.limit as usize)
            .map(|r| RequestDetail {
                request: r.clone(),
                student: tables.summary(r.student_id),
                professor: tables.summary(r.professor_id).map(|p| PartySummary { batch: None, ..p }),
            })
            .collect();

        Ok(Page { items, total })
    }

    async fn update_request(
        &self,
        id: u64,
        changes: RequestChanges,
    ) -> Result<Option<PermissionRequest>, StoreError> {
        let mut tables = self.write();
        let Some(request) = tables.requests.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(status) = changes.status {
            request.status = status;
        }
        if let Some(remarks) = changes.remarks {
            request.remarks = Some(remarks);
        }
        if let Some(approval) = changes.professor_approval {
            request.professor_approval = Some(approval);
        }
        if let Some(approval) = changes.hod_approval {
            request.hod_approval = Some(approval);
        }
        Ok(Some(request.clone()))
    }

    async fn insert_session(&self, session: NewSession) -> Result<AttendanceSession, StoreError> {
        let mut tables = self.write();
        let id = tables.next_id();
        let session = AttendanceSession {
            id,
            batch: session.batch,
            course: session.course,
            professor_id: session.professor_id,
            date: session.date,
            expires_at: session.expires_at,
            status: SessionStatus::Active,
            students: Vec::new(),
        };
        tables.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn session_by_id(&self, id: u64) -> Result<Option<AttendanceSession>, StoreError> {
        let tables = self.read();
        Ok(tables.sessions.get(&id).map(|s| tables.hydrate(s)))
    }

    async fn sessions_by_professor(&self, professor_id: u64) -> Result<Vec<AttendanceSession>, StoreError> {
        let tables = self.read();
        let mut sessions: Vec<AttendanceSession> = tables
            .sessions
            .values()
            .filter(|s| s.professor_id == professor_id)
            .map(|s| tables.hydrate(s))
            .collect();
        sessions.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    async fn active_sessions_for_batch(&self, batch: &str) -> Result<Vec<AttendanceSession>, StoreError> {
        let tables = self.read();
        let mut sessions: Vec<AttendanceSession> = tables
            .sessions
            .values()
            .filter(|s| s.batch == batch && s.status == SessionStatus::Active)
            .map(|s| tables.hydrate(s))
            .collect();
        sessions.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    async fn append_submission(
        &self,
        session_id: u64,
        submission: NewSubmission,
    ) -> Result<Option<AttendanceSession>, StoreError> {
        let mut tables = self.write();
        let Some(session) = tables.sessions.get_mut(&session_id) else {
            return Ok(None);
        };
        session.students.push(Submission {
            student_id: submission.student_id,
            student_name: None,
            status: submission.status,
            submitted_at: submission.submitted_at,
        });
        let session = session.clone();
        Ok(Some(tables.hydrate(&session)))
    }

    async fn set_session_status(
        &self,
        id: u64,
        status: SessionStatus,
    ) -> Result<Option<AttendanceSession>, StoreError> {
        let mut tables = self.write();
        let Some(session) = tables.sessions.get_mut(&id) else {
            return Ok(None);
        };
        session.status = status;
        let session = session.clone();
        Ok(Some(tables.hydrate(&session)))
    }

    async fn insert_meeting(&self, meeting: NewMeeting) -> Result<Meeting, StoreError> {
        let mut tables = self.write();
        let id = tables.next_id();
        let meeting = Meeting {
            id,
            title: meeting.title,
            date: meeting.date,
            time: meeting.time,
            description: meeting.description,
            batches: meeting.batches,
            professor_id: meeting.professor_id,
        };
        tables.meetings.insert(id, meeting.clone());
        Ok(meeting)
    }

    async fn meetings_by_professor(&self, professor_id: u64) -> Result<Vec<Meeting>, StoreError> {
        let mut meetings: Vec<Meeting> = self
            .read()
            .meetings
            .values()
            .filter(|m| m.professor_id == professor_id)
            .cloned()
            .collect();
        meetings.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(meetings)
    }

    async fn meetings_for_batch(&self, batch: &str) -> Result<Vec<Meeting>, StoreError> {
        let mut meetings: Vec<Meeting> = self
            .read()
            .meetings
            .values()
            .filter(|m| m.targets(batch))
            .cloned()
            .collect();
        meetings.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(meetings)
    }

    async fn update_meeting(&self, id: u64, changes: MeetingChanges) -> Result<Option<Meeting>, StoreError> {
        let mut tables = self.write();
        let Some(meeting) = tables.meetings.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            meeting.title = title;
        }
        if let Some(date) = changes.date {
            meeting.date = date;
        }
        if let Some(time) = changes.time {
            meeting.time = time;
        }
        if let Some(description) = changes.description {
            meeting.description = Some(description);
        }
        if let Some(batches) = changes.batches {
            meeting.batches = batches;
        }
        Ok(Some(meeting.clone()))
    }

    async fn delete_meeting(&self, id: u64) -> Result<bool, StoreError> {
        Ok(self.write().meetings.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        attendance::PresenceStatus,
        request::RequestType,
    };
    use crate::store::RequestScope;
    use chrono::{Duration, Utc};

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            name: email.split('@').next().unwrap_or_default().to_string(),
            email: email.to_string(),
            password_hash: "hash".into(),
            role,
            batch: Some("FYCSO".into()),
            batches: Vec::new(),
        }
    }

    #[actix_web::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert_user(new_user("a@x.com", Role::Student)).await.unwrap();

        let err = store.insert_user(new_user("a@x.com", Role::Professor)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.all_emails().await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn email_change_cannot_take_another_users_address() {
        let store = MemoryStore::new();
        let a = store.insert_user(new_user("a@x.com", Role::Student)).await.unwrap();
        store.insert_user(new_user("b@x.com", Role::Student)).await.unwrap();

        let err = store
            .update_user(a.id, UserChanges { email: Some("b@x.com".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // keeping one's own address is not a conflict
        let same = store
            .update_user(a.id, UserChanges { email: Some("a@x.com".into()), ..Default::default() })
            .await
            .unwrap();
        assert!(same.is_some());
    }

    #[actix_web::test]
    async fn request_listing_filters_sorts_and_pages() {
        let store = MemoryStore::new();
        let student = store.insert_user(new_user("s@x.com", Role::Student)).await.unwrap();
        let professor = store.insert_user(new_user("p@x.com", Role::Professor)).await.unwrap();
        let base = Utc::now();

        for i in 0..5 {
            store
                .insert_request(NewRequest {
                    title: format!("r{i}"),
                    content: "c".into(),
                    student_id: student.id,
                    professor_id: professor.id,
                    kind: if i % 2 == 0 { RequestType::Leave } else { RequestType::Special },
                    created_at: base + Duration::seconds(i),
                })
                .await
                .unwrap();
        }

        let query = RequestQuery {
            scope: RequestScope::Professor(professor.id),
            status: None,
            kind: None,
            page: 2,
            limit: 2,
        };
        let page = store.list_requests(&query).await.unwrap();
        assert_eq!(page.total, 5);
        let titles: Vec<_> = page.items.iter().map(|d| d.request.title.as_str()).collect();
        assert_eq!(titles, ["r2", "r1"]);
        assert_eq!(page.items[0].student.as_ref().map(|s| s.id), Some(student.id));

        let leaves = store
            .list_requests(&RequestQuery { kind: Some(RequestType::Leave), page: 1, limit: 10, ..query.clone() })
            .await
            .unwrap();
        assert_eq!(leaves.total, 3);

        let other = store
            .list_requests(&RequestQuery { scope: RequestScope::Student(professor.id), ..query })
            .await
            .unwrap();
        assert_eq!(other.total, 0);
    }

    #[actix_web::test]
    async fn submissions_append_with_current_names() {
        let store = MemoryStore::new();
        let student = store.insert_user(new_user("s@x.com", Role::Student)).await.unwrap();
        let now = Utc::now();
        let session = store
            .insert_session(NewSession {
                batch: "FYCSO".into(),
                course: "DSA".into(),
                professor_id: 99,
                date: now,
                expires_at: now + Duration::hours(1),
            })
            .await
            .unwrap();

        for _ in 0..2 {
            store
                .append_submission(
                    session.id,
                    NewSubmission { student_id: student.id, status: PresenceStatus::Present, submitted_at: now },
                )
                .await
                .unwrap();
        }

        let stored = store.session_by_id(session.id).await.unwrap().unwrap();
        assert_eq!(stored.students.len(), 2);
        assert_eq!(stored.students[0].student_name.as_deref(), Some("s"));

        let missing = store
            .append_submission(
                session.id + 100,
                NewSubmission { student_id: student.id, status: PresenceStatus::Late, submitted_at: now },
            )
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[actix_web::test]
    async fn closed_sessions_leave_the_batch_listing() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let session = store
            .insert_session(NewSession {
                batch: "SYCSO".into(),
                course: "OS".into(),
                professor_id: 1,
                date: now,
                expires_at: now + Duration::hours(1),
            })
            .await
            .unwrap();

        assert_eq!(store.active_sessions_for_batch("SYCSO").await.unwrap().len(), 1);
        store.set_session_status(session.id, SessionStatus::Closed).await.unwrap();
        assert!(store.active_sessions_for_batch("SYCSO").await.unwrap().is_empty());
        assert_eq!(store.sessions_by_professor(1).await.unwrap().len(), 1);
    }
}
