use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};

use super::{
    MeetingChanges, NewMeeting, NewRequest, NewSession, NewSubmission, NewUser, Page, RequestChanges,
    RequestQuery, RequestScope, Store, StoreError, UserChanges,
};
use crate::model::{
    attendance::{AttendanceSession, PresenceStatus, SessionStatus, Submission},
    meeting::Meeting,
    request::{Approval, Decision, PartySummary, PermissionRequest, RequestDetail, RequestStatus},
    role::Role,
    user::User,
};
use crate::utils::db_utils::{UpdateSet, build_update_sql, execute_update};

/// MySQL duplicate-key SQLSTATE
const DUPLICATE_KEY: &str = "23000";

fn parse<T: std::str::FromStr>(column: &str, value: &str) -> Result<T, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("{column} = {value:?}")))
}

fn is_duplicate(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(DUPLICATE_KEY))
}

/* =========================
Row types
========================= */

#[derive(FromRow)]
struct UserRow {
    id: u64,
    name: String,
    email: String,
    password: String,
    role: String,
    batch: Option<String>,
    batches: Option<Json<Vec<String>>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password,
            role: parse::<Role>("users.role", &row.role)?,
            batch: row.batch,
            batches: row.batches.map(|b| b.0).unwrap_or_default(),
            created_at: row.created_at,
        })
    }
}

const USER_COLUMNS: &str = "id, name, email, password, role, batch, batches, created_at";

#[derive(FromRow)]
struct RequestRow {
    id: u64,
    title: String,
    content: String,
    student_id: u64,
    professor_id: u64,
    status: String,
    request_type: String,
    remarks: Option<String>,
    professor_approval_status: Option<String>,
    professor_approval_remarks: Option<String>,
    professor_approval_date: Option<DateTime<Utc>>,
    hod_approval_status: Option<String>,
    hod_approval_remarks: Option<String>,
    hod_approval_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    student_name: Option<String>,
    student_email: Option<String>,
    student_batch: Option<String>,
    professor_name: Option<String>,
    professor_email: Option<String>,
}

fn approval(
    column: &str,
    status: Option<String>,
    remarks: Option<String>,
    date: Option<DateTime<Utc>>,
) -> Result<Option<Approval>, StoreError> {
    match (status, date) {
        (Some(status), Some(date)) => Ok(Some(Approval {
            status: parse::<Decision>(column, &status)?,
            remarks,
            date,
        })),
        _ => Ok(None),
    }
}

impl RequestRow {
    fn into_detail(self) -> Result<RequestDetail, StoreError> {
        let student = match (self.student_name, self.student_email) {
            (Some(name), Some(email)) => Some(PartySummary {
                id: self.student_id,
                name,
                email,
                batch: self.student_batch,
            }),
            _ => None,
        };
        let professor = match (self.professor_name, self.professor_email) {
            (Some(name), Some(email)) => Some(PartySummary {
                id: self.professor_id,
                name,
                email,
                batch: None,
            }),
            _ => None,
        };

        let request = PermissionRequest {
            id: self.id,
            title: self.title,
            content: self.content,
            student_id: self.student_id,
            professor_id: self.professor_id,
            status: parse::<RequestStatus>("requests.status", &self.status)?,
            kind: parse("requests.request_type", &self.request_type)?,
            created_at: self.created_at,
            remarks: self.remarks,
            professor_approval: approval(
                "requests.professor_approval_status",
                self.professor_approval_status,
                self.professor_approval_remarks,
                self.professor_approval_date,
            )?,
            hod_approval: approval(
                "requests.hod_approval_status",
                self.hod_approval_status,
                self.hod_approval_remarks,
                self.hod_approval_date,
            )?,
        };

        Ok(RequestDetail {
            request,
            student,
            professor,
        })
    }
}

const REQUEST_SELECT: &str = r#"
    SELECT
        r.id, r.title, r.content, r.student_id, r.professor_id, r.status, r.request_type,
        r.remarks,
        r.professor_approval_status, r.professor_approval_remarks, r.professor_approval_date,
        r.hod_approval_status, r.hod_approval_remarks, r.hod_approval_date,
        r.created_at,
        s.name AS student_name, s.email AS student_email, s.batch AS student_batch,
        p.name AS professor_name, p.email AS professor_email
    FROM requests r
    LEFT JOIN users s ON s.id = r.student_id
    LEFT JOIN users p ON p.id = r.professor_id
"#;

#[derive(FromRow)]
struct SessionRow {
    id: u64,
    batch: String,
    course: String,
    professor_id: u64,
    date: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    status: String,
}

const SESSION_COLUMNS: &str = "id, batch, course, professor_id, date, expires_at, status";

#[derive(FromRow)]
struct SubmissionRow {
    session_id: u64,
    student_id: u64,
    student_name: Option<String>,
    status: String,
    submitted_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MeetingRow {
    id: u64,
    title: String,
    date: DateTime<Utc>,
    time: String,
    description: Option<String>,
    batches: Json<Vec<String>>,
    professor_id: u64,
}

impl From<MeetingRow> for Meeting {
    fn from(row: MeetingRow) -> Self {
        Meeting {
            id: row.id,
            title: row.title,
            date: row.date,
            time: row.time,
            description: row.description,
            batches: row.batches.0,
            professor_id: row.professor_id,
        }
    }
}

const MEETING_COLUMNS: &str = "id, title, date, time, description, batches, professor_id";

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

/* =========================
Store
========================= */

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_request(&self, id: u64) -> Result<Option<RequestDetail>, StoreError> {
        let sql = format!("{REQUEST_SELECT} WHERE r.id = ?");
        sqlx::query_as::<_, RequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(RequestRow::into_detail)
            .transpose()
    }

    /// Loads the submissions of every given session in one query.
    async fn with_submissions(&self, rows: Vec<SessionRow>) -> Result<Vec<AttendanceSession>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<MySql>::new(
            r#"
            SELECT sub.session_id, sub.student_id, u.name AS student_name, sub.status, sub.submitted_at
            FROM attendance_submissions sub
            LEFT JOIN users u ON u.id = sub.student_id
            WHERE sub.session_id IN ("#,
        );
        let mut ids = qb.separated(", ");
        for row in &rows {
            ids.push_bind(row.id);
        }
        ids.push_unseparated(") ORDER BY sub.id");

        let mut by_session: HashMap<u64, Vec<Submission>> = HashMap::new();
        for sub in qb.build_query_as::<SubmissionRow>().fetch_all(&self.pool).await? {
            by_session.entry(sub.session_id).or_default().push(Submission {
                student_id: sub.student_id,
                student_name: sub.student_name,
                status: parse::<PresenceStatus>("attendance_submissions.status", &sub.status)?,
                submitted_at: sub.submitted_at,
            });
        }

        rows.into_iter()
            .map(|row| -> Result<AttendanceSession, StoreError> {
                Ok(AttendanceSession {
                    id: row.id,
                    status: parse::<SessionStatus>("attendance_sessions.status", &row.status)?,
                    students: by_session.remove(&row.id).unwrap_or_default(),
                    batch: row.batch,
                    course: row.course,
                    professor_id: row.professor_id,
                    date: row.date,
                    expires_at: row.expires_at,
                })
            })
            .collect()
    }

    async fn sessions_where(&self, clause: &str, arg: FilterValue<'_>) -> Result<Vec<AttendanceSession>, StoreError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM attendance_sessions WHERE {clause} ORDER BY date DESC, id DESC"
        );
        let query = sqlx::query_as::<_, SessionRow>(&sql);
        let query = match arg {
            FilterValue::U64(v) => query.bind(v),
            FilterValue::Str(s) => query.bind(s),
        };
        let rows = query.fetch_all(&self.pool).await?;
        self.with_submissions(rows).await
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let batches = (!user.role.has_single_batch()).then(|| Json(user.batches.clone()));
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password, role, batch, batches)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_ref())
        .bind(&user.batch)
        .bind(batches)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => self
                .user_by_id(done.last_insert_id())
                .await?
                .ok_or_else(|| StoreError::Corrupt("inserted user vanished".into())),
            Err(e) if is_duplicate(&e) => Err(StoreError::Conflict(user.email)),
            Err(e) => Err(e.into()),
        }
    }

    async fn user_by_id(&self, id: u64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn update_user(&self, id: u64, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let email = changes.email.clone();
        let mut set = UpdateSet::new();
        set.set("name", changes.name)
            .set("email", changes.email)
            .set("password", changes.password_hash)
            .set("batch", changes.batch)
            .set("batches", changes.batches);

        if let Some(update) = build_update_sql("users", set, "id", id) {
            match execute_update(&self.pool, update).await {
                Ok(_) => {}
                Err(e) if is_duplicate(&e) => {
                    return Err(StoreError::Conflict(email.unwrap_or_default()));
                }
                Err(e) => return Err(e.into()),
            }
        }

        // affected rows is 0 for no-op updates, so re-read to tell "missing" apart
        self.user_by_id(id).await
    }

    async fn users_with_role(&self, role: Role) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = ? ORDER BY name, id");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(role.as_ref())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn all_emails(&self) -> Result<Vec<String>, StoreError> {
        Ok(sqlx::query_scalar::<_, String>("SELECT email FROM users")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_request(&self, request: NewRequest) -> Result<PermissionRequest, StoreError> {
        let done = sqlx::query(
            r#"
            INSERT INTO requests
                (title, content, student_id, professor_id, status, request_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.title)
        .bind(&request.content)
        .bind(request.student_id)
        .bind(request.professor_id)
        .bind(RequestStatus::Pending.as_ref())
        .bind(request.kind.as_ref())
        .bind(request.created_at)
        .execute(&self.pool)
        .await?;

        self.request_by_id(done.last_insert_id())
            .await?
            .ok_or_else(|| StoreError::Corrupt("inserted request vanished".into()))
    }

    async fn request_by_id(&self, id: u64) -> Result<Option<PermissionRequest>, StoreError> {
        Ok(self.fetch_request(id).await?.map(|d| d.request))
    }

    async fn list_requests(&self, query: &RequestQuery) -> Result<Page<RequestDetail>, StoreError> {
        // -------------------------
        // WHERE clause
        // -------------------------
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        match query.scope {
            RequestScope::Student(id) => {
                where_sql.push_str(" AND r.student_id = ?");
                args.push(FilterValue::U64(id));
            }
            RequestScope::Professor(id) => {
                where_sql.push_str(" AND r.professor_id = ?");
                args.push(FilterValue::U64(id));
            }
            RequestScope::Everyone => {}
        }

        if let Some(status) = query.status.as_ref() {
            where_sql.push_str(" AND r.status = ?");
            args.push(FilterValue::Str(status.as_ref()));
        }

        if let Some(kind) = query.kind.as_ref() {
            where_sql.push_str(" AND r.request_type = ?");
            args.push(FilterValue::Str(kind.as_ref()));
        }

        // -------------------------
        // COUNT query
        // -------------------------
        let count_sql = format!("SELECT COUNT(*) FROM requests r{}", where_sql);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(*s),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        // -------------------------
        // DATA query
        // -------------------------
        let data_sql = format!(
            "{REQUEST_SELECT}{where_sql} ORDER BY r.created_at DESC, r.id DESC LIMIT ? OFFSET ?"
        );
        let mut data_q = sqlx::query_as::<_, RequestRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }

        let items = data_q
            .bind(query.limit)
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(RequestRow::into_detail)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            total: total.max(0) as u64,
        })
    }

    async fn update_request(
        &self,
        id: u64,
        changes: RequestChanges,
    ) -> Result<Option<PermissionRequest>, StoreError> {
        let mut set = UpdateSet::new();
        set.set("status", changes.status.map(|s| s.to_string()))
            .set("remarks", changes.remarks);
        if let Some(a) = changes.professor_approval {
            set.set("professor_approval_status", Some(a.status.to_string()))
                .set("professor_approval_remarks", a.remarks)
                .set("professor_approval_date", Some(a.date));
        }
        if let Some(a) = changes.hod_approval {
            set.set("hod_approval_status", Some(a.status.to_string()))
                .set("hod_approval_remarks", a.remarks)
                .set("hod_approval_date", Some(a.date));
        }

        if let Some(update) = build_update_sql("requests", set, "id", id) {
            execute_update(&self.pool, update).await?;
        }
        self.request_by_id(id).await
    }

    async fn insert_session(&self, session: NewSession) -> Result<AttendanceSession, StoreError> {
        let done = sqlx::query(
            r#"
            INSERT INTO attendance_sessions (batch, course, professor_id, date, expires_at, status)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.batch)
        .bind(&session.course)
        .bind(session.professor_id)
        .bind(session.date)
        .bind(session.expires_at)
        .bind(SessionStatus::Active.as_ref())
        .execute(&self.pool)
        .await?;

        self.session_by_id(done.last_insert_id())
            .await?
            .ok_or_else(|| StoreError::Corrupt("inserted session vanished".into()))
    }

    async fn session_by_id(&self, id: u64) -> Result<Option<AttendanceSession>, StoreError> {
        Ok(self.sessions_where("id = ?", FilterValue::U64(id)).await?.pop())
    }

    async fn sessions_by_professor(&self, professor_id: u64) -> Result<Vec<AttendanceSession>, StoreError> {
        self.sessions_where("professor_id = ?", FilterValue::U64(professor_id))
            .await
    }

    async fn active_sessions_for_batch(&self, batch: &str) -> Result<Vec<AttendanceSession>, StoreError> {
        self.sessions_where("status = 'active' AND batch = ?", FilterValue::Str(batch))
            .await
    }

    async fn append_submission(
        &self,
        session_id: u64,
        submission: NewSubmission,
    ) -> Result<Option<AttendanceSession>, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM attendance_sessions WHERE id = ? LIMIT 1)",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;
        if !exists {
            return Ok(None);
        }

        sqlx::query(
            r#"
            INSERT INTO attendance_submissions (session_id, student_id, status, submitted_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(session_id)
        .bind(submission.student_id)
        .bind(submission.status.as_ref())
        .bind(submission.submitted_at)
        .execute(&self.pool)
        .await?;

        self.session_by_id(session_id).await
    }

    async fn set_session_status(
        &self,
        id: u64,
        status: SessionStatus,
    ) -> Result<Option<AttendanceSession>, StoreError> {
        sqlx::query("UPDATE attendance_sessions SET status = ? WHERE id = ?")
            .bind(status.as_ref())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.session_by_id(id).await
    }

    async fn insert_meeting(&self, meeting: NewMeeting) -> Result<Meeting, StoreError> {
        let done = sqlx::query(
            r#"
            INSERT INTO meetings (title, date, time, description, batches, professor_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&meeting.title)
        .bind(meeting.date)
        .bind(&meeting.time)
        .bind(&meeting.description)
        .bind(Json(&meeting.batches))
        .bind(meeting.professor_id)
        .execute(&self.pool)
        .await?;

        Ok(Meeting {
            id: done.last_insert_id(),
            title: meeting.title,
            date: meeting.date,
            time: meeting.time,
            description: meeting.description,
            batches: meeting.batches,
            professor_id: meeting.professor_id,
        })
    }

    async fn meetings_by_professor(&self, professor_id: u64) -> Result<Vec<Meeting>, StoreError> {
        let sql = format!(
            "SELECT {MEETING_COLUMNS} FROM meetings WHERE professor_id = ? ORDER BY date DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, MeetingRow>(&sql)
            .bind(professor_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Meeting::from)
            .collect())
    }

    async fn meetings_for_batch(&self, batch: &str) -> Result<Vec<Meeting>, StoreError> {
        let sql = format!(
            "SELECT {MEETING_COLUMNS} FROM meetings \
             WHERE JSON_CONTAINS(batches, JSON_QUOTE(?)) ORDER BY date ASC, id ASC"
        );
        Ok(sqlx::query_as::<_, MeetingRow>(&sql)
            .bind(batch)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Meeting::from)
            .collect())
    }

    async fn update_meeting(&self, id: u64, changes: MeetingChanges) -> Result<Option<Meeting>, StoreError> {
        let mut set = UpdateSet::new();
        set.set("title", changes.title)
            .set("date", changes.date)
            .set("time", changes.time)
            .set("description", changes.description)
            .set("batches", changes.batches);

        if let Some(update) = build_update_sql("meetings", set, "id", id) {
            execute_update(&self.pool, update).await?;
        }

        let sql = format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = ?");
        Ok(sqlx::query_as::<_, MeetingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Meeting::from))
    }

    async fn delete_meeting(&self, id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM meetings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
