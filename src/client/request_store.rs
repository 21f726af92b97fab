use crate::api::request::{CreateRequest, RequestFilter, UpdateRequest};
use crate::client::{ApiClient, ClientError, record};
use crate::model::request::{Pagination, PermissionRequest, RequestDetail, RequestList, RequestStatus, RequestType};

/// Local narrowing of the fetched requests, as the dashboards apply it.
#[derive(Debug, Clone, Default)]
pub struct RequestView {
    /// `None` shows every status
    pub status: Option<RequestStatus>,
    pub kind: Option<RequestType>,
    /// Case-insensitive match on title or content
    pub search: Option<String>,
}

impl RequestView {
    fn admits(&self, detail: &RequestDetail) -> bool {
        let request = &detail.request;
        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        self.status.is_none_or(|s| request.status == s)
            && self.kind.is_none_or(|k| request.kind == k)
            && search.is_none_or(|needle| {
                request.title.to_lowercase().contains(&needle) || request.content.to_lowercase().contains(&needle)
            })
    }
}

pub struct RequestStore {
    client: ApiClient,
    pub requests: Vec<RequestDetail>,
    pub pagination: Option<Pagination>,
    pub error: Option<String>,
}

impl RequestStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            requests: Vec::new(),
            pagination: None,
            error: None,
        }
    }

    async fn fetch(&mut self, path: &str, filter: &RequestFilter) -> Result<&[RequestDetail], ClientError> {
        let result = self.client.get_with_query::<_, RequestList>(path, filter).await;
        let list = record(&mut self.error, result)?;
        self.requests = list.requests;
        self.pagination = Some(list.pagination);
        Ok(&self.requests)
    }

    pub async fn fetch_student(&mut self, filter: &RequestFilter) -> Result<&[RequestDetail], ClientError> {
        self.fetch("/requests/student", filter).await
    }

    pub async fn fetch_professor(&mut self, filter: &RequestFilter) -> Result<&[RequestDetail], ClientError> {
        self.fetch("/requests/professor", filter).await
    }

    pub async fn fetch_hod(&mut self, filter: &RequestFilter) -> Result<&[RequestDetail], ClientError> {
        self.fetch("/requests/hod", filter).await
    }

    pub async fn add(&mut self, body: &CreateRequest) -> Result<PermissionRequest, ClientError> {
        let result = self.client.post::<_, PermissionRequest>("/requests", body).await;
        let request = record(&mut self.error, result)?;
        self.requests.push(RequestDetail {
            request: request.clone(),
            student: None,
            professor: None,
        });
        Ok(request)
    }

    /// Keeps the cached party summaries; only the request fields are replaced.
    pub async fn update(&mut self, id: u64, body: &UpdateRequest) -> Result<PermissionRequest, ClientError> {
        let result = self.client.put::<_, PermissionRequest>(&format!("/requests/{id}"), body).await;
        let request = record(&mut self.error, result)?;
        if let Some(cached) = self.requests.iter_mut().find(|d| d.request.id == id) {
            cached.request = request.clone();
        }
        Ok(request)
    }

    /// Newest first.
    pub fn filtered(&self, view: &RequestView) -> Vec<&RequestDetail> {
        let mut matching: Vec<&RequestDetail> = self.requests.iter().filter(|d| view.admits(d)).collect();
        matching.sort_by(|a, b| b.request.created_at.cmp(&a.request.created_at));
        matching
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn detail(id: u64, title: &str, status: RequestStatus, kind: RequestType, age_hours: i64) -> RequestDetail {
        RequestDetail {
            request: PermissionRequest {
                id,
                title: title.into(),
                content: "Details".into(),
                student_id: 1,
                professor_id: 2,
                status,
                kind,
                created_at: Utc::now() - Duration::hours(age_hours),
                remarks: None,
                professor_approval: None,
                hod_approval: None,
            },
            student: None,
            professor: None,
        }
    }

    fn store() -> RequestStore {
        let mut store = RequestStore::new(ApiClient::new("http://127.0.0.1:9/api"));
        store.requests = vec![
            detail(1, "Sick leave", RequestStatus::Pending, RequestType::Leave, 5),
            detail(2, "Lab extension", RequestStatus::Approved, RequestType::DeadlineExtension, 1),
            detail(3, "Wedding leave", RequestStatus::Approved, RequestType::Leave, 3),
        ];
        store
    }

    #[test]
    fn all_view_sorts_newest_first() {
        let ids: Vec<u64> = store().filtered(&RequestView::default()).iter().map(|d| d.request.id).collect();
        assert_eq!(ids, [2, 3, 1]);
    }

    #[test]
    fn narrows_by_status_type_and_search() {
        let store = store();
        let view = RequestView {
            status: Some(RequestStatus::Approved),
            kind: Some(RequestType::Leave),
            ..Default::default()
        };
        let ids: Vec<u64> = store.filtered(&view).iter().map(|d| d.request.id).collect();
        assert_eq!(ids, [3]);

        let view = RequestView {
            search: Some("LEAVE".into()),
            ..Default::default()
        };
        assert_eq!(store.filtered(&view).len(), 2);
    }
}
