use moka::future::Cache;
use std::time::Duration;

use crate::utils::validation::normalize_email;

const CACHE_CAPACITY: u64 = 500_000;
const CACHE_TTL: Duration = Duration::from_secs(86_400);

/// Emails known to be taken. Entries expire, so absence proves nothing.
#[derive(Clone)]
pub struct EmailCache {
    inner: Cache<String, bool>,
}

impl Default for EmailCache {
    fn default() -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }
}

impl EmailCache {
    pub async fn mark_taken(&self, email: &str) {
        self.inner.insert(normalize_email(email), true).await;
    }

    pub async fn is_taken(&self, email: &str) -> bool {
        self.inner.get(&normalize_email(email)).await.unwrap_or(false)
    }

    pub async fn forget(&self, email: &str) {
        self.inner.invalidate(&normalize_email(email)).await;
    }

    /// Emails must already be normalized.
    pub async fn batch_mark(&self, emails: &[String]) {
        let inserts: Vec<_> = emails
            .iter()
            .map(|e| self.inner.insert(e.clone(), true))
            .collect();
        futures::future::join_all(inserts).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn remembers_and_forgets() {
        let cache = EmailCache::default();
        assert!(!cache.is_taken("a@x.com").await);

        cache.mark_taken("A@x.com").await;
        assert!(cache.is_taken("a@x.com").await);

        cache.forget("a@x.com").await;
        assert!(!cache.is_taken("a@x.com").await);
    }

    #[actix_web::test]
    async fn batch_mark_marks_all() {
        let cache = EmailCache::default();
        cache.batch_mark(&["a@x.com".into(), "b@x.com".into()]).await;
        assert!(cache.is_taken("b@x.com").await);
    }
}
