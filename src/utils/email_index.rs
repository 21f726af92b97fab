use anyhow::Result;
use tracing::info;

use crate::store::{Store, StoreError};
use crate::utils::email_cache::EmailCache;
use crate::utils::email_filter::EmailFilter;
use crate::utils::validation::normalize_email;

const WARMUP_BATCH: usize = 250;

/// Fast path for "is this email already registered?".
///
/// Filter miss means free; cache hit means taken; anything else asks the
/// store, which stays the authority (the unique key still rejects races).
#[derive(Default)]
pub struct EmailIndex {
    filter: EmailFilter,
    cache: EmailCache,
}

impl EmailIndex {
    pub async fn is_available(&self, email: &str, store: &dyn Store) -> Result<bool, StoreError> {
        if !self.filter.might_exist(email) {
            return Ok(true);
        }
        if self.cache.is_taken(email).await {
            return Ok(false);
        }

        let taken = store.user_by_email(&normalize_email(email)).await?.is_some();
        if taken {
            self.cache.mark_taken(email).await;
        }
        Ok(!taken)
    }

    pub async fn mark_taken(&self, email: &str) {
        self.filter.insert(email);
        self.cache.mark_taken(email).await;
    }

    /// Called when a user moves off an email.
    pub async fn forget(&self, email: &str) {
        self.filter.remove(email);
        self.cache.forget(email).await;
    }

    pub async fn warmup(&self, store: &dyn Store) -> Result<()> {
        let emails: Vec<String> = store
            .all_emails()
            .await?
            .iter()
            .map(|e| normalize_email(e))
            .collect();

        for batch in emails.chunks(WARMUP_BATCH) {
            self.filter.insert_batch(batch);
            self.cache.batch_mark(batch).await;
        }

        info!("Email index warmup complete: {} users", emails.len());
        Ok(())
    }
}
