use autoscale_cuckoo_filter::CuckooFilter;
use std::sync::{PoisonError, RwLock};

use crate::utils::validation::normalize_email;

const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Probabilistic set of registered emails. A miss is definitive, a hit is not.
pub struct EmailFilter {
    inner: RwLock<CuckooFilter<String>>,
}

impl Default for EmailFilter {
    fn default() -> Self {
        Self::with_capacity(FILTER_CAPACITY)
    }
}

impl EmailFilter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(CuckooFilter::new(capacity, FALSE_POSITIVE_RATE)),
        }
    }

    /// Check if an email might be registered (false positives possible)
    pub fn might_exist(&self, email: &str) -> bool {
        let email = normalize_email(email);
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&email)
    }

    pub fn insert(&self, email: &str) {
        let email = normalize_email(email);
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(&email);
    }

    pub fn remove(&self, email: &str) {
        let email = normalize_email(email);
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&email);
    }

    /// Emails must already be normalized.
    pub fn insert_batch(&self, emails: &[String]) {
        let mut filter = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for email in emails {
            filter.add(email);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misses_are_definitive() {
        let filter = EmailFilter::with_capacity(64);
        assert!(!filter.might_exist("asha@college.edu"));

        filter.insert("Asha@College.edu");
        assert!(filter.might_exist("asha@college.edu"));

        filter.remove("asha@college.edu");
        assert!(!filter.might_exist("asha@college.edu"));
    }

    #[test]
    fn batch_insert() {
        let filter = EmailFilter::with_capacity(64);
        filter.insert_batch(&["a@x.com".to_string(), "b@x.com".to_string()]);
        assert!(filter.might_exist("a@x.com"));
        assert!(filter.might_exist("B@x.com"));
    }
}
