use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::{ApiError, FieldError};
use crate::model::batch;
use crate::utils::dates::parse_iso8601;

/// Accumulates field errors so a single response reports every bad field.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> bool {
        if !ok {
            self.fail(field, message);
        }
        ok
    }

    /// Trimmed, non-blank text.
    pub fn required(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v.to_string()),
            _ => {
                self.fail(field, message);
                None
            }
        }
    }

    /// Like [`Validator::required`] but only checks a value that was sent.
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        value.and_then(|v| self.required(field, Some(v), message))
    }

    pub fn one_of<T: FromStr>(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<T> {
        match value.map(str::parse::<T>) {
            Some(Ok(v)) => Some(v),
            _ => {
                self.fail(field, message);
                None
            }
        }
    }

    pub fn date(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<DateTime<Utc>> {
        match value.and_then(parse_iso8601) {
            Some(v) => Some(v),
            None => {
                self.fail(field, message);
                None
            }
        }
    }

    pub fn batch(&mut self, field: &str, value: &str) -> Option<String> {
        let value = value.trim();
        self.check(batch::is_known(value), field, "Invalid batch")
            .then(|| value.to_string())
    }

    pub fn batches(&mut self, field: &str, values: &[String]) -> Option<Vec<String>> {
        let all_known = values.iter().all(|b| batch::is_known(b.trim()));
        self.check(all_known, field, "Invalid batches")
            .then(|| values.iter().map(|b| b.trim().to_string()).collect())
    }

    /// Character count, not bytes.
    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize, message: &str) -> bool {
        let ok = value.is_none_or(|v| v.trim().chars().count() <= max);
        self.check(ok, field, message)
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

/// Deliberately loose: one `@`, non-empty local part, dotted domain, no spaces.
pub fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .collect::<Vec<_>>()
            .as_slice()
            .split_last()
            .is_some_and(|(tld, rest)| !rest.is_empty() && tld.len() >= 2 && rest.iter().all(|p| !p.is_empty()))
}

/// Emails are matched case-insensitively.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::request::RequestType;

    #[test]
    fn collects_every_failure() {
        let mut v = Validator::new();
        assert_eq!(v.required("title", Some("  "), "Title is required"), None);
        assert_eq!(v.required("content", None, "Content is required"), None);
        assert_eq!(v.one_of::<RequestType>("type", Some("holiday"), "Invalid request type"), None);

        match v.finish() {
            Err(ApiError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, ["title", "content", "type"]);
                assert_eq!(errors[2].message, "Invalid request type");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn trims_accepted_text() {
        let mut v = Validator::new();
        assert_eq!(v.required("name", Some("  Asha "), "Name is required").as_deref(), Some("Asha"));
        assert_eq!(v.optional_text("time", None, "Time is required"), None);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn length_limit_counts_characters() {
        let mut v = Validator::new();
        assert!(v.max_len("remarks", Some(&"é".repeat(500)), 500, "too long"));
        assert!(!v.max_len("remarks", Some(&"a".repeat(501)), 500, "too long"));
        assert!(v.max_len("remarks", None, 500, "too long"));
    }

    #[test]
    fn batch_checks() {
        let mut v = Validator::new();
        assert_eq!(v.batch("batch", " FYCSO ").as_deref(), Some("FYCSO"));
        assert_eq!(v.batches("batches", &["SYCSO".into(), "TYMEO".into()]).map(|b| b.len()), Some(2));
        assert!(v.finish().is_ok());

        let mut v = Validator::new();
        assert!(v.batches("batches", &["SYCSO".into(), "nope".into()]).is_none());
        assert!(v.finish().is_err());
    }

    #[test]
    fn email_shapes() {
        assert!(is_email("a@x.com"));
        assert!(is_email("first.last@dept.college.edu"));
        assert!(!is_email("a@x"));
        assert!(!is_email("@x.com"));
        assert!(!is_email("a@@x.com"));
        assert!(!is_email("a b@x.com"));
        assert!(!is_email("a@x..com"));
        assert!(!is_email("plain"));
        assert_eq!(normalize_email("  A@X.com "), "a@x.com");
    }
}
