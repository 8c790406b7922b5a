//! Alphabetic section breaks between top-level groups.

use crate::field_order::Field;

/// Letter bucket a top-level value sorts under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Letter(char),
    /// Digits, punctuation and anything else that is not a letter ("0-9").
    Other,
}

impl Bucket {
    /// Buckets a non-empty field value. Artist names drop a leading "THE ".
    pub fn for_value(field: Field, value: &str) -> Bucket {
        let upper = value.to_uppercase();
        let trimmed = if field == Field::Artist {
            upper.strip_prefix("THE ").unwrap_or(&upper)
        } else {
            upper.as_str()
        };
        match trimmed.chars().next() {
            Some(first) if first.is_alphabetic() => Bucket::Letter(first),
            _ => Bucket::Other,
        }
    }
}

/// Tracks the last bucket seen at the top level of one build pass.
#[derive(Debug, Clone, Default)]
pub struct SeparatorPolicy {
    enabled: bool,
    last_bucket: Option<Bucket>,
}

impl SeparatorPolicy {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last_bucket: None,
        }
    }

    /// Records the bucket for the next top-level value and reports whether a
    /// separator must precede it. The first value never gets one.
    pub fn observe(&mut self, field: Field, value: &str) -> bool {
        if !self.enabled || value.is_empty() {
            return false;
        }
        let bucket = Bucket::for_value(field, value);
        match self.last_bucket.replace(bucket) {
            Some(previous) => previous != bucket,
            None => false,
        }
    }
}
