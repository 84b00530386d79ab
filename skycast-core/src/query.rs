//! Input debounce and validation.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::QueryError;

pub const MIN_QUERY_LEN: usize = 2;

/// A query that passed the letters-and-spaces filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        if let Some(bad) = raw.chars().find(|c| !(c.is_ascii_alphabetic() || c.is_whitespace())) {
            return Err(QueryError::InvalidCharacter(bad));
        }
        if raw.chars().count() < MIN_QUERY_LEN {
            return Err(QueryError::TooShort { min: MIN_QUERY_LEN });
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trailing-edge debouncer: keeps only the latest value and fires once the
/// window has passed without another push.
#[derive(Debug)]
pub struct Debounce<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debounce<T> {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.window));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// Hand out the pending value if its window has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match self.pending {
            Some((_, at)) if at <= now => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }
}
