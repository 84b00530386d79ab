//! Error taxonomy for the orchestration core.
//!
//! Collaborators return `anyhow::Result`; the core wraps those failures at the
//! boundary of the call that produced them and turns them into a notification
//! plus a fallback value. None of these errors ends a view.

use thiserror::Error;

/// Why a typed query was not forwarded to the resolver. Never shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query must be at least {min} characters long")]
    TooShort { min: usize },

    #[error("query may only contain letters and spaces, found {0:?}")]
    InvalidCharacter(char),
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("autocomplete lookup failed: {0:#}")]
    Autocomplete(#[source] anyhow::Error),

    #[error("could not resolve location '{key}': {source:#}")]
    ByKey {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

impl LookupError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LookupError::Autocomplete(_) => "Error fetching autocomplete data.",
            LookupError::ByKey { .. } => "Error loading location.",
        }
    }
}

/// Which half of a weather fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchBranch {
    Current,
    Forecast,
}

impl std::fmt::Display for FetchBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchBranch::Current => f.write_str("current conditions"),
            FetchBranch::Forecast => f.write_str("forecast"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{branch} request failed: {source:#}")]
    Transport {
        branch: FetchBranch,
        #[source]
        source: anyhow::Error,
    },

    /// Well-formed response that lacks the fields we consume.
    #[error("{branch} payload is missing {missing}")]
    Shape { branch: FetchBranch, missing: &'static str },
}

impl FetchError {
    pub fn branch(&self) -> FetchBranch {
        match self {
            FetchError::Transport { branch, .. } | FetchError::Shape { branch, .. } => *branch,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match (self, self.branch()) {
            (FetchError::Transport { .. }, FetchBranch::Current) => {
                "Failed to load current weather."
            }
            (FetchError::Transport { .. }, FetchBranch::Forecast) => "Failed to load forecast.",
            (FetchError::Shape { .. }, FetchBranch::Current) => "Invalid weather data received.",
            (FetchError::Shape { .. }, FetchBranch::Forecast) => "Invalid forecast data received.",
        }
    }
}

/// Loader counter released more often than acquired. Internal defect marker only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("loader counter released while already at zero")]
pub struct CounterInvariantViolation;
