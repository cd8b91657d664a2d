//! Result tagging for paginated reads and batched writes.
//!
//! A late failure never throws away data that was already fetched, but the
//! caller always learns whether the result is whole.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    /// Pagination stopped early. `cursor` is the page that failed, if known.
    Truncated {
        cursor: Option<String>,
        cause: String,
    },
}

impl Completeness {
    pub fn truncated(cursor: Option<String>, cause: impl fmt::Display) -> Self {
        Completeness::Truncated {
            cursor,
            cause: cause.to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Completeness::Complete)
    }
}

impl fmt::Display for Completeness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completeness::Complete => write!(f, "complete"),
            Completeness::Truncated {
                cursor: Some(cursor),
                cause,
            } => write!(f, "truncated at {cursor}: {cause}"),
            Completeness::Truncated { cursor: None, cause } => write!(f, "truncated: {cause}"),
        }
    }
}

/// Items gathered by a paginated read, with how far it got.
#[derive(Debug)]
pub struct Paged<T> {
    pub items: T,
    pub completeness: Completeness,
}

impl<T> Paged<T> {
    pub fn complete(items: T) -> Self {
        Self {
            items,
            completeness: Completeness::Complete,
        }
    }
}

/// A write batch that the destination did not acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub batch: usize,
    pub size: usize,
    pub cause: String,
}

/// Aggregate of a batched write: acknowledged records plus failed batches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub written: usize,
    pub batches: usize,
    pub failures: Vec<BatchFailure>,
}

impl WriteOutcome {
    pub fn failed_records(&self) -> usize {
        self.failures.iter().map(|f| f.size).sum()
    }
}

/// Overall verdict for an upsert or a whole sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Complete,
    Partial(String),
    Failed(String),
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Complete => write!(f, "complete"),
            RunStatus::Partial(reason) => write!(f, "partial ({reason})"),
            RunStatus::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}
