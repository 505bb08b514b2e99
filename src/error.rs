//! Error taxonomy for the fetch → parse → extract → validate pipeline.
//!
//! Row-scoped [`ExtractionError`]s are recovered by the table builder; every
//! other kind ends the processing of one unit and is surfaced to the batch
//! summary through [`UnitError`].

use crate::models::{TableType, ValueType};
use crate::schema::Violation;
use serde::Serialize;
use std::fmt;

// ── Fetch ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchErrorKind {
    Network,
    Timeout,
    HttpStatus,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Network { .. } => FetchErrorKind::Network,
            Self::Timeout { .. } => FetchErrorKind::Timeout,
            Self::HttpStatus { .. } => FetchErrorKind::HttpStatus,
        }
    }

    /// Network hiccups, timeouts, rate limiting and server errors are worth
    /// another attempt. Any other status is final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || (500..600).contains(status),
        }
    }
}

// ── Parse ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("document from {url} is not parseable: {reason}")]
    Unparseable { url: String, reason: String },
}

// ── Table definitions ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, thiserror::Error)]
pub enum SpecError {
    #[error("invalid selector '{selector}' for {context}: {message}")]
    InvalidSelector {
        context: String,
        selector: String,
        message: String,
    },

    #[error("{table}: transform {transform} cannot produce {kind} for field '{field}'")]
    IncompatibleTransform {
        table: TableType,
        field: String,
        transform: String,
        kind: ValueType,
    },

    #[error("invalid pattern /{pattern}/: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("{table}: field '{field}' is declared twice")]
    DuplicateField { table: TableType, field: String },
}

// ── Extraction (row-scoped) ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionErrorKind {
    NotFound,
    CoercionFailure,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionError {
    #[error("field '{field}' not found using selector '{selector}'")]
    NotFound { field: String, selector: String },

    #[error("field '{field}': cannot read '{text}' as {expected}: {reason}")]
    CoercionFailure {
        field: String,
        text: String,
        expected: ValueType,
        reason: String,
    },
}

impl ExtractionError {
    pub fn kind(&self) -> ExtractionErrorKind {
        match self {
            Self::NotFound { .. } => ExtractionErrorKind::NotFound,
            Self::CoercionFailure { .. } => ExtractionErrorKind::CoercionFailure,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::NotFound { field, .. } | Self::CoercionFailure { field, .. } => field,
        }
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, thiserror::Error)]
pub enum TableError {
    #[error("{table}: row selector '{selector}' matched nothing")]
    NoRows { table: TableType, selector: String },

    #[error("{table}: all {rows} rows failed extraction (first: {first})")]
    AllRowsFailed {
        table: TableType,
        rows: usize,
        first: ExtractionError,
    },

    #[error("{table}: {failed} of {total} rows failed, above the tolerated ratio {max_ratio}")]
    TooManyRowFailures {
        table: TableType,
        failed: usize,
        total: usize,
        max_ratio: f64,
    },
}

// ── Unit ──────────────────────────────────────────────────────────────────────

/// The stage a unit of work failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Fetch,
    Parse,
    Extract,
    Validate,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Parse => "parse",
            Self::Extract => "extract",
            Self::Validate => "validate",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UnitError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Extract(#[from] TableError),

    #[error("{} schema violation(s): {description}", violations.len())]
    Validate {
        violations: Vec<Violation>,
        description: String,
    },
}

impl UnitError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Fetch(_) => FailureKind::Fetch,
            Self::Parse(_) => FailureKind::Parse,
            Self::Extract(_) => FailureKind::Extract,
            Self::Validate { .. } => FailureKind::Validate,
        }
    }
}
