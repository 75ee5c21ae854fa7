use std::fmt;

use anyhow::anyhow;

use crate::models::MoveViolation;

pub type Result<T> = std::result::Result<T, LibError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SelfReference,
    CrossTenant,
    NotFound,
    Circular,
    Commit,
    InvalidInput,
    Unknown,
}

/// Library error with a stable machine code and a human-readable public
/// message safe to surface to callers. The `source` keeps the full context
/// for logs.
#[derive(Debug)]
pub struct LibError {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub public: &'static str,
    pub source: anyhow::Error,
}

impl LibError {
    pub fn not_found(public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            code: "not_found",
            public,
            source,
        }
    }

    pub fn invalid(public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::InvalidInput,
            code: "invalid_input",
            public,
            source,
        }
    }

    pub fn commit(public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::Commit,
            code: "commit_failed",
            public,
            source,
        }
    }

    pub fn commit_in_flight() -> Self {
        Self {
            kind: ErrorKind::Commit,
            code: "commit_in_flight",
            public: "A commit is already in flight",
            source: anyhow!("structural edits are disabled while a commit is in flight"),
        }
    }

    pub fn unknown(public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::Unknown,
            code: "unknown_error",
            public,
            source,
        }
    }

    pub fn message(public: &'static str) -> Self {
        Self::unknown(public, anyhow!(public))
    }
}

impl From<MoveViolation> for LibError {
    fn from(violation: MoveViolation) -> Self {
        let kind = match violation {
            MoveViolation::SelfReference { .. } => ErrorKind::SelfReference,
            MoveViolation::SystemNotFound { .. } | MoveViolation::ParentNotFound { .. } => {
                ErrorKind::NotFound
            }
            MoveViolation::CrossTenant { .. } => ErrorKind::CrossTenant,
            MoveViolation::Circular { .. } => ErrorKind::Circular,
        };
        Self {
            kind,
            code: violation.error_code(),
            public: violation.public_message(),
            source: anyhow!("move rejected: {:?}", violation),
        }
    }
}

impl fmt::Display for LibError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.public, self.code)
    }
}

impl std::error::Error for LibError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}
