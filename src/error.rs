use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// A rejected configuration assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub expected: String,
    pub received: String,
}

impl ValidationError {
    pub fn new(
        path: impl Into<String>,
        expected: impl Into<String>,
        received: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            received: received.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"Validation failed at "{}": expected {}, received {}"#,
            self.path, self.expected, self.received
        )
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// ClassEventError: top-level rollup
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ClassEventError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, ClassEventError>;
