//! Failures surfaced by the comment service.
//!
//! Store internals report `anyhow` errors; they become
//! [`ServiceError::StoreUnavailable`] at the service boundary so callers
//! only ever see the five kinds below.

use strum::AsRefStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required field was empty after trimming.
    #[error("{field} must not be empty")]
    InvalidInput { field: &'static str },

    /// A mutation arrived without a session token.
    #[error("no session token was supplied")]
    MissingToken,

    #[error("comment not found: {id}")]
    NotFound { id: String },

    /// The requester does not own the comment, or nobody does.
    #[error("not allowed to modify comment: {id}")]
    Forbidden { id: String },

    #[error("comment store unavailable")]
    StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Stable classification of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    MissingToken,
    NotFound,
    Forbidden,
    StoreUnavailable,
}

impl ErrorKind {
    /// HTTP-style status for an outer transport.
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::InvalidInput => 400,
            ErrorKind::MissingToken => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::StoreUnavailable => 503,
        }
    }

    /// Process exit code used by the `gb` binary.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::InvalidInput => 2,
            ErrorKind::MissingToken => 3,
            ErrorKind::NotFound => 4,
            ErrorKind::Forbidden => 5,
            ErrorKind::StoreUnavailable => 6,
        }
    }
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidInput { .. } => ErrorKind::InvalidInput,
            ServiceError::MissingToken => ErrorKind::MissingToken,
            ServiceError::NotFound { .. } => ErrorKind::NotFound,
            ServiceError::Forbidden { .. } => ErrorKind::Forbidden,
            ServiceError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// Message suitable for showing to a visitor.
    ///
    /// Not-found and forbidden share one message so a caller cannot probe
    /// which ids exist.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::InvalidInput { field } => format!("Please fill in the {field}."),
            ServiceError::MissingToken => {
                "No session is established; reload and try again.".to_string()
            }
            ServiceError::NotFound { .. } | ServiceError::Forbidden { .. } => {
                "You can't do that to this comment.".to_string()
            }
            ServiceError::StoreUnavailable(_) => {
                "The guestbook is unavailable right now. Please try again.".to_string()
            }
        }
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::StoreUnavailable(err.into())
    }
}
