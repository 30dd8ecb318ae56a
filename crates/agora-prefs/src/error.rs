//! Error types for preference edits, saves, and persistence.
//!
//! # Design
//! - Messages stay constant; context travels in fields.
//! - Edits never fail for well-formed input; only `save` and `load` surface
//!   persistence failures.

use thiserror::Error;

/// Errors raised while editing or parsing preference values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrefsError {
    /// The caller referenced a preference kind that does not exist.
    #[error("unknown preference id")]
    UnknownPreferenceId {
        /// Identifier supplied by the caller.
        id: String,
    },
    /// A time-of-day value was out of range or malformed.
    #[error("invalid time of day")]
    InvalidTimeOfDay {
        /// Offending value.
        value: String,
    },
    /// A locale identifier was not one of the supported locales.
    #[error("unknown locale")]
    UnknownLocale {
        /// Offending value.
        value: String,
    },
    /// A notification list did not contain every kind exactly once.
    #[error("invalid notification set: {detail}")]
    InvalidNotificationSet {
        /// Which rule the payload broke.
        detail: String,
    },
}

/// Convenience alias for preference edit results.
pub type PrefsResult<T> = Result<T, PrefsError>;

/// Failure reported by a persistence collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// The request never produced a response.
    #[error("network request failed")]
    Network {
        /// Transport error detail.
        detail: String,
    },
    /// The server answered with an unexpected status.
    #[error("server rejected the request")]
    Server {
        /// HTTP status code.
        status: u16,
    },
    /// The payload was refused as invalid.
    #[error("preferences failed validation")]
    Validation {
        /// Server-provided explanation.
        detail: String,
    },
    /// Credentials were missing or rejected.
    #[error("not authorized to save preferences")]
    Unauthorized,
    /// The operation exceeded the configured save timeout.
    #[error("persistence timed out")]
    Timeout,
    /// Local storage could not be read or written.
    #[error("local storage failed")]
    Storage {
        /// IO error detail.
        detail: String,
    },
    /// Stored data could not be decoded.
    #[error("stored preferences are corrupt")]
    Corrupt {
        /// Decoder error detail.
        detail: String,
    },
}

impl PersistenceError {
    /// Whether a retry of the same request could reasonably succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout | Self::Storage { .. } => true,
            Self::Server { status } => *status >= 500,
            Self::Validation { .. } | Self::Unauthorized | Self::Corrupt { .. } => false,
        }
    }
}

/// Errors returned by [`crate::PreferenceStore::save`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SaveError {
    /// Another save is already in flight.
    #[error("save already in progress")]
    SaveInProgress,
    /// The persistence collaborator reported failure.
    #[error("save failed")]
    SaveFailed {
        /// Failure reported by the collaborator.
        #[source]
        reason: PersistenceError,
    },
    /// The store was dropped before a detached save completed.
    #[error("preference store closed")]
    StoreClosed,
}
