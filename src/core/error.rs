//! Error types and boundary mapping.
//!
//! Two layers of errors exist:
//! - [`StoreError`] describes why a key-value backend could not answer.
//!   Stores return it verbatim and never turn it into "absent" or "false".
//! - [`GuardError`] is the domain taxonomy returned by the guard manager.
//!   Every `StoreError` is wrapped into [`GuardError::StoreUnavailable`] at the
//!   manager boundary.
//!
//! The error codes returned by [`GuardError::code`] are stable string
//! constants and part of the HTTP contract.

use thiserror::Error;

/// Failure talking to the key-value backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Connection could not be established or was lost.
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// A connect or command round-trip exceeded its deadline.
    #[error("store operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The backend answered with something the client does not understand,
    /// or with an explicit error reply.
    #[error("store protocol error: {message}")]
    Protocol { message: String },
}

impl StoreError {
    /// Create an Unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a Protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

/// Result type for raw store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Domain failures of the guard lifecycle.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The user already holds the configured maximum number of guards.
    #[error("Reached max guards count ({max})")]
    QuotaExceeded { max: u32 },

    /// The guard was never issued, was revoked, or has expired.
    #[error("Guard does not exist")]
    NotFound,

    /// The backend refused to persist the guard record.
    #[error("Failed to create guard: store rejected write for key {key}")]
    PersistenceFailure { key: String },

    /// The existence check passed but the delete removed nothing.
    #[error("Failed to delete guard: nothing removed for key {key}")]
    DeletionFailure { key: String },

    /// The backend could not be reached or answered incoherently.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

/// Who caused a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOrigin {
    /// The request itself is at fault.
    Client,
    /// The service failed while handling a valid request.
    Server,
    /// Supporting infrastructure is down.
    Infrastructure,
}

impl GuardError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "REACHED_MAX_GUARDS_COUNT",
            Self::NotFound => "GUARD_DOES_NOT_EXIST",
            Self::PersistenceFailure { .. } => "FAILED_TO_CREATE_GUARD",
            Self::DeletionFailure { .. } => "FAILED_TO_DELETE_GUARD",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    /// Message safe to show to a caller.
    ///
    /// Server- and infrastructure-caused failures never leak keys or backend
    /// detail here; that goes to the log instead.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "Reached max guards count",
            Self::NotFound => "Guard does not exist",
            Self::PersistenceFailure { .. } => "Failed to create guard",
            Self::DeletionFailure { .. } => "Failed to delete guard",
            Self::StoreUnavailable(_) => "Service unavailable",
        }
    }

    /// Classify the failure.
    pub fn origin(&self) -> FailureOrigin {
        match self {
            Self::QuotaExceeded { .. } | Self::NotFound => FailureOrigin::Client,
            Self::PersistenceFailure { .. } | Self::DeletionFailure { .. } => {
                FailureOrigin::Server
            }
            Self::StoreUnavailable(_) => FailureOrigin::Infrastructure,
        }
    }

    /// Whether repeating the whole operation may succeed.
    ///
    /// `QuotaExceeded` is excluded: it only clears once a guard expires or
    /// is revoked.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::PersistenceFailure { .. }
                | Self::DeletionFailure { .. }
                | Self::StoreUnavailable(_)
        )
    }
}

/// Result type for guard lifecycle operations.
pub type GuardResult<T> = Result<T, GuardError>;

// ============================================================================
// HTTP status mapping
// ============================================================================

/// Maps domain errors onto HTTP status codes.
pub struct HttpErrorMapping;

impl HttpErrorMapping {
    /// HTTP status for a guard error.
    pub fn to_status(error: &GuardError) -> u16 {
        match error {
            GuardError::QuotaExceeded { .. } => 403,
            GuardError::NotFound => 404,
            GuardError::PersistenceFailure { .. } => 500,
            GuardError::DeletionFailure { .. } => 500,
            GuardError::StoreUnavailable(_) => 503,
        }
    }
}
