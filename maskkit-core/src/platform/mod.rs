//! Host platform abstraction.
//!
//! The extension host owns everything this core must not: the entropy
//! source, encrypted-at-rest persistence of wallet state, and the
//! user-facing confirmation dialogs. Each capability is a trait the host
//! implements; the in-memory implementations in [`memory`] back the test
//! suite.

pub mod memory;

pub use memory::{AutoApprove, AutoDecline, MemoryStateStore, RecordingPrompt};

use thiserror::Error;

use crate::types::Origin;

/// Errors produced by host storage implementations and state codecs.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The host storage backend failed.
    #[error("storage_backend: {message}")]
    Backend {
        /// Host-reported failure description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("storage_io: {context}: {source}")]
    Io {
        /// Operation being performed when the error occurred.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The state tree could not be encoded for persistence.
    #[error("storage_serialization: {message}")]
    Serialization {
        /// Encoder failure description.
        message: String,
    },

    /// A persisted state blob could not be decoded.
    #[error("storage_deserialization: {message}")]
    Deserialization {
        /// Decoder failure description.
        message: String,
    },

    /// The persisted state carries an unsupported version.
    #[error("storage_version: expected {expected}, found {found}")]
    InvalidVersion {
        /// Version this build reads and writes.
        expected: u32,
        /// Version found in the persisted blob.
        found: u32,
    },
}

impl StoreError {
    /// Creates a backend error with a host-reported message.
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates an I/O error with context.
    pub fn io<S: Into<String>>(context: S, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type alias for host storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Encrypted-at-rest persistence owned by the host.
///
/// The core hands the store an opaque CBOR blob; encryption, atomicity and
/// durability are the host's concern. One blob holds the whole state tree,
/// so a `save` replaces everything written before it.
pub trait StateStore: Send + Sync {
    /// Loads the persisted state blob, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the host backend fails to read.
    fn load(&self) -> StoreResult<Option<Vec<u8>>>;

    /// Replaces the persisted state blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the host backend fails to write.
    fn save(&self, bytes: &[u8]) -> StoreResult<()>;
}

/// A user-confirmation request raised in the middle of a call.
///
/// The call suspends until the host resolves the request with exactly one
/// terminal outcome. Declining is a normal result, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationRequest {
    /// Allow `origin` to log in with identities derived under `with_origin`.
    Link {
        /// The origin asking for delegated access.
        origin: Origin,
        /// The origin whose identities would be shared.
        with_origin: Origin,
    },
    /// Remove the links between `origin` and `with_origin`.
    Unlink {
        /// The origin asking to sever the link.
        origin: Origin,
        /// The linked counterpart.
        with_origin: Origin,
    },
}

/// Terminal outcome of a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    /// The user approved the action.
    Approved,
    /// The user declined the action.
    Declined,
}

/// The host's user-confirmation dialog.
pub trait ConfirmationPrompt: Send + Sync {
    /// Presents `request` to the user and returns the outcome.
    fn confirm(&self, request: &ConfirmationRequest) -> Approval;
}
