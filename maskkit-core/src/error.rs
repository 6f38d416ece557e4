//! Error types surfaced by the identity protocol.
//!
//! Every failure a caller can observe maps to one of a small set of stable
//! machine-readable codes; the RPC layer puts [`Error::code`] on the wire
//! verbatim. All errors are terminal for the call that produced them: the
//! core never retries internally and a failed call leaves no observable
//! state change.

use thiserror::Error;

use crate::platform::StoreError;
use crate::types::Origin;

/// Errors from the origin-scoped identity protocol.
#[derive(Debug, Error)]
pub enum Error {
    /// The call payload is malformed or fails schema validation.
    #[error("invalid_input: {attribute}: {reason}")]
    InvalidInput {
        /// Name of the offending parameter.
        attribute: String,
        /// Description of the problem.
        reason: String,
    },

    /// The method string does not name a known method.
    #[error("unknown_method: {method}")]
    UnknownMethod {
        /// The unrecognized method string.
        method: String,
    },

    /// A protected method was invoked by an untrusted origin.
    #[error("protected_method_violation: {origin} called {method}")]
    ProtectedMethodViolation {
        /// The offending caller origin.
        origin: Origin,
        /// Wire name of the protected method.
        method: &'static str,
    },

    /// Signing or key retrieval was attempted without an active session.
    #[error("unauthorized")]
    Unauthorized,

    /// Login named a linked origin that is not an authorized login source.
    #[error("unauthorized_link: {linked_origin} is not a login source for {origin}")]
    UnauthorizedLink {
        /// The origin attempting to log in.
        origin: Origin,
        /// The linked origin that was requested.
        linked_origin: Origin,
    },

    /// The requested link already exists.
    #[error("already_linked: {from} -> {to}")]
    AlreadyLinked {
        /// Source origin of the existing edge.
        from: Origin,
        /// Target origin of the existing edge.
        to: Origin,
    },

    /// An access-gate invariant was breached.
    #[error("security_violation: {reason}")]
    SecurityViolation {
        /// Description of the breach.
        reason: String,
    },

    /// Encoding or decoding a payload failed unexpectedly.
    #[error("serialization_error: {error}")]
    Serialization {
        /// Codec failure description.
        error: String,
    },

    /// The host state store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// Builds an [`Error::InvalidInput`] for `attribute`.
    pub fn invalid_input<A: Into<String>, R: Into<String>>(attribute: A, reason: R) -> Self {
        Self::InvalidInput {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    /// The stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::UnknownMethod { .. } => "unknown_method",
            Self::ProtectedMethodViolation { .. } => "protected_method_violation",
            Self::Unauthorized => "unauthorized",
            Self::UnauthorizedLink { .. } => "unauthorized_link",
            Self::AlreadyLinked { .. } => "already_linked",
            Self::SecurityViolation { .. } => "security_violation",
            Self::Serialization { .. } => "serialization_error",
            Self::Store(_) => "storage_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let err = Error::invalid_input("origin", "missing scheme");
        assert_eq!(err.code(), "invalid_input");
        assert!(format!("{err}").starts_with("invalid_input:"));

        assert_eq!(Error::Unauthorized.code(), "unauthorized");
        assert_eq!(
            Error::UnknownMethod {
                method: "public.nope".to_string()
            }
            .code(),
            "unknown_method"
        );
        assert_eq!(
            Error::Store(StoreError::backend("disk on fire")).code(),
            "storage_error"
        );
    }
}
