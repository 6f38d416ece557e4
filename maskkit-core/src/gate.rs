//! The access gate: method classification and the trust-boundary check.
//!
//! Every inbound call carries a caller origin supplied by the host sandbox,
//! never by the caller's payload. Methods are a closed enum, each statically
//! classified `protected` (trusted wallet origin only) or `public` (any
//! caller, scoped to its own record). The gate runs once, before parameter
//! parsing and dispatch, and its decision is final for the call.

use strum::{Display, EnumString, IntoStaticStr};
use subtle::ConstantTimeEq;

use crate::error::Error;
use crate::types::Origin;

/// The closed set of RPC methods and their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum Method {
    /// Append a new mask for a target origin.
    #[strum(serialize = "protected.add")]
    Add,
    /// Start a session for a target origin.
    #[strum(serialize = "protected.login")]
    Login,
    /// List every identity a target origin could log in with.
    #[strum(serialize = "protected.getLoginOptions")]
    GetLoginOptions,
    /// Rename a mask.
    #[strum(serialize = "protected.editPseudonym")]
    EditPseudonym,
    /// End a target origin's session.
    #[strum(serialize = "protected.stopSession")]
    StopSession,
    /// Remove the links between a target origin and one counterpart.
    #[strum(serialize = "protected.unlinkOne")]
    UnlinkOne,
    /// Remove every link incident to a target origin.
    #[strum(serialize = "protected.unlinkAll")]
    UnlinkAll,
    /// Sign a request under the caller's session.
    #[strum(serialize = "public.sign")]
    Sign,
    /// The caller's active public key.
    #[strum(serialize = "public.getPublicKey")]
    GetPublicKey,
    /// End the caller's own session.
    #[strum(serialize = "public.requestLogout")]
    RequestLogout,
    /// Ask the user to link the caller with another origin.
    #[strum(serialize = "public.requestLink")]
    RequestLink,
    /// Ask the user to unlink the caller from another origin.
    #[strum(serialize = "public.requestUnlink")]
    RequestUnlink,
    /// The caller's link sets.
    #[strum(serialize = "public.getLinks")]
    GetLinks,
    /// Whether the caller has a live session.
    #[strum(serialize = "public.sessionExists")]
    SessionExists,
}

impl Method {
    /// Parses a wire method name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMethod`] for any string outside the closed
    /// set; nothing is ever dispatched for such a call.
    pub fn parse(name: &str) -> Result<Self, Error> {
        name.parse().map_err(|_| Error::UnknownMethod {
            method: name.to_string(),
        })
    }

    /// Whether only the trusted wallet origin may invoke this method.
    #[must_use]
    pub const fn is_protected(self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::Login
                | Self::GetLoginOptions
                | Self::EditPseudonym
                | Self::StopSession
                | Self::UnlinkOne
                | Self::UnlinkAll
        )
    }

    /// The stable wire name.
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        self.into()
    }
}

/// Checks `caller` against the trust class of `method`.
///
/// # Errors
///
/// Returns [`Error::ProtectedMethodViolation`] when an untrusted origin
/// invokes a protected method; the offending origin/method pair is also
/// recorded as a security event.
pub fn authorize(method: Method, caller: &Origin, trusted_origin: &Origin) -> Result<(), Error> {
    if method.is_protected() && !is_trusted(caller, trusted_origin) {
        tracing::warn!(
            origin = %caller,
            method = method.wire_name(),
            "protected method invoked by untrusted origin"
        );
        return Err(Error::ProtectedMethodViolation {
            origin: caller.clone(),
            method: method.wire_name(),
        });
    }
    Ok(())
}

/// Constant-time comparison against the trusted origin. Origin strings are
/// attacker-influenced input; the gate must not leak match length through
/// timing.
fn is_trusted(caller: &Origin, trusted: &Origin) -> bool {
    caller
        .as_str()
        .as_bytes()
        .ct_eq(trusted.as_str().as_bytes())
        .into()
}
