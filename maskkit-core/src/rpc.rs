//! The call envelope, typed method parameters and wire views.
//!
//! Everything a caller sends or receives crosses this module: bodies are
//! parsed into per-method structs with unknown fields rejected, results are
//! serialized from typed views, and failures carry their stable code. No
//! public method parameter can name another origin's data; the structs
//! simply have no field for it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{Origin, Principal};

/// An inbound call envelope: `{ "method": ..., "params": { "body": ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    /// Wire method name.
    pub method: String,
    /// Method parameters.
    pub params: CallParams,
}

impl Call {
    /// Builds an envelope for `method` carrying `body`.
    #[must_use]
    pub fn new<M: Into<String>>(method: M, body: serde_json::Value) -> Self {
        Self {
            method: method.into(),
            params: CallParams { body },
        }
    }
}

/// The `params` wrapper of the call envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallParams {
    /// Encoded method payload; `null` for parameterless methods.
    #[serde(default)]
    pub body: serde_json::Value,
}

/// The reply envelope: a result payload or a coded error.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// The method succeeded.
    Success {
        /// The method's result payload.
        ok: serde_json::Value,
    },
    /// The method failed.
    Failure {
        /// Machine-readable failure payload.
        error: WireError,
    },
}

impl Reply {
    /// Wraps a dispatch outcome for the wire.
    #[must_use]
    pub fn from_result(result: Result<serde_json::Value, Error>) -> Self {
        match result {
            Ok(ok) => Self::Success { ok },
            Err(err) => Self::Failure {
                error: WireError {
                    code: err.code().to_string(),
                    message: err.to_string(),
                },
            },
        }
    }
}

/// Machine-readable error payload.
#[derive(Debug, Clone, Serialize)]
pub struct WireError {
    /// Stable error code; see [`Error::code`].
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

// Method parameters

/// Parameters for `protected.add`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddParams {
    /// Origin to mint a mask for.
    pub origin: Origin,
}

/// Parameters for `protected.login`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginParams {
    /// Origin being logged in.
    pub origin: Origin,
    /// Mask index under the derivation origin.
    pub identity_id: u32,
    /// Linked origin whose identity to use, if any.
    #[serde(default)]
    pub with_linked_origin: Option<Origin>,
}

/// Parameters for `protected.getLoginOptions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GetLoginOptionsParams {
    /// Origin whose options to list.
    pub origin: Origin,
}

/// Parameters for `protected.editPseudonym`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EditPseudonymParams {
    /// Origin owning the mask.
    pub origin: Origin,
    /// Mask index under `origin`.
    pub identity_id: u32,
    /// Replacement label.
    pub pseudonym: String,
}

/// Parameters for `protected.stopSession`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StopSessionParams {
    /// Origin whose session to end.
    pub origin: Origin,
}

/// Parameters for `protected.unlinkOne`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UnlinkOneParams {
    /// Origin on one side of the link.
    pub origin: Origin,
    /// The linked counterpart to remove.
    pub linked_origin: Origin,
}

/// Parameters for `protected.unlinkAll`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UnlinkAllParams {
    /// Origin whose links to remove.
    pub origin: Origin,
}

/// Parameters for `public.sign`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignParams {
    /// Arbitrary request payload to sign canonically.
    pub request: serde_json::Value,
    /// Optional derivation salt, e.g. an asset-scoped sub-identity.
    #[serde(default)]
    pub salt: Option<Vec<u8>>,
}

/// Parameters for `public.getPublicKey`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GetPublicKeyParams {
    /// Optional derivation salt.
    #[serde(default)]
    pub salt: Option<Vec<u8>>,
}

/// Parameters for `public.requestLink` and `public.requestUnlink`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LinkRequestParams {
    /// The counterpart origin.
    pub with_origin: Origin,
}

// Wire views

/// Wire view of one mask identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskView {
    /// Mask index under its origin.
    pub identity_id: u32,
    /// Current label.
    pub pseudonym: String,
    /// Stable textual identifier.
    pub principal: Principal,
}

/// Wire view of a live session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Mask index under the derivation origin.
    pub identity_id: u32,
    /// Origin whose derivation path is in use.
    pub derivation_origin: Origin,
    /// Session start, wall-clock milliseconds.
    pub timestamp_ms: u64,
}

/// Wire view of one login option.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOptionView {
    /// Origin the identity derives under.
    pub derivation_origin: Origin,
    /// Mask index under `derivation_origin`.
    pub identity_id: u32,
    /// Current label.
    pub pseudonym: String,
    /// Stable textual identifier.
    pub principal: Principal,
}

/// Wire view of the caller's link sets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinksView {
    /// Origins the caller may log in with identities from.
    pub links_from: Vec<Origin>,
    /// Origins that may log in with the caller's identities.
    pub links_to: Vec<Origin>,
}

/// Wire view of a signature.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureView {
    /// Hex-encoded 64-byte signature.
    pub signature: String,
}

/// Wire view of a public key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyView {
    /// Hex-encoded 32-byte public key.
    pub public_key: String,
}

/// Parses a method body into its typed parameters.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] on any schema mismatch, including
/// unknown fields.
pub(crate) fn parse_body<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, Error> {
    serde_json::from_value(body).map_err(|err| Error::invalid_input("body", err.to_string()))
}

/// Serializes a typed view for the wire.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the view cannot be encoded, which
/// would be a bug rather than caller input.
pub(crate) fn to_wire<T: Serialize>(view: &T) -> Result<serde_json::Value, Error> {
    serde_json::to_value(view).map_err(|err| Error::Serialization {
        error: err.to_string(),
    })
}
