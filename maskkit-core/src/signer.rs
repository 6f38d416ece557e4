//! Session-gated request signing and public-key retrieval.
//!
//! Both operations re-derive the session's key from scratch on every call;
//! determinism makes that free of surprises and keeps private key material
//! out of the state tree entirely.

use crate::canonical;
use crate::derivation::{self, MasterEntropy, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use crate::error::Error;
use crate::types::{Origin, Session, WalletState};

/// The active public key for `origin`, under the session's derivation
/// origin and identity, with `salt` folded into the derivation path.
///
/// # Errors
///
/// Returns [`Error::Unauthorized`] without a live session at `origin`.
pub fn get_public_key(
    state: &WalletState,
    master: &MasterEntropy,
    origin: &Origin,
    salt: Option<&[u8]>,
) -> Result<[u8; PUBLIC_KEY_LENGTH], Error> {
    let session = active_session(state, origin)?;
    let keypair = derivation::derive_keypair(
        master,
        &session.derivation_origin,
        session.identity_id,
        salt,
    );
    Ok(keypair.public_key())
}

/// Signs `request` under `origin`'s active session.
///
/// The request is canonicalized, domain-prefixed and hashed before signing,
/// and ed25519 is deterministic, so identical `(request, salt, session)`
/// inputs always produce the identical 64-byte signature.
///
/// # Errors
///
/// Returns [`Error::Unauthorized`] without a live session at `origin`, or
/// [`Error::Serialization`] if the request cannot be canonicalized.
pub fn sign_request(
    state: &WalletState,
    master: &MasterEntropy,
    origin: &Origin,
    request: &serde_json::Value,
    salt: Option<&[u8]>,
) -> Result<[u8; SIGNATURE_LENGTH], Error> {
    let session = active_session(state, origin)?;
    let digest = canonical::request_digest(request)?;
    let keypair = derivation::derive_keypair(
        master,
        &session.derivation_origin,
        session.identity_id,
        salt,
    );
    Ok(keypair.sign(&digest))
}

/// The caller's live session. The lookup is keyed by the gate-supplied
/// caller origin, which is what makes cross-origin signing impossible:
/// there is no parameter through which another origin's session could be
/// addressed.
fn active_session<'state>(
    state: &'state WalletState,
    origin: &Origin,
) -> Result<&'state Session, Error> {
    state
        .record(origin)
        .and_then(|record| record.current_session.as_ref())
        .ok_or(Error::Unauthorized)
}
