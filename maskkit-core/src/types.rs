//! Core data model: origins, masks, sessions and the persisted state tree.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::derivation::{self, PUBLIC_KEY_LENGTH};
use crate::error::Error;
use crate::platform::StoreError;

/// Current version of the persisted wallet state.
pub const STATE_VERSION: u32 = 1;

/// A website origin (`scheme://host`), the unit of trust scoping.
///
/// Origins are compared as opaque strings: `http://example.com` and
/// `https://example.com` are distinct identities with unrelated keys.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Origin(String);

impl Origin {
    /// Parses and validates a `scheme://host` origin string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the string is not a plain
    /// `scheme://host` origin (path, query, whitespace and empty components
    /// are all rejected).
    pub fn parse(value: &str) -> Result<Self, Error> {
        let Some((scheme, host)) = value.split_once("://") else {
            return Err(Error::invalid_input("origin", "missing scheme separator"));
        };
        let mut scheme_chars = scheme.chars();
        let scheme_ok = scheme_chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase())
            && scheme_chars.all(|c| {
                c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '-' | '.')
            });
        if !scheme_ok {
            return Err(Error::invalid_input("origin", "invalid scheme"));
        }
        if host.is_empty() || host.contains(|c: char| c == '/' || c.is_whitespace()) {
            return Err(Error::invalid_input("origin", "invalid host"));
        }
        Ok(Self(value.to_string()))
    }

    /// The origin as its wire string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Origin {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Origin({})", self.0)
    }
}

/// Textual public identifier derived from a mask's public key.
///
/// Rendered as dash-grouped hex of a domain-separated digest, so the same
/// derived key always shows the same principal.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    /// Derives the principal for a mask public key.
    #[must_use]
    pub fn from_public_key(public_key: &[u8; PUBLIC_KEY_LENGTH]) -> Self {
        let digest = derivation::principal_digest(public_key);
        let encoded = hex::encode(&digest[..16]);
        let grouped = encoded
            .as_bytes()
            .chunks(8)
            .map(|chunk| std::str::from_utf8(chunk).expect("hex output is ASCII"))
            .collect::<Vec<_>>()
            .join("-");
        Self(grouped)
    }

    /// The principal's textual form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix used for default pseudonyms.
    fn short_tag(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.0)
    }
}

/// One deterministically derived pseudonymous identity on an origin.
///
/// A mask's position in its origin's list *is* its identity index; masks are
/// append-only and never reordered, so indices stay stable forever.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mask {
    /// Human-readable label; starts derived, user-editable later.
    pub pseudonym: String,
    /// Stable textual identifier derived from the mask public key.
    pub principal: Principal,
}

impl Mask {
    /// Builds the mask for a freshly derived public key. The principal and
    /// the initial pseudonym both come from the same digest, so the same
    /// key always presents the same label until the user renames it.
    #[must_use]
    pub fn from_public_key(public_key: &[u8; PUBLIC_KEY_LENGTH]) -> Self {
        let principal = Principal::from_public_key(public_key);
        let pseudonym = format!("Mask {}", principal.short_tag());
        Self {
            pseudonym,
            principal,
        }
    }
}

/// The live binding of a visiting origin to a mask.
///
/// `derivation_origin` is the origin whose entropy path actually derives the
/// active key; with a link in effect it differs from the visited origin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Index of the mask under `derivation_origin`.
    pub identity_id: u32,
    /// Origin whose derivation path is in use.
    pub derivation_origin: Origin,
    /// Wall-clock milliseconds when the session started. Informational
    /// only; sessions never expire by timeout.
    pub timestamp_ms: u64,
}

/// Everything the wallet tracks for one origin.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginRecord {
    /// Append-only mask list; index is the identity id.
    pub masks: Vec<Mask>,
    /// Origins whose identities this origin may log in with.
    pub links_from: BTreeSet<Origin>,
    /// Origins that may log in with this origin's identities.
    pub links_to: BTreeSet<Origin>,
    /// The active session, if any.
    pub current_session: Option<Session>,
}

/// The versioned root of the persisted wallet state.
///
/// `asset_data` and `statistics` belong to external collaborators; this core
/// round-trips them untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    /// Format version of the persisted blob.
    pub version: u32,
    /// Per-origin records, keyed by origin string.
    pub origin_data: BTreeMap<Origin, OriginRecord>,
    /// Opaque token/asset data owned by the transfer subsystem.
    pub asset_data: serde_json::Value,
    /// Opaque usage counters owned by the statistics subsystem.
    pub statistics: serde_json::Value,
}

impl Default for WalletState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            origin_data: BTreeMap::new(),
            asset_data: serde_json::Value::Null,
            statistics: serde_json::Value::Null,
        }
    }
}

impl WalletState {
    /// The record for `origin`, if one exists.
    #[must_use]
    pub fn record(&self, origin: &Origin) -> Option<&OriginRecord> {
        self.origin_data.get(origin)
    }

    /// Mutable access to an existing record for `origin`.
    pub fn record_mut(&mut self, origin: &Origin) -> Option<&mut OriginRecord> {
        self.origin_data.get_mut(origin)
    }

    /// Mutable access to the record for `origin`, created lazily.
    pub fn record_entry(&mut self, origin: &Origin) -> &mut OriginRecord {
        self.origin_data.entry(origin.clone()).or_default()
    }

    /// Encodes the state tree as a CBOR blob for the host store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes).map_err(|err| {
            StoreError::Serialization {
                message: err.to_string(),
            }
        })?;
        Ok(bytes)
    }

    /// Decodes a persisted state blob, checking the format version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Deserialization`] on malformed bytes and
    /// [`StoreError::InvalidVersion`] on a version mismatch.
    pub fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        let state: Self =
            ciborium::de::from_reader(bytes).map_err(|err| StoreError::Deserialization {
                message: err.to_string(),
            })?;
        if state.version != STATE_VERSION {
            return Err(StoreError::InvalidVersion {
                expected: STATE_VERSION,
                found: state.version,
            });
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_parse_accepts_plain_origins() {
        for value in [
            "https://example.com",
            "http://example.com",
            "https://localhost:8080",
            "chrome-extension://abcdefgh",
        ] {
            let origin = Origin::parse(value).expect("valid origin");
            assert_eq!(origin.as_str(), value);
        }
    }

    #[test]
    fn test_origin_parse_rejects_junk() {
        for value in [
            "",
            "example.com",
            "https://",
            "://example.com",
            "HTTPS://example.com",
            "https://example.com/path",
            "https://exa mple.com",
        ] {
            assert!(Origin::parse(value).is_err(), "accepted {value:?}");
        }
    }

    #[test]
    fn test_principal_is_stable_and_grouped() {
        let key = [0x42u8; PUBLIC_KEY_LENGTH];
        let a = Principal::from_public_key(&key);
        let b = Principal::from_public_key(&key);
        assert_eq!(a, b);
        assert_eq!(a.as_str().split('-').count(), 4);
        for group in a.as_str().split('-') {
            assert_eq!(group.len(), 8);
        }

        let other = Principal::from_public_key(&[0x43u8; PUBLIC_KEY_LENGTH]);
        assert_ne!(a, other);
    }

    #[test]
    fn test_mask_default_pseudonym_matches_principal() {
        let mask = Mask::from_public_key(&[7u8; PUBLIC_KEY_LENGTH]);
        assert!(mask.pseudonym.starts_with("Mask "));
        assert!(mask.principal.as_str().starts_with(&mask.pseudonym[5..]));
    }

    #[test]
    fn test_state_round_trip_preserves_external_sections() {
        let mut state = WalletState::default();
        state.asset_data = serde_json::json!({"tokens": [{"symbol": "ICP", "amount": 3}]});
        state.statistics = serde_json::json!({"calls": 17});
        let origin = Origin::parse("https://example.com").unwrap();
        state
            .record_entry(&origin)
            .masks
            .push(Mask::from_public_key(&[1u8; PUBLIC_KEY_LENGTH]));

        let bytes = state.encode().unwrap();
        let decoded = WalletState::decode(&bytes).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_state_decode_rejects_future_version() {
        let mut state = WalletState::default();
        state.version = STATE_VERSION + 1;
        let bytes = state.encode().unwrap();
        let err = WalletState::decode(&bytes).unwrap_err();
        assert!(matches!(err, StoreError::InvalidVersion { found, .. } if found == STATE_VERSION + 1));
    }
}
