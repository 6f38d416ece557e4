//! Deterministic key derivation for per-origin mask identities.
//!
//! Every key in MaskKit is a pure function of the master entropy, the
//! derivation origin, the identity index and an optional per-request salt:
//!
//! ```text
//! path = SHA256("maskkit:origin-path" || SHA256(origin)
//!               || identity_id (4 bytes LE) || 0x00)                 (no salt)
//! path = SHA256("maskkit:origin-path" || SHA256(origin)
//!               || identity_id (4 bytes LE) || 0x01 || SHA256(salt)) (salted)
//! seed = HKDF-SHA256(salt = path, ikm = master).expand("maskkit:identity-key")
//! ```
//!
//! The seed becomes an ed25519 signing key. Identical inputs always rebuild
//! the identical keypair, which is what lets a website log the user back in
//! with the same identity after the extension restarts; distinct origins,
//! identity indices and salts each land on unrelated keypairs.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use hkdf::Hkdf;
use secrecy::{ExposeSecret, SecretBox};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::types::Origin;

// Domain Separation Labels

/// Label for hashing an origin and identity index into a derivation path.
const LABEL_ORIGIN_PATH: &[u8] = b"maskkit:origin-path";

/// Label for expanding a derivation path into ed25519 seed material.
const LABEL_IDENTITY_KEY: &[u8] = b"maskkit:identity-key";

/// Label for deriving a mask's textual principal from its public key.
const LABEL_PRINCIPAL: &[u8] = b"maskkit:principal";

/// Length in bytes of a mask public key.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Length in bytes of a request signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// The host-supplied 32-byte master secret.
///
/// Sole root of every derived key. It never leaves this module: the only
/// read path is as HKDF input keying material, and the container zeroizes
/// on drop.
pub struct MasterEntropy(SecretBox<[u8; 32]>);

impl MasterEntropy {
    /// Wraps host-supplied entropy bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(SecretBox::init_with(|| bytes))
    }

    fn expose(&self) -> &[u8; 32] {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for MasterEntropy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterEntropy([REDACTED])")
    }
}

/// A deterministically derived ed25519 keypair for one mask identity.
pub struct DerivedKeypair {
    signing: SigningKey,
}

impl DerivedKeypair {
    /// The 32-byte public key.
    #[must_use]
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.signing.verifying_key().to_bytes()
    }

    /// The verifying half of the keypair.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Signs a 32-byte message digest.
    ///
    /// Ed25519 signing is deterministic: the same digest under the same
    /// keypair always yields the same 64 bytes.
    #[must_use]
    pub fn sign(&self, message_digest: &[u8; 32]) -> [u8; SIGNATURE_LENGTH] {
        self.signing.sign(message_digest).to_bytes()
    }
}

/// Derives the keypair for `(derivation_origin, identity_id, salt)`.
///
/// Pure in its inputs; see the module docs for the construction.
///
/// # Panics
///
/// Panics only if HKDF refuses a 32-byte expansion, which cannot happen at
/// this output length.
#[must_use]
pub fn derive_keypair(
    master: &MasterEntropy,
    derivation_origin: &Origin,
    identity_id: u32,
    salt: Option<&[u8]>,
) -> DerivedKeypair {
    let path = derive_path(derivation_origin, identity_id, salt);
    let hkdf = Hkdf::<Sha256>::new(Some(path.as_slice()), master.expose());
    let mut seed = [0u8; 32];
    hkdf.expand(LABEL_IDENTITY_KEY, &mut seed)
        .expect("32 bytes is a single HKDF block");
    let signing = SigningKey::from_bytes(&seed);
    seed.zeroize();
    DerivedKeypair { signing }
}

/// Hashes the derivation inputs into a fixed-width path.
///
/// Variable-length components are pre-hashed so the concatenation is
/// unambiguous; the salt tag byte keeps "no salt" distinct from every
/// present salt, including the empty one.
fn derive_path(origin: &Origin, identity_id: u32, salt: Option<&[u8]>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(LABEL_ORIGIN_PATH);
    hasher.update(Sha256::digest(origin.as_str().as_bytes()));
    hasher.update(identity_id.to_le_bytes());
    match salt {
        None => hasher.update([0x00]),
        Some(salt) => {
            hasher.update([0x01]);
            hasher.update(Sha256::digest(salt));
        }
    }
    hasher.finalize().into()
}

/// Digest behind a mask's principal and default pseudonym.
pub(crate) fn principal_digest(public_key: &[u8; PUBLIC_KEY_LENGTH]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(LABEL_PRINCIPAL);
    hasher.update(public_key);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn master() -> MasterEntropy {
        MasterEntropy::from_bytes([0x5Au8; 32])
    }

    fn origin(value: &str) -> Origin {
        Origin::parse(value).expect("valid origin")
    }

    #[test]
    fn test_same_inputs_same_keypair() {
        let o = origin("https://example.com");
        let a = derive_keypair(&master(), &o, 0, None);
        let b = derive_keypair(&master(), &o, 0, None);
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test_case("https://example.com", "http://example.com"; "scheme differs")]
    #[test_case("https://example.com", "https://example.org"; "host differs")]
    #[test_case("https://example.com", "https://example.com:8443"; "port differs")]
    fn test_distinct_origins_distinct_keys(left: &str, right: &str) {
        let a = derive_keypair(&master(), &origin(left), 0, None);
        let b = derive_keypair(&master(), &origin(right), 0, None);
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_distinct_identity_indices_distinct_keys() {
        let o = origin("https://example.com");
        let keys: Vec<_> = (0..4)
            .map(|id| derive_keypair(&master(), &o, id, None).public_key())
            .collect();
        for i in 0..keys.len() {
            for j in (i + 1)..keys.len() {
                assert_ne!(keys[i], keys[j]);
            }
        }
    }

    #[test]
    fn test_salt_separates_keys() {
        let o = origin("https://example.com");
        let unsalted = derive_keypair(&master(), &o, 0, None);
        let empty = derive_keypair(&master(), &o, 0, Some(b""));
        let salted = derive_keypair(&master(), &o, 0, Some(b"token:ICP"));
        let salted_again = derive_keypair(&master(), &o, 0, Some(b"token:ICP"));

        assert_ne!(unsalted.public_key(), empty.public_key());
        assert_ne!(unsalted.public_key(), salted.public_key());
        assert_ne!(empty.public_key(), salted.public_key());
        assert_eq!(salted.public_key(), salted_again.public_key());
    }

    #[test]
    fn test_distinct_master_entropy_distinct_keys() {
        let o = origin("https://example.com");
        let a = derive_keypair(&master(), &o, 0, None);
        let b = derive_keypair(&MasterEntropy::from_bytes([0x11u8; 32]), &o, 0, None);
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_signing_is_deterministic_and_verifies() {
        use ed25519_dalek::{Signature, Verifier};

        let o = origin("https://example.com");
        let keypair = derive_keypair(&master(), &o, 0, None);
        let digest = [0xABu8; 32];

        let first = keypair.sign(&digest);
        let second = keypair.sign(&digest);
        assert_eq!(first, second);
        assert_eq!(first.len(), SIGNATURE_LENGTH);

        let signature = Signature::from_bytes(&first);
        keypair
            .verifying_key()
            .verify(&digest, &signature)
            .expect("signature verifies");
    }

    #[test]
    fn test_determinism_holds_for_arbitrary_entropy() {
        use rand::RngCore;

        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        let o = origin("https://example.com");

        let a = derive_keypair(&MasterEntropy::from_bytes(bytes), &o, 3, Some(b"s"));
        let b = derive_keypair(&MasterEntropy::from_bytes(bytes), &o, 3, Some(b"s"));
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_entropy_debug_is_redacted() {
        assert_eq!(format!("{:?}", master()), "MasterEntropy([REDACTED])");
    }
}
