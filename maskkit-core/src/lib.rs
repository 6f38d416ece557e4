//! MaskKit core — the origin-scoped identity protocol behind the MaskKit
//! browser-extension wallet.
//!
//! Every website origin gets its own deterministically derived ed25519
//! identities ("masks"); a session binds a visited origin to one mask; an
//! explicit, user-confirmed link lets one origin log in with identities
//! derived under another. The RPC access gate in front of it all is the
//! single trust-boundary checkpoint: `protected.*` methods answer only to
//! the trusted wallet origin, `public.*` methods only ever touch the
//! caller's own record.
//!
//! The host supplies the master entropy, the encrypted state store and the
//! user-confirmation dialog through the traits in [`platform`]; everything
//! else lives here.

#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod canonical;
mod derivation;
mod error;
mod gate;
mod registry;
mod rpc;
mod session;
mod signer;
mod types;
mod wallet;

pub mod platform;

pub use canonical::{canonical_encode, request_digest};
pub use derivation::{
    derive_keypair, DerivedKeypair, MasterEntropy, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH,
};
pub use error::Error;
pub use gate::Method;
pub use registry::verify_link_mirror;
pub use rpc::{Call, CallParams, Reply, WireError};
pub use types::{Mask, Origin, OriginRecord, Principal, Session, WalletState, STATE_VERSION};
pub use wallet::MaskWallet;
