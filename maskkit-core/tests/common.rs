//! Common test utilities shared across integration tests.

// Each integration test binary compiles this module separately and uses a
// different subset of the helpers.
#![allow(dead_code)]

use std::sync::Arc;

use maskkit_core::platform::{AutoApprove, ConfirmationPrompt, StateStore};
use maskkit_core::platform::MemoryStateStore;
use maskkit_core::{Call, MaskWallet, MasterEntropy, Origin};

/// The wallet's own management origin, allowed to call `protected.*`.
pub const TRUSTED_ORIGIN: &str = "https://wallet.maskkit.dev";

/// Parses a test origin.
pub fn origin(value: &str) -> Origin {
    Origin::parse(value).expect("valid origin")
}

/// Fixed test entropy; every wallet built from it derives the same keys.
pub fn entropy() -> MasterEntropy {
    MasterEntropy::from_bytes([0x42u8; 32])
}

/// Builds a wallet over the given store and prompt.
pub fn wallet_on(store: Arc<dyn StateStore>, prompt: Arc<dyn ConfirmationPrompt>) -> MaskWallet {
    MaskWallet::new(entropy(), origin(TRUSTED_ORIGIN), store, prompt)
}

/// Builds a wallet over a fresh in-memory store that approves every prompt.
pub fn wallet() -> MaskWallet {
    wallet_on(Arc::new(MemoryStateStore::new()), Arc::new(AutoApprove))
}

/// Dispatches a call expected to succeed and returns its payload.
pub fn call(
    wallet: &MaskWallet,
    caller: &str,
    method: &str,
    body: serde_json::Value,
) -> serde_json::Value {
    wallet
        .handle(&origin(caller), &Call::new(method, body))
        .unwrap_or_else(|err| panic!("{method} from {caller} failed: {err}"))
}

/// Dispatches a call expected to fail and returns its error code.
pub fn call_err(
    wallet: &MaskWallet,
    caller: &str,
    method: &str,
    body: serde_json::Value,
) -> &'static str {
    wallet
        .handle(&origin(caller), &Call::new(method, body))
        .expect_err("call should fail")
        .code()
}

/// Logs `site` in from the trusted origin with `identity_id`.
pub fn login(wallet: &MaskWallet, site: &str, identity_id: u32) {
    call(
        wallet,
        TRUSTED_ORIGIN,
        "protected.login",
        serde_json::json!({"origin": site, "identityId": identity_id}),
    );
}

/// The caller's current public key as hex.
pub fn public_key(wallet: &MaskWallet, caller: &str) -> String {
    call(wallet, caller, "public.getPublicKey", serde_json::json!({}))["publicKey"]
        .as_str()
        .expect("publicKey is a string")
        .to_string()
}

/// Signs `request` as `caller` and returns the raw signature bytes.
pub fn sign(wallet: &MaskWallet, caller: &str, request: serde_json::Value) -> Vec<u8> {
    let reply = call(
        wallet,
        caller,
        "public.sign",
        serde_json::json!({"request": request}),
    );
    let signature = reply["signature"].as_str().expect("signature is a string");
    hex::decode(signature).expect("signature is hex")
}
