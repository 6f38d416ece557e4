//! Session lifecycle: the login/logout state machine.
//!
//! Each origin is either logged out or logged in with one mask. Login is
//! the only way in; logout (or an unlink side effect in the registry) is
//! the only way out. Sessions never expire on their own.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::derivation::MasterEntropy;
use crate::error::Error;
use crate::registry;
use crate::types::{Origin, Session, WalletState};

/// Logs `origin` in with the mask addressed by `identity_id`.
///
/// Without `with_linked_origin` the key derives under `origin` itself; with
/// it, the named origin must be an authorized login source (an edge
/// `with_linked_origin -> origin` must exist) and becomes the session's
/// derivation origin. The addressed mask is created on demand when
/// `identity_id` is the next free index under the derivation origin.
///
/// # Errors
///
/// Returns [`Error::UnauthorizedLink`] when the link edge is missing and
/// [`Error::InvalidInput`] when `identity_id` does not address a mask.
pub fn login(
    state: &mut WalletState,
    master: &MasterEntropy,
    origin: &Origin,
    identity_id: u32,
    with_linked_origin: Option<&Origin>,
) -> Result<Session, Error> {
    let derivation_origin = match with_linked_origin {
        None => origin.clone(),
        Some(linked) => {
            if !registry::is_linked(state, linked, origin) {
                return Err(Error::UnauthorizedLink {
                    origin: origin.clone(),
                    linked_origin: linked.clone(),
                });
            }
            linked.clone()
        }
    };
    registry::ensure_mask(state, master, &derivation_origin, identity_id)?;

    let session = Session {
        identity_id,
        derivation_origin,
        timestamp_ms: now_ms(),
    };
    state.record_entry(origin).current_session = Some(session.clone());
    tracing::info!(
        origin = %origin,
        identity_id,
        derivation_origin = %session.derivation_origin,
        "session started"
    );
    Ok(session)
}

/// Ends any session at `origin`. Idempotent; always succeeds.
pub fn logout(state: &mut WalletState, origin: &Origin) {
    if let Some(record) = state.record_mut(origin) {
        if record.current_session.take().is_some() {
            tracing::info!(origin = %origin, "session ended");
        }
    }
}

/// Whether `origin` currently has a live session. Pure query.
#[must_use]
pub fn session_exists(state: &WalletState, origin: &Origin) -> bool {
    state
        .record(origin)
        .is_some_and(|record| record.current_session.is_some())
}

/// Wall-clock milliseconds since the Unix epoch.
///
/// # Panics
///
/// Panics if the system clock is set before the Unix epoch.
fn now_ms() -> u64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before Unix epoch");
    elapsed.as_secs() * 1000 + u64::from(elapsed.subsec_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::link;

    fn master() -> MasterEntropy {
        MasterEntropy::from_bytes([0x77u8; 32])
    }

    fn origin(value: &str) -> Origin {
        Origin::parse(value).expect("valid origin")
    }

    #[test]
    fn test_login_direct_creates_mask_on_demand() {
        let mut state = WalletState::default();
        let o = origin("https://example.com");

        let session = login(&mut state, &master(), &o, 0, None).unwrap();
        assert_eq!(session.identity_id, 0);
        assert_eq!(session.derivation_origin, o);
        assert!(session_exists(&state, &o));
        assert_eq!(state.record(&o).unwrap().masks.len(), 1);
    }

    #[test]
    fn test_login_replaces_existing_session() {
        let mut state = WalletState::default();
        let o = origin("https://example.com");

        login(&mut state, &master(), &o, 0, None).unwrap();
        let replaced = login(&mut state, &master(), &o, 1, None).unwrap();
        assert_eq!(replaced.identity_id, 1);
        assert_eq!(
            state.record(&o).unwrap().current_session.as_ref().unwrap(),
            &replaced
        );
    }

    #[test]
    fn test_login_via_link_requires_edge() {
        let mut state = WalletState::default();
        let site = origin("https://site.com");
        let source = origin("https://source.com");

        let err = login(&mut state, &master(), &site, 0, Some(&source)).unwrap_err();
        assert_eq!(err.code(), "unauthorized_link");
        assert!(!session_exists(&state, &site));

        link(&mut state, &source, &site).unwrap();
        let session = login(&mut state, &master(), &site, 0, Some(&source)).unwrap();
        assert_eq!(session.derivation_origin, source);
        // The mask lives under the source origin, not the visited one.
        assert_eq!(state.record(&source).unwrap().masks.len(), 1);
        assert!(state.record(&site).unwrap().masks.is_empty());
    }

    #[test]
    fn test_link_direction_is_enforced() {
        let mut state = WalletState::default();
        let site = origin("https://site.com");
        let source = origin("https://source.com");
        link(&mut state, &source, &site).unwrap();

        // The edge authorizes site -> source delegation only.
        let err = login(&mut state, &master(), &source, 0, Some(&site)).unwrap_err();
        assert_eq!(err.code(), "unauthorized_link");
    }

    #[test]
    fn test_logout_is_idempotent() {
        let mut state = WalletState::default();
        let o = origin("https://example.com");

        logout(&mut state, &o);
        assert!(!session_exists(&state, &o));

        login(&mut state, &master(), &o, 0, None).unwrap();
        logout(&mut state, &o);
        logout(&mut state, &o);
        assert!(!session_exists(&state, &o));
    }
}
