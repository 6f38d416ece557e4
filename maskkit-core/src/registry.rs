//! Per-origin mask and link bookkeeping.
//!
//! All mutations of mask lists and link edges go through this module, which
//! keeps the mirrored link invariant intact: an edge `from -> to` exists
//! exactly when `from ∈ to.links_from` and `to ∈ from.links_to`, and a live
//! session never survives the edge it depends on.

use crate::derivation::{self, MasterEntropy};
use crate::error::Error;
use crate::types::{Mask, Origin, WalletState};

/// Derives and appends the next mask for `origin`.
///
/// Returns the new identity id and the created mask. Mask indices are
/// append-only: this is the only place a mask is ever added, and nothing
/// ever removes one.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the identity index space is exhausted.
pub fn create_mask(
    state: &mut WalletState,
    master: &MasterEntropy,
    origin: &Origin,
) -> Result<(u32, Mask), Error> {
    let identity_id = next_identity_id(state, origin)?;
    let keypair = derivation::derive_keypair(master, origin, identity_id, None);
    let mask = Mask::from_public_key(&keypair.public_key());
    state.record_entry(origin).masks.push(mask.clone());
    tracing::debug!(origin = %origin, identity_id, "mask created");
    Ok((identity_id, mask))
}

/// Returns the mask addressed by `identity_id` under `origin`, creating it
/// when `identity_id` is exactly the next free index.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if `identity_id` skips past the end of
/// the mask list; indices stay dense and append-only.
pub fn ensure_mask(
    state: &mut WalletState,
    master: &MasterEntropy,
    origin: &Origin,
    identity_id: u32,
) -> Result<Mask, Error> {
    let existing = mask_count(state, origin);
    if identity_id < existing {
        let record = state.record(origin).expect("mask list is non-empty");
        Ok(record.masks[identity_id as usize].clone())
    } else if identity_id == existing {
        let (_, mask) = create_mask(state, master, origin)?;
        Ok(mask)
    } else {
        Err(Error::invalid_input(
            "identityId",
            format!("no mask at index {identity_id} for {origin}"),
        ))
    }
}

/// Renames the mask addressed by `identity_id` under `origin`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the pseudonym is blank or no such mask
/// exists.
pub fn edit_pseudonym(
    state: &mut WalletState,
    origin: &Origin,
    identity_id: u32,
    pseudonym: &str,
) -> Result<Mask, Error> {
    let pseudonym = pseudonym.trim();
    if pseudonym.is_empty() {
        return Err(Error::invalid_input("pseudonym", "must not be blank"));
    }
    let mask = state
        .record_mut(origin)
        .and_then(|record| record.masks.get_mut(identity_id as usize))
        .ok_or_else(|| {
            Error::invalid_input(
                "identityId",
                format!("no mask at index {identity_id} for {origin}"),
            )
        })?;
    mask.pseudonym = pseudonym.to_string();
    Ok(mask.clone())
}

/// Inserts the mirrored edge `from -> to`, granting `to` login access to
/// identities derived under `from`.
///
/// Idempotent: returns `true` when a new edge was inserted and `false` when
/// it already existed.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] on a self-link.
pub fn link(state: &mut WalletState, from: &Origin, to: &Origin) -> Result<bool, Error> {
    if from == to {
        return Err(Error::invalid_input(
            "origin",
            "an origin cannot link to itself",
        ));
    }
    let inserted_from = state.record_entry(to).links_from.insert(from.clone());
    let inserted_to = state.record_entry(from).links_to.insert(to.clone());
    debug_assert_eq!(inserted_from, inserted_to, "link mirror out of sync");
    if inserted_from {
        tracing::info!(from = %from, to = %to, "link created");
    }
    Ok(inserted_from)
}

/// Whether the edge `from -> to` exists.
#[must_use]
pub fn is_linked(state: &WalletState, from: &Origin, to: &Origin) -> bool {
    state
        .record(to)
        .is_some_and(|record| record.links_from.contains(from))
}

/// Removes the edges between `a` and `b` in both directions.
///
/// Atomic from the caller's perspective: both sides of each mirrored pair
/// go together, and any session on either origin whose derivation origin is
/// the counterpart is invalidated with the edge.
pub fn unlink_one(state: &mut WalletState, a: &Origin, b: &Origin) {
    let removed = remove_edge(state, a, b) | remove_edge(state, b, a);
    if removed {
        clear_dependent_session(state, a, b);
        clear_dependent_session(state, b, a);
        tracing::info!(a = %a, b = %b, "unlinked");
    }
}

/// Removes every edge incident to `origin`, in both directions.
pub fn unlink_all(state: &mut WalletState, origin: &Origin) {
    let partners: Vec<Origin> = state.record(origin).map_or_else(Vec::new, |record| {
        record
            .links_from
            .iter()
            .chain(record.links_to.iter())
            .cloned()
            .collect()
    });
    for partner in &partners {
        unlink_one(state, origin, partner);
    }
}

/// Every `(derivation_origin, identity_id, mask)` the user could log in
/// with on `origin`: its own masks plus the masks of each linked source.
#[must_use]
pub fn login_options(state: &WalletState, origin: &Origin) -> Vec<(Origin, u32, Mask)> {
    let mut options = Vec::new();
    collect_masks(state, origin, &mut options);
    if let Some(record) = state.record(origin) {
        for source in &record.links_from {
            collect_masks(state, source, &mut options);
        }
    }
    options
}

/// Checks the mirrored-edge invariant across the whole registry.
///
/// # Errors
///
/// Returns a description of the first dangling half-edge or self-link found.
pub fn verify_link_mirror(state: &WalletState) -> Result<(), String> {
    for (origin, record) in &state.origin_data {
        for from in &record.links_from {
            if from == origin {
                return Err(format!("self-link on {origin}"));
            }
            let mirrored = state
                .record(from)
                .is_some_and(|source| source.links_to.contains(origin));
            if !mirrored {
                return Err(format!("dangling edge {from} -> {origin}"));
            }
        }
        for to in &record.links_to {
            if to == origin {
                return Err(format!("self-link on {origin}"));
            }
            let mirrored = state
                .record(to)
                .is_some_and(|target| target.links_from.contains(origin));
            if !mirrored {
                return Err(format!("dangling edge {origin} -> {to}"));
            }
        }
    }
    Ok(())
}

fn mask_count(state: &WalletState, origin: &Origin) -> u32 {
    let len = state.record(origin).map_or(0, |record| record.masks.len());
    u32::try_from(len).expect("mask list bounded by u32 indices")
}

fn next_identity_id(state: &WalletState, origin: &Origin) -> Result<u32, Error> {
    let next = mask_count(state, origin);
    if next == u32::MAX {
        return Err(Error::invalid_input(
            "identityId",
            "identity index space exhausted",
        ));
    }
    Ok(next)
}

/// Removes the single edge `from -> to`; returns whether it existed.
fn remove_edge(state: &mut WalletState, from: &Origin, to: &Origin) -> bool {
    let removed_from = state
        .record_mut(to)
        .is_some_and(|record| record.links_from.remove(from));
    let removed_to = state
        .record_mut(from)
        .is_some_and(|record| record.links_to.remove(to));
    debug_assert_eq!(removed_from, removed_to, "link mirror out of sync");
    removed_from
}

/// Ends any session at `at` that derives under `derived_under`.
fn clear_dependent_session(state: &mut WalletState, at: &Origin, derived_under: &Origin) {
    if let Some(record) = state.record_mut(at) {
        let dependent = record
            .current_session
            .as_ref()
            .is_some_and(|session| session.derivation_origin == *derived_under);
        if dependent {
            record.current_session = None;
            tracing::info!(origin = %at, "session invalidated by unlink");
        }
    }
}

fn collect_masks(state: &WalletState, origin: &Origin, into: &mut Vec<(Origin, u32, Mask)>) {
    if let Some(record) = state.record(origin) {
        for (index, mask) in record.masks.iter().enumerate() {
            let identity_id = u32::try_from(index).expect("mask list bounded by u32 indices");
            into.push((origin.clone(), identity_id, mask.clone()));
        }
    }
}
