//! In-memory implementations of the platform traits for testing.
//!
//! These implementations are NOT secure for production use: nothing is
//! encrypted and nothing survives the process. They exist so the protocol
//! core can be exercised without a real host.

#![allow(clippy::missing_panics_doc)]

use std::sync::Mutex;

use super::{
    Approval, ConfirmationPrompt, ConfirmationRequest, StateStore, StoreResult,
};

/// In-memory state store backed by a mutex-guarded blob.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    blob: Mutex<Option<Vec<u8>>>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> StoreResult<Option<Vec<u8>>> {
        Ok(self
            .blob
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    fn save(&self, bytes: &[u8]) -> StoreResult<()> {
        *self
            .blob
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(bytes.to_vec());
        Ok(())
    }
}

/// Prompt that approves every request without asking anyone.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

impl ConfirmationPrompt for AutoApprove {
    fn confirm(&self, _request: &ConfirmationRequest) -> Approval {
        Approval::Approved
    }
}

/// Prompt that declines every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoDecline;

impl ConfirmationPrompt for AutoDecline {
    fn confirm(&self, _request: &ConfirmationRequest) -> Approval {
        Approval::Declined
    }
}

/// Prompt that records every request it is shown and answers with a fixed
/// outcome. Lets tests assert what the user would have been asked.
#[derive(Debug)]
pub struct RecordingPrompt {
    outcome: Approval,
    seen: Mutex<Vec<ConfirmationRequest>>,
}

impl RecordingPrompt {
    /// Creates a prompt that always answers `outcome`.
    #[must_use]
    pub const fn new(outcome: Approval) -> Self {
        Self {
            outcome,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Returns the requests shown so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<ConfirmationRequest> {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl ConfirmationPrompt for RecordingPrompt {
    fn confirm(&self, request: &ConfirmationRequest) -> Approval {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(request.clone());
        self.outcome
    }
}
