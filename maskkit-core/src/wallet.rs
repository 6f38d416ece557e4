//! The wallet facade: access gate, dispatch and the load-mutate-persist
//! cycle.
//!
//! Each inbound call executes as one logical unit under a single lock:
//! load the state tree, validate, transform, persist, respond. Handlers
//! work on a loaded copy, and the copy is only written back after the
//! handler succeeds, so a failed call never leaves a partial mutation
//! behind. The user-confirmation prompt suspends the call before any of
//! its mutations are applied; a decline resolves to `false`, not an error.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;

use crate::derivation::MasterEntropy;
use crate::error::Error;
use crate::gate::{self, Method};
use crate::platform::{Approval, ConfirmationPrompt, ConfirmationRequest, StateStore};
use crate::registry;
use crate::rpc::{
    self, AddParams, Call, EditPseudonymParams, GetLoginOptionsParams, GetPublicKeyParams,
    LinkRequestParams, LinksView, LoginOptionView, LoginParams, MaskView, PublicKeyView, Reply,
    SessionView, SignParams, SignatureView, StopSessionParams, UnlinkAllParams, UnlinkOneParams,
};
use crate::session;
use crate::signer;
use crate::types::{Origin, WalletState};

/// Result of one dispatched handler: the wire payload plus whether the
/// state copy must be written back.
struct Outcome {
    value: serde_json::Value,
    persist: bool,
}

impl Outcome {
    const fn mutated(value: serde_json::Value) -> Self {
        Self {
            value,
            persist: true,
        }
    }

    const fn read(value: serde_json::Value) -> Self {
        Self {
            value,
            persist: false,
        }
    }
}

/// The wallet backend; one instance serves the whole extension process.
pub struct MaskWallet {
    master: MasterEntropy,
    trusted_origin: Origin,
    store: Arc<dyn StateStore>,
    prompt: Arc<dyn ConfirmationPrompt>,
    /// Serializes the load-mutate-persist cycle across concurrent calls.
    state_lock: Mutex<()>,
}

impl MaskWallet {
    /// Creates a wallet over host-supplied entropy, storage and prompt.
    ///
    /// `trusted_origin` is the one origin allowed to invoke `protected.*`
    /// methods — the wallet's own management website.
    #[must_use]
    pub fn new(
        master: MasterEntropy,
        trusted_origin: Origin,
        store: Arc<dyn StateStore>,
        prompt: Arc<dyn ConfirmationPrompt>,
    ) -> Self {
        Self {
            master,
            trusted_origin,
            store,
            prompt,
            state_lock: Mutex::new(()),
        }
    }

    /// Handles one call and wraps the outcome for the wire.
    #[must_use]
    pub fn handle_envelope(&self, caller: &Origin, call: &Call) -> Reply {
        Reply::from_result(self.handle(caller, call))
    }

    /// Handles one inbound call.
    ///
    /// The gate decision comes first and is final; afterwards the body is
    /// parsed and the method dispatched against a freshly loaded state.
    ///
    /// # Errors
    ///
    /// Returns the protocol error that terminated the call; see
    /// [`Error::code`] for the wire mapping.
    pub fn handle(&self, caller: &Origin, call: &Call) -> Result<serde_json::Value, Error> {
        let method = Method::parse(&call.method)?;
        gate::authorize(method, caller, &self.trusted_origin)?;
        tracing::debug!(origin = %caller, method = method.wire_name(), "dispatching");

        let _guard = self
            .state_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut state = self.load_state()?;
        let outcome = self.dispatch(method, caller, call.params.body.clone(), &mut state)?;
        if outcome.persist {
            self.persist(&state)?;
        }
        Ok(outcome.value)
    }

    fn load_state(&self) -> Result<WalletState, Error> {
        match self.store.load()? {
            None => Ok(WalletState::default()),
            Some(bytes) => Ok(WalletState::decode(&bytes)?),
        }
    }

    fn persist(&self, state: &WalletState) -> Result<(), Error> {
        debug_assert_eq!(registry::verify_link_mirror(state), Ok(()));
        let bytes = state.encode()?;
        self.store.save(&bytes)?;
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn dispatch(
        &self,
        method: Method,
        caller: &Origin,
        body: serde_json::Value,
        state: &mut WalletState,
    ) -> Result<Outcome, Error> {
        match method {
            Method::Add => {
                let params: AddParams = rpc::parse_body(body)?;
                let (identity_id, mask) =
                    registry::create_mask(state, &self.master, &params.origin)?;
                let view = MaskView {
                    identity_id,
                    pseudonym: mask.pseudonym,
                    principal: mask.principal,
                };
                Ok(Outcome::mutated(rpc::to_wire(&view)?))
            }
            Method::Login => {
                let params: LoginParams = rpc::parse_body(body)?;
                let session = session::login(
                    state,
                    &self.master,
                    &params.origin,
                    params.identity_id,
                    params.with_linked_origin.as_ref(),
                )?;
                let view = SessionView {
                    identity_id: session.identity_id,
                    derivation_origin: session.derivation_origin,
                    timestamp_ms: session.timestamp_ms,
                };
                Ok(Outcome::mutated(rpc::to_wire(&view)?))
            }
            Method::GetLoginOptions => {
                let params: GetLoginOptionsParams = rpc::parse_body(body)?;
                let options: Vec<LoginOptionView> = registry::login_options(state, &params.origin)
                    .into_iter()
                    .map(|(derivation_origin, identity_id, mask)| LoginOptionView {
                        derivation_origin,
                        identity_id,
                        pseudonym: mask.pseudonym,
                        principal: mask.principal,
                    })
                    .collect();
                Ok(Outcome::read(rpc::to_wire(&options)?))
            }
            Method::EditPseudonym => {
                let params: EditPseudonymParams = rpc::parse_body(body)?;
                let mask = registry::edit_pseudonym(
                    state,
                    &params.origin,
                    params.identity_id,
                    &params.pseudonym,
                )?;
                let view = MaskView {
                    identity_id: params.identity_id,
                    pseudonym: mask.pseudonym,
                    principal: mask.principal,
                };
                Ok(Outcome::mutated(rpc::to_wire(&view)?))
            }
            Method::StopSession => {
                let params: StopSessionParams = rpc::parse_body(body)?;
                session::logout(state, &params.origin);
                Ok(Outcome::mutated(json!(true)))
            }
            Method::UnlinkOne => {
                let params: UnlinkOneParams = rpc::parse_body(body)?;
                registry::unlink_one(state, &params.origin, &params.linked_origin);
                Ok(Outcome::mutated(json!(true)))
            }
            Method::UnlinkAll => {
                let params: UnlinkAllParams = rpc::parse_body(body)?;
                registry::unlink_all(state, &params.origin);
                Ok(Outcome::mutated(json!(true)))
            }
            Method::Sign => {
                let params: SignParams = rpc::parse_body(body)?;
                let signature = signer::sign_request(
                    state,
                    &self.master,
                    caller,
                    &params.request,
                    params.salt.as_deref(),
                )?;
                let view = SignatureView {
                    signature: hex::encode(signature),
                };
                Ok(Outcome::read(rpc::to_wire(&view)?))
            }
            Method::GetPublicKey => {
                let params: GetPublicKeyParams = rpc::parse_body(body)?;
                let public_key =
                    signer::get_public_key(state, &self.master, caller, params.salt.as_deref())?;
                let view = PublicKeyView {
                    public_key: hex::encode(public_key),
                };
                Ok(Outcome::read(rpc::to_wire(&view)?))
            }
            Method::RequestLogout => {
                session::logout(state, caller);
                Ok(Outcome::mutated(json!(true)))
            }
            Method::RequestLink => {
                let params: LinkRequestParams = rpc::parse_body(body)?;
                self.request_link(state, caller, &params.with_origin)
            }
            Method::RequestUnlink => {
                let params: LinkRequestParams = rpc::parse_body(body)?;
                self.request_unlink(state, caller, &params.with_origin)
            }
            Method::GetLinks => {
                let view = state.record(caller).map_or_else(
                    || LinksView {
                        links_from: Vec::new(),
                        links_to: Vec::new(),
                    },
                    |record| LinksView {
                        links_from: record.links_from.iter().cloned().collect(),
                        links_to: record.links_to.iter().cloned().collect(),
                    },
                );
                Ok(Outcome::read(rpc::to_wire(&view)?))
            }
            Method::SessionExists => {
                Ok(Outcome::read(json!(session::session_exists(state, caller))))
            }
        }
    }

    /// `public.requestLink`: after user approval, gives the caller login
    /// access to identities derived under `with_origin`.
    fn request_link(
        &self,
        state: &mut WalletState,
        caller: &Origin,
        with_origin: &Origin,
    ) -> Result<Outcome, Error> {
        if with_origin == caller {
            return Err(Error::invalid_input(
                "withOrigin",
                "an origin cannot link to itself",
            ));
        }
        // Delegating the wallet origin's own identities to a website would
        // punch through the trust boundary the gate exists to hold.
        if *with_origin == self.trusted_origin || *caller == self.trusted_origin {
            return Err(Error::SecurityViolation {
                reason: "the wallet origin cannot take part in links".to_string(),
            });
        }
        if registry::is_linked(state, with_origin, caller) {
            return Err(Error::AlreadyLinked {
                from: with_origin.clone(),
                to: caller.clone(),
            });
        }

        let request = ConfirmationRequest::Link {
            origin: caller.clone(),
            with_origin: with_origin.clone(),
        };
        match self.prompt.confirm(&request) {
            Approval::Declined => Ok(Outcome::read(json!(false))),
            Approval::Approved => {
                registry::link(state, with_origin, caller)?;
                Ok(Outcome::mutated(json!(true)))
            }
        }
    }

    /// `public.requestUnlink`: after user approval, removes the links
    /// between the caller and `with_origin`. With no link in place the call
    /// resolves immediately; there is nothing to ask the user about.
    fn request_unlink(
        &self,
        state: &mut WalletState,
        caller: &Origin,
        with_origin: &Origin,
    ) -> Result<Outcome, Error> {
        let linked = registry::is_linked(state, with_origin, caller)
            || registry::is_linked(state, caller, with_origin);
        if !linked {
            return Ok(Outcome::read(json!(true)));
        }

        let request = ConfirmationRequest::Unlink {
            origin: caller.clone(),
            with_origin: with_origin.clone(),
        };
        match self.prompt.confirm(&request) {
            Approval::Declined => Ok(Outcome::read(json!(false))),
            Approval::Approved => {
                registry::unlink_one(state, caller, with_origin);
                Ok(Outcome::mutated(json!(true)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::platform::{AutoApprove, AutoDecline, MemoryStateStore, RecordingPrompt};

    const TRUSTED: &str = "https://wallet.maskkit.dev";

    fn origin(value: &str) -> Origin {
        Origin::parse(value).expect("valid origin")
    }

    fn wallet_with(prompt: Arc<dyn ConfirmationPrompt>) -> MaskWallet {
        MaskWallet::new(
            MasterEntropy::from_bytes([0x42u8; 32]),
            origin(TRUSTED),
            Arc::new(MemoryStateStore::new()),
            prompt,
        )
    }

    fn wallet() -> MaskWallet {
        wallet_with(Arc::new(AutoApprove))
    }

    #[test]
    fn test_protected_method_needs_trusted_caller() {
        let wallet = wallet();
        let call = Call::new(
            "protected.login",
            json!({"origin": "https://site.example", "identityId": 0}),
        );

        let err = wallet.handle(&origin("https://site.example"), &call).unwrap_err();
        assert_eq!(err.code(), "protected_method_violation");

        wallet.handle(&origin(TRUSTED), &call).unwrap();
    }

    #[test]
    fn test_unknown_method_and_bad_body() {
        let wallet = wallet();
        let trusted = origin(TRUSTED);

        let err = wallet
            .handle(&trusted, &Call::new("protected.selfDestruct", json!(null)))
            .unwrap_err();
        assert_eq!(err.code(), "unknown_method");

        let err = wallet
            .handle(&trusted, &Call::new("protected.login", json!({"identityId": 0})))
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn test_failed_call_persists_nothing() {
        let wallet = wallet();
        let trusted = origin(TRUSTED);

        // Unauthorized link attempt must not create the record it touched.
        let call = Call::new(
            "protected.login",
            json!({
                "origin": "https://site.example",
                "identityId": 0,
                "withLinkedOrigin": "https://source.example"
            }),
        );
        wallet.handle(&trusted, &call).unwrap_err();

        let reply = wallet
            .handle(
                &origin("https://site.example"),
                &Call::new("public.sessionExists", json!(null)),
            )
            .unwrap();
        assert_eq!(reply, json!(false));
        assert!(wallet.store.load().unwrap().is_none());
    }

    #[test]
    fn test_request_link_declined_is_false_not_error() {
        let wallet = wallet_with(Arc::new(AutoDecline));
        let site = origin("https://site.example");

        let reply = wallet
            .handle(
                &site,
                &Call::new("public.requestLink", json!({"withOrigin": "https://source.example"})),
            )
            .unwrap();
        assert_eq!(reply, json!(false));
        // Nothing was linked and nothing was persisted.
        assert!(wallet.store.load().unwrap().is_none());
    }

    #[test]
    fn test_request_link_prompts_with_both_origins() {
        let prompt = Arc::new(RecordingPrompt::new(Approval::Approved));
        let wallet = wallet_with(Arc::clone(&prompt) as Arc<dyn ConfirmationPrompt>);
        let site = origin("https://site.example");
        let source = origin("https://source.example");

        let reply = wallet
            .handle(
                &site,
                &Call::new("public.requestLink", json!({"withOrigin": "https://source.example"})),
            )
            .unwrap();
        assert_eq!(reply, json!(true));
        assert_eq!(
            prompt.requests(),
            vec![ConfirmationRequest::Link {
                origin: site,
                with_origin: source,
            }]
        );
    }

    #[test]
    fn test_request_link_rejects_duplicates_before_prompting() {
        let prompt = Arc::new(RecordingPrompt::new(Approval::Approved));
        let wallet = wallet_with(Arc::clone(&prompt) as Arc<dyn ConfirmationPrompt>);
        let site = origin("https://site.example");
        let call = Call::new("public.requestLink", json!({"withOrigin": "https://source.example"}));

        wallet.handle(&site, &call).unwrap();
        let err = wallet.handle(&site, &call).unwrap_err();
        assert_eq!(err.code(), "already_linked");
        // The user saw exactly one prompt, for the first request.
        assert_eq!(prompt.requests().len(), 1);
    }

    #[test]
    fn test_wallet_origin_cannot_take_part_in_links() {
        let wallet = wallet();
        let site = origin("https://site.example");

        let err = wallet
            .handle(
                &site,
                &Call::new("public.requestLink", json!({"withOrigin": TRUSTED})),
            )
            .unwrap_err();
        assert_eq!(err.code(), "security_violation");
    }

    #[test]
    fn test_request_unlink_without_link_skips_prompt() {
        let prompt = Arc::new(RecordingPrompt::new(Approval::Approved));
        let wallet = wallet_with(Arc::clone(&prompt) as Arc<dyn ConfirmationPrompt>);
        let site = origin("https://site.example");

        let reply = wallet
            .handle(
                &site,
                &Call::new("public.requestUnlink", json!({"withOrigin": "https://other.example"})),
            )
            .unwrap();
        assert_eq!(reply, json!(true));
        assert!(prompt.requests().is_empty());
    }

    #[test]
    fn test_handle_envelope_wraps_errors() {
        let wallet = wallet();
        let reply = wallet.handle_envelope(
            &origin("https://site.example"),
            &Call::new("public.sign", json!({"request": {}})),
        );
        let wire = serde_json::to_value(&reply).unwrap();
        assert_eq!(wire["error"]["code"], "unauthorized");
    }
}
