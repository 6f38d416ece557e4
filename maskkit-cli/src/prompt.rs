//! Terminal stand-in for the extension's confirmation dialogs.

use std::io::{self, BufRead, Write};

use maskkit_core::platform::{Approval, ConfirmationPrompt, ConfirmationRequest};

/// Asks for y/N confirmation on the terminal. Anything but an explicit yes
/// declines, matching the dialog's safe default.
pub struct TerminalPrompt;

impl ConfirmationPrompt for TerminalPrompt {
    fn confirm(&self, request: &ConfirmationRequest) -> Approval {
        let question = match request {
            ConfirmationRequest::Link { origin, with_origin } => {
                format!("Allow {origin} to log in with identities from {with_origin}?")
            }
            ConfirmationRequest::Unlink { origin, with_origin } => {
                format!("Remove the link between {origin} and {with_origin}?")
            }
        };
        eprint!("{question} [y/N] ");
        let _ = io::stderr().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return Approval::Declined;
        }
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Approval::Approved,
            _ => Approval::Declined,
        }
    }
}
