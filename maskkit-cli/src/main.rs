//! Developer CLI for MaskKit.
//!
//! Drives the wallet core the way the extension host would: a file-backed
//! state store, hex-encoded master entropy on disk, and terminal
//! confirmation prompts standing in for the extension's dialogs.

mod prompt;
mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use eyre::{bail, eyre, Context, Result};
use rand::RngCore;

use maskkit_core::platform::{AutoApprove, ConfirmationPrompt, StateStore};
use maskkit_core::{Call, MaskWallet, MasterEntropy, Origin, WalletState};

use crate::prompt::TerminalPrompt;
use crate::store::FileStateStore;

const ENTROPY_FILE: &str = "entropy.hex";
const STATE_FILE: &str = "state.cbor";

#[derive(Parser)]
#[command(name = "maskkit", about = "MaskKit origin-scoped identity wallet", version)]
struct Cli {
    /// Directory holding the entropy and state files
    #[arg(long, env = "MASKKIT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Origin allowed to invoke protected methods
    #[arg(
        long,
        env = "MASKKIT_TRUSTED_ORIGIN",
        default_value = "https://wallet.maskkit.dev"
    )]
    trusted_origin: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate master entropy for a fresh wallet
    Init {
        /// Overwrite existing entropy, abandoning every derived identity
        #[arg(long)]
        force: bool,
    },
    /// Dispatch one RPC call and print the reply
    Call {
        /// Caller origin, as the host sandbox would report it
        #[arg(long)]
        caller: String,
        /// Wire method name, e.g. `protected.login`
        method: String,
        /// JSON body; omitted means `null`
        body: Option<String>,
        /// Approve confirmation prompts without asking
        #[arg(long)]
        yes: bool,
    },
    /// Print a summary of the persisted wallet state
    Show,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir)?;

    match cli.command {
        Commands::Init { force } => init(&data_dir, force),
        Commands::Call {
            caller,
            method,
            body,
            yes,
        } => dispatch(&data_dir, &cli.trusted_origin, &caller, &method, body.as_deref(), yes),
        Commands::Show => show(&data_dir),
    }
}

fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    dirs::data_dir()
        .map(|dir| dir.join("maskkit"))
        .ok_or_else(|| eyre!("no data directory on this platform; pass --data-dir"))
}

fn init(data_dir: &Path, force: bool) -> Result<()> {
    let path = data_dir.join(ENTROPY_FILE);
    if path.exists() && !force {
        bail!(
            "{} already exists; --force replaces it and abandons every derived identity",
            path.display()
        );
    }
    std::fs::create_dir_all(data_dir)
        .wrap_err_with(|| format!("creating {}", data_dir.display()))?;

    let mut entropy = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut entropy);
    std::fs::write(&path, hex::encode(entropy))
        .wrap_err_with(|| format!("writing {}", path.display()))?;

    println!("wrote {}", path.display());
    Ok(())
}

fn dispatch(
    data_dir: &Path,
    trusted_origin: &str,
    caller: &str,
    method: &str,
    body: Option<&str>,
    yes: bool,
) -> Result<()> {
    let caller = Origin::parse(caller).wrap_err("invalid --caller origin")?;
    let trusted = Origin::parse(trusted_origin).wrap_err("invalid trusted origin")?;
    let body = match body {
        None => serde_json::Value::Null,
        Some(text) => serde_json::from_str(text).wrap_err("body is not valid JSON")?,
    };

    let state_path = data_dir.join(STATE_FILE);
    tracing::debug!(path = %state_path.display(), "using state file");
    let store: Arc<dyn StateStore> = Arc::new(FileStateStore::new(state_path));
    let prompt: Arc<dyn ConfirmationPrompt> = if yes {
        Arc::new(AutoApprove)
    } else {
        Arc::new(TerminalPrompt)
    };
    let wallet = MaskWallet::new(load_entropy(data_dir)?, trusted, store, prompt);

    let reply = wallet.handle_envelope(&caller, &Call::new(method, body));
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}

fn show(data_dir: &Path) -> Result<()> {
    let store = FileStateStore::new(data_dir.join(STATE_FILE));
    let Some(bytes) = store.load()? else {
        println!("no wallet state at {}", data_dir.display());
        return Ok(());
    };
    let state = WalletState::decode(&bytes)?;

    for (origin, record) in &state.origin_data {
        println!("{origin}");
        for (index, mask) in record.masks.iter().enumerate() {
            println!("  mask {index}: {} ({})", mask.pseudonym, mask.principal);
        }
        for source in &record.links_from {
            println!("  linked from {source}");
        }
        for target in &record.links_to {
            println!("  linked to {target}");
        }
        if let Some(session) = &record.current_session {
            println!(
                "  session: identity {} under {} since {} ms",
                session.identity_id, session.derivation_origin, session.timestamp_ms
            );
        }
    }
    Ok(())
}

fn load_entropy(data_dir: &Path) -> Result<MasterEntropy> {
    let path = data_dir.join(ENTROPY_FILE);
    let text = std::fs::read_to_string(&path)
        .wrap_err_with(|| format!("reading {}; run `maskkit init` first", path.display()))?;
    let bytes = hex::decode(text.trim()).wrap_err("entropy file is not valid hex")?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| eyre!("entropy file must hold exactly 32 bytes"))?;
    Ok(MasterEntropy::from_bytes(bytes))
}
