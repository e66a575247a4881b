//! tx-sender - sign and broadcast NEAR transactions from the command line
//!
//! Loads account and node settings from a TOML file (plus `.env` and
//! `NEAR_*` environment overrides), signs with the configured key and prints
//! the final execution outcome as JSON.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tx_sender::types::Action;
use tx_sender::{SendOptions, SenderConfig, TransactionSender};

/// 30 Tgas
const DEFAULT_GAS: u64 = 30_000_000_000_000;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print failed outcomes instead of exiting with an error
    #[arg(long, global = true)]
    return_error: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the access key the configured signer would use
    AccessKey,

    /// Transfer yoctoNEAR to another account
    Transfer {
        #[arg(long)]
        receiver: String,

        /// Amount in yoctoNEAR
        #[arg(long)]
        amount: u128,
    },

    /// Call a contract method
    Call {
        #[arg(long)]
        receiver: String,

        #[arg(long)]
        method: String,

        /// JSON arguments
        #[arg(long, default_value = "{}")]
        args: String,

        #[arg(long, default_value_t = DEFAULT_GAS)]
        gas: u64,

        /// Attached deposit in yoctoNEAR
        #[arg(long, default_value_t = 0)]
        deposit: u128,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    let config = load_config(&args.config)?;
    let sender = TransactionSender::from_config(&config).context("Failed to create sender")?;
    info!(
        account_id = %sender.account_id(),
        network_id = %sender.network_id(),
        rpc_url = %config.rpc.url,
        "Sender ready"
    );

    match args.command {
        Command::AccessKey => {
            match sender
                .find_access_key(sender.account_id(), &[])
                .await
                .context("Failed to resolve access key")?
            {
                Some(resolved) => {
                    let view = serde_json::json!({
                        "public_key": resolved.public_key.to_string(),
                        "access_key": resolved.access_key,
                    });
                    println!("{}", serde_json::to_string_pretty(&view)?);
                }
                None => println!(
                    "no matching key for {} on {}",
                    sender.account_id(),
                    sender.network_id()
                ),
            }
        }
        Command::Transfer { receiver, amount } => {
            let options = SendOptions::new(receiver, vec![Action::transfer(amount)])
                .return_error(args.return_error);
            send(&sender, options).await?;
        }
        Command::Call {
            receiver,
            method,
            args: call_args,
            gas,
            deposit,
        } => {
            let parsed: serde_json::Value = serde_json::from_str(&call_args)
                .with_context(|| format!("--args is not valid JSON: {}", call_args))?;
            let action = Action::function_call(method, serde_json::to_vec(&parsed)?, gas, deposit);
            let options = SendOptions::new(receiver, vec![action]).return_error(args.return_error);
            send(&sender, options).await?;
        }
    }

    Ok(())
}

async fn send(sender: &TransactionSender, options: SendOptions) -> Result<()> {
    let receiver_id = options.receiver_id.clone();
    let outcome = sender
        .sign_and_send_transaction(options)
        .await
        .with_context(|| format!("Transaction to {} failed", receiver_id))?;
    if outcome.is_failure() {
        warn!(transaction_id = %outcome.transaction_outcome.id, "Transaction executed with a failure");
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// Initialize logging system
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "tx_sender=debug,info"
    } else {
        "tx_sender=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<SenderConfig> {
    if std::path::Path::new(path).exists() {
        SenderConfig::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        Ok(SenderConfig::from_env())
    }
}
