use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::capture::CapturePipeline;
use crate::config::BridgeConfig;
use crate::gateway::Gateway;
use crate::host::DesktopHost;
use crate::protocol::{Direction, EntryType, TradeDetails};
use crate::router::Mediator;
use crate::store::{FileTokenStore, TokenStore};
use crate::verify::VerificationClient;

#[derive(Parser)]
#[command(name = "tradebridge")]
#[command(about = "Background mediator for the trade-journal browser extension")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the mediator service (default when no command is given)
    Serve {
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Show resolved configuration
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },
    /// Inspect or manage the stored auth token
    Auth {
        #[command(subcommand)]
        auth_command: AuthCommands,
    },
    /// Capture the visible surface and journal it immediately
    Capture {
        /// Instrument pair, e.g. EURUSD
        #[arg(long)]
        pair: String,
        /// Chart timeframe, e.g. 4h
        #[arg(long)]
        timeframe: String,
        /// Strategy ID the capture belongs to
        #[arg(long = "strategy")]
        strategy_id: String,
        /// Strategy component, e.g. breakout
        #[arg(long = "component", default_value = "")]
        strategy_component: String,
        #[arg(long, default_value = "")]
        notes: String,
        /// Entry type: setup or outcome
        #[arg(long = "entry-type", default_value = "setup")]
        entry_type: String,
        /// Trade direction: long or short
        #[arg(long)]
        direction: Option<String>,
        #[arg(long = "entry-price")]
        entry_price: Option<String>,
        #[arg(long = "stop-loss")]
        stop_loss: Option<String>,
        #[arg(long = "take-profit")]
        take_profit: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show resolved configuration
    Show,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Check whether the stored token verifies against the backend
    Status,
    /// Store a token obtained from the web application
    SetToken {
        /// The token value
        token: String,
    },
    /// Clear the stored token (sign out)
    Clear,
}

pub async fn handle_cli_command(command: Commands) -> Result<()> {
    match command {
        Commands::Serve { port } => run_serve(port).await,
        Commands::Config { config_command } => match config_command {
            ConfigCommands::Show => {
                let config = BridgeConfig::load()?;
                println!("{}", config.display());
                Ok(())
            }
        },
        Commands::Auth { auth_command } => handle_auth_command(auth_command).await,
        Commands::Capture {
            pair,
            timeframe,
            strategy_id,
            strategy_component,
            notes,
            entry_type,
            direction,
            entry_price,
            stop_loss,
            take_profit,
        } => {
            let entry_type = match entry_type.as_str() {
                "setup" => EntryType::Setup,
                "outcome" => EntryType::Outcome,
                other => bail!("Unknown entry type '{}' (expected setup or outcome)", other),
            };
            let direction = match direction.as_deref() {
                None => None,
                Some("long") => Some(Direction::Long),
                Some("short") => Some(Direction::Short),
                Some(other) => bail!("Unknown direction '{}' (expected long or short)", other),
            };
            let details = TradeDetails {
                pair,
                timeframe,
                strategy_id,
                strategy_component,
                notes,
                entry_type,
                direction,
                entry_price,
                stop_loss,
                take_profit,
            };
            run_capture(&details).await
        }
    }
}

/// Run the full pipeline once from the terminal: acquire, resolve, submit.
async fn run_capture(details: &TradeDetails) -> Result<()> {
    let config = BridgeConfig::load()?;
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(FileTokenStore::default_path()));
    let gateway = Arc::new(Gateway::new(&config.api_base_url, store));
    let host = Arc::new(DesktopHost::new(&config.panel_url));
    let pipeline = CapturePipeline::new(gateway, host);

    let timestamp = chrono::Utc::now().to_rfc3339();
    let result = pipeline.run(details, &timestamp).await;
    if result.success {
        println!(
            "Journal entry created: journal {} / trade {}",
            result.journal_id.unwrap_or_default(),
            result.trade_id.unwrap_or_default()
        );
        Ok(())
    } else {
        bail!(result.error.unwrap_or_else(|| "Capture failed".to_string()))
    }
}

async fn handle_auth_command(command: AuthCommands) -> Result<()> {
    let store = FileTokenStore::new(FileTokenStore::default_path());
    match command {
        AuthCommands::Status => {
            let Some(token) = store.load() else {
                println!("Not authenticated (no stored token)");
                return Ok(());
            };
            let config = BridgeConfig::load()?;
            let verifier = VerificationClient::new(&config.verify_url());
            let verification = verifier.verify(&token).await;
            if verification.authenticated {
                println!(
                    "Authenticated as {} <{}>",
                    verification.user_id.unwrap_or_default(),
                    verification.email.unwrap_or_default()
                );
            } else {
                println!("Stored token did not verify");
            }
            Ok(())
        }
        AuthCommands::SetToken { token } => {
            store.save(&token)?;
            println!("Token stored");
            Ok(())
        }
        AuthCommands::Clear => {
            store.clear()?;
            println!("Token cleared");
            Ok(())
        }
    }
}

/// Build the mediator from on-disk config and serve until interrupted.
pub async fn run_serve(port_override: Option<u16>) -> Result<()> {
    let config = BridgeConfig::load()?;
    let port = port_override.unwrap_or(config.listen_port);
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(FileTokenStore::default_path()));
    let host = Arc::new(DesktopHost::new(&config.panel_url));
    let mediator = Arc::new(Mediator::new(config, store, host));
    crate::server::run(mediator, port).await
}
