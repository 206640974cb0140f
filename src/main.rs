//! Walletmux - supervisor and spend engine for a multi-asset SPV wallet daemon
//!
//! # WARNING
//! - Sends move real coins. Broadcast transactions cannot be recalled.
//! - A failed send is never retried automatically; retry is a user decision.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, warn};

// Use the library crate
use walletmux::cli::commands;
use walletmux::config::Config;

/// Walletmux - multi-asset SPV wallet daemon supervisor and spend engine
#[derive(Parser)]
#[command(name = "walletmux")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show daemon status (install, settings, process, RPC - reported separately)
    Status,

    /// Probe the administrative RPC endpoint
    Health,

    /// Start the wallet daemon (no-op if its RPC already answers)
    Start {
        /// Wallet password, passed to the daemon on the command line
        #[arg(long)]
        password: Option<String>,
    },

    /// Stop the daemon process held by this instance
    Stop,

    /// Bootstrap the daemon's default wallet
    CreateWallet {
        /// Password for the new wallet
        password: String,
    },

    /// Enable and auto-configure every asset wallet
    EnableWallets,

    /// Load wallet confs, self-healing the master conf if needed
    Confs {
        /// Ticker→port manifest applied to per-asset confs
        #[arg(long)]
        manifest: Option<String>,
    },

    /// Show balances (all assets when no ticker is given)
    Balance {
        /// Asset ticker, e.g. BTC
        ticker: Option<String>,
    },

    /// Send coins to an address
    Send {
        /// Asset ticker, e.g. BTC
        ticker: String,

        /// Destination address
        address: String,

        /// Amount in display units
        amount: String,

        /// Free-form note attached to the recipient
        #[arg(long, default_value = "")]
        description: String,

        /// Take the network fee out of the sent amount
        #[arg(long)]
        subtract_fees: bool,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,

        /// Fund and print the draft only, don't broadcast
        #[arg(long)]
        dry_run: bool,
    },

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("walletmux=info".parse().unwrap()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    startup_checks(&config);

    // Execute command
    let result = match cli.command {
        Commands::Status => commands::status(&config).await,
        Commands::Health => commands::health(&config).await,
        Commands::Start { password } => commands::start(&config, password.as_deref()).await,
        Commands::Stop => commands::stop(&config).await,
        Commands::CreateWallet { password } => commands::create_wallet(&config, &password).await,
        Commands::EnableWallets => commands::enable_wallets(&config).await,
        Commands::Confs { manifest } => commands::confs(&config, manifest.as_deref()).await,
        Commands::Balance { ticker } => commands::balance(&config, ticker.as_deref()).await,
        Commands::Send {
            ticker,
            address,
            amount,
            description,
            subtract_fees,
            force,
            dry_run,
        } => {
            commands::send(
                &config,
                &ticker,
                &address,
                &amount,
                &description,
                subtract_fees,
                force,
                dry_run,
            )
            .await
        }
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Warn early about a daemon that is not where the config says it is.
/// Not fatal here: `status` must still be able to report "not installed".
fn startup_checks(config: &Config) {
    if !config.daemon.base_dir.is_dir() {
        warn!(
            "Daemon base directory not found: {} (is the daemon installed?)",
            config.daemon.base_dir.display()
        );
    }
}
