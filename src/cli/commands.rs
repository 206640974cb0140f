//! CLI command implementations

use anyhow::Result;
use dialoguer::Confirm;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::config::Config;
use crate::daemon::conf::{self, ConfReport};
use crate::error::Error;
use crate::daemon::supervisor::Supervisor;
use crate::rpc::{RpcClient, RpcEndpoint};
use crate::tx::{Draft, Recipient};
use crate::wallet::{AssetWallet, WalletFleet};

/// Show daemon status - the four signals side by side, never collapsed
pub async fn status(config: &Config) -> Result<()> {
    let supervisor = build_supervisor(config)?;
    let status = supervisor.status().await;

    println!("\n=== DAEMON STATUS ===\n");
    println!("Installed:      {}", yes_no(status.installed));
    println!("Settings:       {}", yes_no(status.has_settings));
    println!("Local process:  {}", yes_no(status.process_alive));
    println!("RPC answering:  {}", yes_no(status.rpc_healthy));

    if status.rpc_healthy && !status.process_alive {
        println!("\nThe daemon answers RPC but was not started by this instance.");
    }
    if status.process_alive && !status.rpc_healthy {
        println!("\nThe local daemon process is alive but its RPC is not answering yet.");
    }

    Ok(())
}

/// Probe the administrative RPC endpoint
pub async fn health(config: &Config) -> Result<()> {
    println!("\n=== HEALTH CHECK ===\n");

    print!("Master RPC... ");
    let endpoint = admin_endpoint(config)?;
    let client = RpcClient::new(endpoint, config.rpc.timeout_ms)?;

    let started = std::time::Instant::now();
    match client.help().await {
        Ok(_) => {
            println!("OK ({}ms)", started.elapsed().as_millis());
        }
        Err(e) => {
            println!("FAILED: {}", e);
            anyhow::bail!("master RPC endpoint is not answering");
        }
    }

    Ok(())
}

/// Start the wallet daemon
pub async fn start(config: &Config, password: Option<&str>) -> Result<()> {
    let supervisor = build_supervisor(config)?;

    info!("Starting wallet daemon...");
    if supervisor.start_spv(password).await? {
        println!("Wallet daemon is running.");
        Ok(())
    } else {
        anyhow::bail!("wallet daemon failed to start; see the log for the classified reason");
    }
}

/// Stop the daemon process held by this instance
pub async fn stop(config: &Config) -> Result<()> {
    let supervisor = build_supervisor(config)?;

    if supervisor.stop_spv().await {
        println!("Wallet daemon stopped.");
    } else {
        println!(
            "No daemon process held by this instance. An externally started daemon \
             must be stopped where it was started."
        );
    }
    Ok(())
}

/// Bootstrap the daemon's default wallet
pub async fn create_wallet(config: &Config, password: &str) -> Result<()> {
    let supervisor = build_supervisor(config)?;

    info!("Creating default wallet...");
    if supervisor.create_spv_wallet(password).await? {
        println!("Default wallet created.");
        Ok(())
    } else {
        anyhow::bail!("wallet bootstrap was rejected by the daemon");
    }
}

/// Enable and auto-configure every asset wallet
pub async fn enable_wallets(config: &Config) -> Result<()> {
    let supervisor = build_supervisor(config)?;

    info!("Enabling all asset wallets...");
    if supervisor.enable_all_wallets().await? {
        println!("All wallets enabled and configured.");
        Ok(())
    } else {
        anyhow::bail!("wallet enable did not complete");
    }
}

/// Load wallet confs and report the sweep
pub async fn confs(config: &Config, manifest: Option<&str>) -> Result<()> {
    let report = load_report(config, manifest)?;

    println!("\n=== WALLET CONFS ===\n");
    if report.master_healed {
        println!("Master conf was regenerated with fresh credentials.\n");
    }

    let mut tickers: Vec<&String> = report.confs.keys().collect();
    tickers.sort_unstable();
    for ticker in tickers {
        let conf = &report.confs[ticker];
        let port = conf
            .rpc_port
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".into());
        let enabled = if conf.rpc_enabled { "enabled" } else { "disabled" };
        println!("  {:<8} rpc {:<8} port {}", ticker, enabled, port);
    }

    if !report.failed.is_empty() {
        println!("\nSkipped unreadable confs:");
        for (path, reason) in &report.failed {
            println!("  {}: {}", path.display(), reason);
        }
    }

    Ok(())
}

/// Show balances for one asset or all of them
pub async fn balance(config: &Config, ticker: Option<&str>) -> Result<()> {
    let fleet = build_fleet(config)?;

    println!("\n=== BALANCES ===\n");
    match ticker {
        Some(ticker) => {
            let wallet = get_wallet(&fleet, ticker)?;
            let balance = wallet.balance().await?;
            println!("  {:<8} {}", ticker, balance);
        }
        None => {
            if fleet.is_empty() {
                println!("No asset wallets configured.");
                return Ok(());
            }
            // one concurrent sweep; a dead asset endpoint doesn't hide the rest
            for entry in fleet.balances().await {
                match entry.balance {
                    Ok(balance) => println!("  {:<8} {}", entry.ticker, balance),
                    Err(e) => println!("  {:<8} unavailable: {}", entry.ticker, e),
                }
            }
        }
    }

    Ok(())
}

/// Send coins: fund a draft, show it, confirm, broadcast
#[allow(clippy::too_many_arguments)]
pub async fn send(
    config: &Config,
    ticker: &str,
    address: &str,
    amount: &str,
    description: &str,
    subtract_fees: bool,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let amount = parse_amount(amount)?;
    let recipient = Recipient::new(address, amount, description);
    recipient.validate()?;

    let fleet = build_fleet(config)?;
    let wallet = get_wallet(&fleet, ticker)?;

    info!(ticker, address, %amount, subtract_fees, "funding send");
    let draft = wallet.prepare_send(&[recipient], subtract_fees).await?;
    print_draft(ticker, &draft);

    if dry_run {
        println!("\nDRY-RUN: draft not broadcast.");
        return Ok(());
    }

    // Confirmation prompt (unless --force)
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Broadcast this {} transaction? This cannot be undone.",
                ticker
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            info!("Send cancelled by user");
            return Ok(());
        }
    }

    let tx_id = wallet.broadcast(&draft).await?;
    println!("\nTransaction broadcast.");
    println!("txid: {}", tx_id);

    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

fn print_draft(ticker: &str, draft: &Draft) {
    println!("\n=== TRANSACTION DRAFT ({}) ===\n", ticker);
    println!("Inputs:");
    for input in &draft.inputs {
        println!(
            "  {}:{}  {}  {}",
            input.tx_id, input.output_index, input.address, input.amount
        );
    }
    println!("Outputs:");
    for output in &draft.outputs {
        println!("  {}  {}", output.address, output.amount);
    }
    println!("Fee: {}", draft.fees);
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn parse_amount(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).map_err(|e| anyhow::anyhow!("Invalid amount {:?}: {}", raw, e))
}

/// The admin endpoint: config overrides when present, else the master conf
/// (self-healed on load, so credentials always exist once settings do).
///
/// A missing settings directory is not fatal here: supervisor construction
/// falls back to the default port with empty credentials, so `status` can
/// still report the uninstalled state instead of dying before the first
/// signal. Commands that actually need the confs keep failing on load.
fn admin_endpoint(config: &Config) -> Result<RpcEndpoint> {
    if let (Some(username), Some(password)) =
        (&config.rpc.admin_username, &config.rpc.admin_password)
    {
        return Ok(RpcEndpoint {
            host: config.rpc.host.clone(),
            port: config.rpc.admin_port.unwrap_or(conf::DEFAULT_MASTER_RPC_PORT),
            username: username.clone(),
            password: password.clone(),
        });
    }

    let report = match load_report(config, None) {
        Ok(report) => report,
        Err(e) if is_settings_missing(&e) => {
            return Ok(RpcEndpoint {
                host: config.rpc.host.clone(),
                port: config.rpc.admin_port.unwrap_or(conf::DEFAULT_MASTER_RPC_PORT),
                username: String::new(),
                password: String::new(),
            });
        }
        Err(e) => return Err(e),
    };
    let master = report
        .master()
        .ok_or_else(|| anyhow::anyhow!("no master conf after load"))?;
    Ok(RpcEndpoint {
        host: config.rpc.host.clone(),
        port: master.rpc_port.unwrap_or(conf::DEFAULT_MASTER_RPC_PORT),
        username: master.rpc_username.clone().unwrap_or_default(),
        password: master.rpc_password.clone().unwrap_or_default(),
    })
}

fn is_settings_missing(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<Error>(), Some(Error::SettingsMissing(_)))
}

fn build_supervisor(config: &Config) -> Result<Supervisor> {
    let endpoint = admin_endpoint(config)?;
    let admin_rpc = RpcClient::new(endpoint, config.rpc.timeout_ms)?;
    Ok(Supervisor::new(config.daemon.clone(), admin_rpc))
}

fn build_fleet(config: &Config) -> Result<WalletFleet> {
    let report = load_report(config, None)?;
    let fleet = WalletFleet::from_confs(
        &report,
        &config.fees,
        &config.rpc.host,
        config.rpc.timeout_ms,
    );
    if fleet.is_empty() {
        warn!(
            "no usable asset wallets found in {}",
            config.daemon.settings_dir().display()
        );
    }
    Ok(fleet)
}

fn get_wallet<'a>(fleet: &'a WalletFleet, ticker: &str) -> Result<&'a AssetWallet> {
    fleet
        .get(ticker)
        .ok_or_else(|| anyhow::anyhow!("no wallet configured for ticker {:?}", ticker))
}

fn load_report(config: &Config, manifest: Option<&str>) -> Result<ConfReport> {
    let manifest_path = manifest
        .map(Path::new)
        .map(Path::to_path_buf)
        .or_else(|| config.daemon.port_manifest.clone());

    let ports = match manifest_path {
        Some(path) => Some(load_port_manifest(&path)?),
        None => None,
    };

    let report = conf::load_confs(&config.daemon.settings_dir(), ports.as_ref())?;
    Ok(report)
}

/// A port manifest is a flat JSON object of ticker→port
fn load_port_manifest(path: &Path) -> Result<HashMap<String, u16>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read port manifest {}: {}", path.display(), e))?;
    serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("malformed port manifest {}: {}", path.display(), e))
}
