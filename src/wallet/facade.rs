//! Per-asset wallet facade
//!
//! Binds a ticker, its RPC endpoint, and the transaction builder into the
//! balance/send surface. Sends are never retried here: a duplicate broadcast
//! is never assumed safe, so retrying is left to the user.

use std::collections::HashMap;

use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::daemon::conf::{ConfReport, MASTER_TICKER};
use crate::error::{Error, Result};
use crate::rpc::{RpcClient, RpcEndpoint, UnspentOutput};
use crate::tx::{fund_transaction, Draft, FeeInfo, Recipient};

/// One asset's wallet surface
#[derive(Debug)]
pub struct AssetWallet {
    ticker: String,
    rpc: RpcClient,
    fee_info: FeeInfo,
}

impl AssetWallet {
    pub fn new(ticker: impl Into<String>, rpc: RpcClient, fee_info: FeeInfo) -> Self {
        Self {
            ticker: ticker.into(),
            rpc,
            fee_info,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn fee_info(&self) -> &FeeInfo {
        &self.fee_info
    }

    /// Unspent outputs as the daemon reports them
    pub async fn unspent(&self) -> Result<Vec<UnspentOutput>> {
        self.rpc.list_unspent().await
    }

    /// Sum of the spendable unspent outputs
    pub async fn balance(&self) -> Result<Decimal> {
        let utxos = self.unspent().await?;
        Ok(utxos
            .iter()
            .filter(|u| u.spendable)
            .map(|u| u.amount)
            .sum())
    }

    /// Fund a draft against the current unspent set without broadcasting
    pub async fn prepare_send(
        &self,
        recipients: &[Recipient],
        subtract_fees: bool,
    ) -> Result<Draft> {
        let utxos = self.unspent().await?;
        fund_transaction(&utxos, recipients, &self.fee_info, subtract_fees)
    }

    /// Broadcast a funded draft: create → sign → send, strictly sequential.
    /// Any failing stage aborts with its error; nothing is partially
    /// broadcast.
    pub async fn broadcast(&self, draft: &Draft) -> Result<String> {
        let raw = self
            .rpc
            .create_raw_transaction(&draft.inputs, &draft.tx_outputs())
            .await?;
        let signed = self.rpc.sign_raw_transaction(&raw).await?;
        if !signed.complete {
            return Err(Error::SigningIncomplete);
        }
        let tx_id = self.rpc.send_raw_transaction(&signed.hex).await?;
        info!(ticker = %self.ticker, %tx_id, fee = %draft.fees, "transaction broadcast");
        Ok(tx_id)
    }

    /// Fund and broadcast in one pass
    pub async fn send(&self, recipients: &[Recipient], subtract_fees: bool) -> Result<String> {
        let draft = self.prepare_send(recipients, subtract_fees).await?;
        self.broadcast(&draft).await
    }
}

/// Per-asset outcome of one concurrent balance sweep
#[derive(Debug)]
pub struct BalanceEntry {
    pub ticker: String,
    pub balance: Result<Decimal>,
}

/// All configured asset wallets
#[derive(Debug, Default)]
pub struct WalletFleet {
    wallets: HashMap<String, AssetWallet>,
}

impl WalletFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the fleet from loaded daemon confs. Assets with an unusable RPC
    /// conf are skipped with a warning, never fatal.
    pub fn from_confs(
        report: &ConfReport,
        fee_infos: &HashMap<String, FeeInfo>,
        host: &str,
        timeout_ms: u64,
    ) -> Self {
        let mut fleet = Self::new();
        for (ticker, conf) in &report.confs {
            if ticker == MASTER_TICKER {
                continue;
            }
            if !conf.rpc_enabled {
                warn!(%ticker, "RPC disabled in conf, skipping wallet");
                continue;
            }
            let (Some(username), Some(password), Some(port)) = (
                conf.rpc_username.as_ref(),
                conf.rpc_password.as_ref(),
                conf.rpc_port,
            ) else {
                warn!(%ticker, "conf missing RPC endpoint fields, skipping wallet");
                continue;
            };

            let endpoint = RpcEndpoint {
                host: host.to_string(),
                port,
                username: username.clone(),
                password: password.clone(),
            };
            let rpc = match RpcClient::new(endpoint, timeout_ms) {
                Ok(client) => client,
                Err(e) => {
                    warn!(%ticker, error = %e, "failed to build RPC client, skipping wallet");
                    continue;
                }
            };
            let fee_info = fee_infos.get(ticker).cloned().unwrap_or_default();
            fleet.insert(AssetWallet::new(ticker.clone(), rpc, fee_info));
        }
        fleet
    }

    pub fn insert(&mut self, wallet: AssetWallet) {
        self.wallets.insert(wallet.ticker().to_string(), wallet);
    }

    pub fn get(&self, ticker: &str) -> Option<&AssetWallet> {
        self.wallets.get(ticker)
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    pub fn tickers(&self) -> Vec<&str> {
        let mut tickers: Vec<&str> = self.wallets.keys().map(String::as_str).collect();
        tickers.sort_unstable();
        tickers
    }

    /// Refresh balances across every asset concurrently. One failing asset
    /// does not abort the sweep; its error rides along in the entry.
    pub async fn balances(&self) -> Vec<BalanceEntry> {
        let sweeps = self.wallets.values().map(|wallet| async move {
            BalanceEntry {
                ticker: wallet.ticker().to_string(),
                balance: wallet.balance().await,
            }
        });
        let mut entries = join_all(sweeps).await;
        entries.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        entries
    }
}
