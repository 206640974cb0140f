//! Wallet daemon process supervisor
//!
//! Owns the daemon subprocess handle and the administrative RPC client.
//! Daemon state is a composite of three signals that can disagree and are
//! surfaced separately rather than collapsed into one boolean: files on
//! disk, a locally held child handle, and the RPC health probe. A previous
//! app instance can leave RPC healthy with no local handle; a held handle
//! says nothing about whether RPC answers.
//!
//! All lifecycle operations are serialized behind one operation mutex; two
//! concurrent starts would otherwise race on "kill stale handle, then
//! spawn" and orphan or duplicate daemon processes.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use backoff::ExponentialBackoff;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::config::DaemonConfig;
use crate::daemon::conf::{self, ConfReport};
use crate::daemon::events::{
    classify_create, classify_enable, classify_start, SpawnEvent, StreamSource,
};
use crate::error::{Error, Result};
use crate::rpc::RpcClient;

/// Composite daemon status for display; the three signals stay separate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonStatus {
    pub installed: bool,
    pub has_settings: bool,
    pub process_alive: bool,
    pub rpc_healthy: bool,
}

/// Supervises the external multi-asset wallet daemon
pub struct Supervisor {
    config: DaemonConfig,
    admin_rpc: RpcClient,
    /// Held daemon subprocess, if this instance spawned one
    child: Mutex<Option<Child>>,
    /// Serializes start/stop/create/enable
    ops: Mutex<()>,
}

impl Supervisor {
    pub fn new(config: DaemonConfig, admin_rpc: RpcClient) -> Self {
        Self {
            config,
            admin_rpc,
            child: Mutex::new(None),
            ops: Mutex::new(()),
        }
    }

    /// Daemon base directory exists on disk
    pub fn is_installed(&self) -> bool {
        self.config.base_dir.is_dir()
    }

    /// Settings subdirectory exists on disk
    pub fn has_settings(&self) -> bool {
        self.config.settings_dir().is_dir()
    }

    /// Read every wallet conf, self-healing the master conf in place
    pub fn load_confs(&self, port_manifest: Option<&HashMap<String, u16>>) -> Result<ConfReport> {
        conf::load_confs(&self.config.settings_dir(), port_manifest)
    }

    /// Ask the admin endpoint whether it can service requests. The only
    /// trustworthy usability signal there is; any failure is simply `false`.
    pub async fn is_wallet_rpc_running(&self) -> bool {
        self.admin_rpc.help().await.is_ok()
    }

    /// This instance holds a child that has not exited. Does not imply the
    /// RPC endpoint is answering.
    pub async fn spv_is_running(&self) -> bool {
        let mut child = self.child.lock().await;
        match child.as_mut() {
            Some(c) => matches!(c.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// All four signals side by side
    pub async fn status(&self) -> DaemonStatus {
        DaemonStatus {
            installed: self.is_installed(),
            has_settings: self.has_settings(),
            process_alive: self.spv_is_running().await,
            rpc_healthy: self.is_wallet_rpc_running().await,
        }
    }

    /// Start the daemon unless it is already serving.
    ///
    /// Idempotent: a healthy RPC endpoint resolves success without spawning.
    /// Otherwise any stale handle is killed, a fresh daemon is spawned, and
    /// the outcome is classified from stdio text; if no text fires within
    /// the window, a bounded RPC poll decides. Absence of a positive signal
    /// is failure. `Ok(false)` is a classified failure; `Err` only when the
    /// spawn itself fails.
    pub async fn start_spv(&self, password: Option<&str>) -> Result<bool> {
        let _ops = self.ops.lock().await;

        if self.is_wallet_rpc_running().await {
            debug!("daemon RPC already healthy, not spawning");
            return Ok(true);
        }

        {
            let mut child = self.child.lock().await;
            if let Some(mut stale) = child.take() {
                warn!("killing stale daemon handle before respawn");
                let _ = stale.kill().await;
            }
        }

        let mut cmd = Command::new(&self.config.binary);
        if let Some(p) = password {
            cmd.arg("--password").arg(p);
        }
        let mut spawned = self.spawn(cmd)?;
        let stdout = spawned.stdout.take();
        let stderr = spawned.stderr.take();
        *self.child.lock().await = Some(spawned);
        info!(binary = %self.config.binary.display(), "spawned wallet daemon");

        let password_supplied = password.is_some();
        let window = Duration::from_millis(self.config.startup_window_ms);
        let event = watch_stdio(stdout, stderr, window, move |line, source| {
            classify_start(line, source, password_supplied)
        })
        .await;

        let started = match event {
            Some(SpawnEvent::Started) => {
                // Let the RPC socket finish binding before reporting up.
                sleep(Duration::from_millis(self.config.settle_delay_ms)).await;
                info!("daemon startup classified from stdout");
                true
            }
            Some(SpawnEvent::NeedsSelection) => {
                warn!("daemon stopped at the wallet-selection prompt with nobody to answer it");
                self.kill_child().await;
                false
            }
            Some(SpawnEvent::Failed(reason)) => {
                warn!(%reason, "daemon startup failed");
                self.kill_child().await;
                false
            }
            // No classifying text: ask the endpoint itself.
            None => self.poll_rpc_until_ready().await,
        };
        Ok(started)
    }

    /// Kill the held daemon process. `false` when this instance holds
    /// nothing; an externally started daemon is not ours to stop.
    pub async fn stop_spv(&self) -> bool {
        let _ops = self.ops.lock().await;
        let mut child = self.child.lock().await;
        match child.take() {
            Some(mut c) => {
                info!("stopping wallet daemon");
                let _ = c.kill().await;
                true
            }
            None => false,
        }
    }

    /// Bootstrap the default wallet. One-shot invocation: success is the
    /// wallet-created line; any stderr or closing without it is a rejection.
    pub async fn create_spv_wallet(&self, password: &str) -> Result<bool> {
        let _ops = self.ops.lock().await;

        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("--createdefaultwallet").arg(password);
        let mut child = self.spawn(cmd)?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let window = Duration::from_secs(self.config.startup_timeout_secs);
        let event = watch_stdio(stdout, stderr, window, classify_create).await;
        let _ = child.kill().await;

        match event {
            Some(SpawnEvent::Started) => {
                info!("default wallet created");
                Ok(true)
            }
            other => {
                warn!(?other, "wallet bootstrap did not complete");
                Ok(false)
            }
        }
    }

    /// Enable and auto-configure every asset wallet. The selection prompt
    /// that fails a plain start is the success signal here: reaching it
    /// means auto-configuration already finished.
    pub async fn enable_all_wallets(&self) -> Result<bool> {
        let _ops = self.ops.lock().await;

        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("--enablerpcandconfigure");
        let mut child = self.spawn(cmd)?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let window = Duration::from_secs(self.config.startup_timeout_secs);
        let event = watch_stdio(stdout, stderr, window, classify_enable).await;
        let _ = child.kill().await;

        match event {
            Some(SpawnEvent::NeedsSelection) => {
                info!("all wallets enabled and configured");
                Ok(true)
            }
            other => {
                warn!(?other, "wallet enable did not complete");
                Ok(false)
            }
        }
    }

    fn spawn(&self, mut cmd: Command) -> Result<Child> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.spawn()
            .map_err(|e| Error::DaemonSpawn(format!("{}: {}", self.config.binary.display(), e)))
    }

    async fn kill_child(&self) {
        let mut child = self.child.lock().await;
        if let Some(mut c) = child.take() {
            let _ = c.kill().await;
        }
    }

    /// Bounded fixed-interval RPC poll; expiry turns "no signal yet" into
    /// failure and the child is killed.
    async fn poll_rpc_until_ready(&self) -> bool {
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        let policy = ExponentialBackoff {
            initial_interval: interval,
            max_interval: interval,
            multiplier: 1.0,
            randomization_factor: 0.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.startup_timeout_secs)),
            ..ExponentialBackoff::default()
        };

        let probe = || async {
            if self.is_wallet_rpc_running().await {
                Ok(())
            } else {
                Err(backoff::Error::transient(()))
            }
        };

        match backoff::future::retry(policy, probe).await {
            Ok(()) => {
                info!("daemon startup classified from RPC poll");
                true
            }
            Err(()) => {
                warn!("daemon never answered RPC within the startup expiry");
                self.kill_child().await;
                false
            }
        }
    }
}

/// Feed stdio lines through a per-invocation classifier until it produces an
/// event, the streams close, or the window expires.
///
/// Both streams close → `Failed`: a daemon that exits before any classifying
/// signal is a failure, never "unknown". Window expiry → `None`, which the
/// caller resolves with its own fallback. Readers keep draining after
/// classification so the child never blocks on a full pipe.
async fn watch_stdio<F>(
    stdout: Option<tokio::process::ChildStdout>,
    stderr: Option<tokio::process::ChildStderr>,
    window: Duration,
    classify: F,
) -> Option<SpawnEvent>
where
    F: Fn(&str, StreamSource) -> Option<SpawnEvent>,
{
    let (tx, mut rx) = mpsc::channel::<(StreamSource, String)>(64);
    if let Some(out) = stdout {
        drain_lines(out, StreamSource::Stdout, tx.clone());
    }
    if let Some(err) = stderr {
        drain_lines(err, StreamSource::Stderr, tx.clone());
    }
    drop(tx);

    let deadline = Instant::now() + window;
    loop {
        match timeout_at(deadline, rx.recv()).await {
            // window expired with no classifying text
            Err(_) => return None,
            // both streams closed: the process is gone
            Ok(None) => {
                return Some(SpawnEvent::Failed(
                    "daemon closed its streams before any startup signal".into(),
                ))
            }
            Ok(Some((source, line))) => {
                debug!(?source, %line, "daemon output");
                if let Some(event) = classify(&line, source) {
                    return Some(event);
                }
            }
        }
    }
}

fn drain_lines<R>(reader: R, source: StreamSource, tx: mpsc::Sender<(StreamSource, String)>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            // keep draining even once nobody listens
            let _ = tx.send((source, line)).await;
        }
    });
}
