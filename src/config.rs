//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::tx::FeeInfo;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    /// Per-asset fee constants by ticker; assets without an entry fall back
    /// to the documented defaults
    #[serde(default)]
    pub fees: HashMap<String, FeeInfo>,
}

/// Where the wallet daemon lives and how long startup classification waits
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// How long stdio classification watches for a marker before the RPC
    /// polling fallback takes over
    #[serde(default = "default_startup_window_ms")]
    pub startup_window_ms: u64,

    /// Pause after the master-RPC marker so the socket finishes binding
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Expiry for the polling fallback and the one-shot invocations
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    /// Optional ticker→port manifest patched into per-asset confs on load
    #[serde(default)]
    pub port_manifest: Option<PathBuf>,
}

impl DaemonConfig {
    /// The daemon keeps its conf files in a `settings` subdirectory
    pub fn settings_dir(&self) -> PathBuf {
        self.base_dir.join("settings")
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            binary: default_binary(),
            startup_window_ms: default_startup_window_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            startup_timeout_secs: default_startup_timeout_secs(),
            port_manifest: None,
        }
    }
}

/// Endpoint parameters shared by the admin and per-asset RPC clients
#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_host")]
    pub host: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Admin endpoint overrides for a daemon managed outside this tool;
    /// when unset the master conf supplies credentials and port
    #[serde(default)]
    pub admin_username: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
    #[serde(default)]
    pub admin_port: Option<u16>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: default_rpc_host(),
            timeout_ms: default_timeout_ms(),
            admin_username: None,
            admin_password: None,
            admin_port: None,
        }
    }
}

// Default value functions
fn default_base_dir() -> PathBuf {
    std::env::var("SPV_BASE_DIR")
        .unwrap_or_else(|_| ".spv".into())
        .into()
}

fn default_binary() -> PathBuf {
    std::env::var("SPV_BINARY").unwrap_or_else(|_| "spvd".into()).into()
}

fn default_startup_window_ms() -> u64 {
    8_000
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_rpc_host() -> String {
    "127.0.0.1".into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("rpc.host", default_rpc_host())?
            .set_default("rpc.timeout_ms", default_timeout_ms() as i64)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix WALLETMUX_)
            .add_source(
                config::Environment::with_prefix("WALLETMUX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.rpc.timeout_ms == 0 {
            anyhow::bail!("rpc.timeout_ms must be positive");
        }

        if self.rpc.admin_username.is_some() != self.rpc.admin_password.is_some() {
            anyhow::bail!("rpc.admin_username and rpc.admin_password must be set together");
        }

        if self.daemon.poll_interval_ms == 0 {
            anyhow::bail!("daemon.poll_interval_ms must be positive");
        }

        if self.daemon.startup_timeout_secs == 0 {
            anyhow::bail!("daemon.startup_timeout_secs must be positive");
        }

        for (ticker, fee) in &self.fees {
            if fee.coin_units <= rust_decimal::Decimal::ZERO {
                anyhow::bail!("fees.{}.coin_units must be positive", ticker);
            }
            if fee.fee_per_byte < rust_decimal::Decimal::ZERO {
                anyhow::bail!("fees.{}.fee_per_byte cannot be negative", ticker);
            }
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        let mut tickers: Vec<&str> = self.fees.keys().map(String::as_str).collect();
        tickers.sort_unstable();

        format!(
            r#"Configuration:
  Daemon:
    base_dir: {}
    binary: {}
    startup_window: {}ms
    settle_delay: {}ms
    poll_interval: {}ms
    startup_timeout: {}s
  RPC:
    host: {}
    timeout: {}ms
    admin_username: {}
    admin_password: {}
    admin_port: {}
  Fees:
    configured: {:?} (others use defaults)
"#,
            self.daemon.base_dir.display(),
            self.daemon.binary.display(),
            self.daemon.startup_window_ms,
            self.daemon.settle_delay_ms,
            self.daemon.poll_interval_ms,
            self.daemon.startup_timeout_secs,
            self.rpc.host,
            self.rpc.timeout_ms,
            self.rpc.admin_username.as_deref().unwrap_or("(from master conf)"),
            if self.rpc.admin_password.is_some() {
                "***"
            } else {
                "(from master conf)"
            },
            self.rpc
                .admin_port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "(from master conf)".into()),
            tickers,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon: DaemonConfig::default(),
            rpc: RpcConfig::default(),
            fees: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.rpc.host, "127.0.0.1");
        assert_eq!(config.rpc.timeout_ms, 30_000);
        assert_eq!(config.daemon.settings_dir(), config.daemon.base_dir.join("settings"));
        assert!(config.fees.is_empty());
    }

    #[test]
    fn test_validate_rejects_lone_admin_username() {
        let config = Config {
            rpc: RpcConfig {
                admin_username: Some("admin".into()),
                ..RpcConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_coin_units() {
        let mut config = Config::default();
        config.fees.insert(
            "BTC".into(),
            FeeInfo {
                coin_units: dec!(0),
                ..FeeInfo::default()
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_masked_display_hides_admin_password() {
        let config = Config {
            rpc: RpcConfig {
                admin_username: Some("admin".into()),
                admin_password: Some("hunter2".into()),
                admin_port: Some(19119),
                ..RpcConfig::default()
            },
            ..Config::default()
        };
        let display = config.masked_display();
        assert!(display.contains("admin"));
        assert!(!display.contains("hunter2"));
    }
}
