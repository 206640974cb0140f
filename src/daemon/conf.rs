//! Wallet daemon conf files
//!
//! The daemon reads one `config-<TICKER>.json` per asset from its settings
//! directory; the special `master` conf drives the administrative RPC
//! endpoint. The master conf is self-healed rather than rejected: missing
//! fields, disabled RPC, or a privileged port get fresh random credentials
//! and the fixed default port, rewritten in place with the daemon's 4-space
//! JSON formatting.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Fixed port the master RPC endpoint is healed to
pub const DEFAULT_MASTER_RPC_PORT: u16 = 19119;

/// Ticker of the administrative conf
pub const MASTER_TICKER: &str = "master";

/// Length of regenerated RPC credentials
const CREDENTIAL_LEN: usize = 32;

/// One `config-<TICKER>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConf {
    #[serde(default)]
    pub rpc_enabled: bool,
    #[serde(default)]
    pub rpc_username: Option<String>,
    #[serde(default)]
    pub rpc_password: Option<String>,
    #[serde(default)]
    pub rpc_port: Option<u16>,
}

impl WalletConf {
    /// Whether the master conf can actually serve: every field present, RPC
    /// enabled, unprivileged port
    fn is_master_usable(&self) -> bool {
        self.rpc_enabled
            && self.rpc_username.as_deref().is_some_and(|u| !u.is_empty())
            && self.rpc_password.as_deref().is_some_and(|p| !p.is_empty())
            && self.rpc_port.is_some_and(|p| p >= 1024)
    }

    /// Fresh master conf: random credentials, the fixed default port
    fn regenerated() -> Self {
        Self {
            rpc_enabled: true,
            rpc_username: Some(random_credential()),
            rpc_password: Some(random_credential()),
            rpc_port: Some(DEFAULT_MASTER_RPC_PORT),
        }
    }
}

fn random_credential() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CREDENTIAL_LEN)
        .map(char::from)
        .collect()
}

/// Outcome of one settings-directory sweep
#[derive(Debug, Default)]
pub struct ConfReport {
    /// Parsed confs by ticker, the master included under `master`
    pub confs: HashMap<String, WalletConf>,
    /// Files that failed to parse, with the reason (non-fatal)
    pub failed: Vec<(PathBuf, String)>,
    /// Whether the master conf was regenerated and rewritten
    pub master_healed: bool,
}

impl ConfReport {
    pub fn master(&self) -> Option<&WalletConf> {
        self.confs.get(MASTER_TICKER)
    }
}

/// Read every wallet conf in the settings directory.
///
/// One unreadable per-asset file is logged and skipped; the sweep never
/// aborts on it. A missing settings directory, or failing to rewrite a
/// healed master conf, is fatal. Per-asset confs get their RPC port patched
/// from the token manifest when one is supplied.
pub fn load_confs(
    settings_dir: &Path,
    port_manifest: Option<&HashMap<String, u16>>,
) -> Result<ConfReport> {
    if !settings_dir.is_dir() {
        return Err(Error::SettingsMissing(settings_dir.display().to_string()));
    }

    let mut report = ConfReport::default();

    for entry in fs::read_dir(settings_dir).map_err(|e| Error::Io(e.to_string()))? {
        let entry = entry.map_err(|e| Error::Io(e.to_string()))?;
        let path = entry.path();
        let Some(ticker) = conf_ticker(&path) else {
            continue;
        };

        let parsed: std::result::Result<WalletConf, String> = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()));

        if ticker.eq_ignore_ascii_case(MASTER_TICKER) {
            let conf = match parsed {
                Ok(conf) if conf.is_master_usable() => conf,
                Ok(_) | Err(_) => {
                    // Self-heal: nothing works without a usable admin endpoint.
                    let healed = WalletConf::regenerated();
                    write_conf(&path, &healed)?;
                    info!(path = %path.display(), "regenerated unusable master conf");
                    report.master_healed = true;
                    healed
                }
            };
            report.confs.insert(MASTER_TICKER.to_string(), conf);
            continue;
        }

        match parsed {
            Ok(mut conf) => {
                if let Some(port) = port_manifest.and_then(|m| m.get(&ticker)) {
                    conf.rpc_port = Some(*port);
                }
                report.confs.insert(ticker, conf);
            }
            Err(reason) => {
                warn!(path = %path.display(), %reason, "skipping unreadable wallet conf");
                report.failed.push((path, reason));
            }
        }
    }

    // No master conf on disk at all: generate one so the admin endpoint has
    // known credentials.
    if report.master().is_none() {
        let healed = WalletConf::regenerated();
        let path = settings_dir.join(format!("config-{}.json", MASTER_TICKER));
        write_conf(&path, &healed)?;
        info!(path = %path.display(), "created missing master conf");
        report.master_healed = true;
        report.confs.insert(MASTER_TICKER.to_string(), healed);
    }

    Ok(report)
}

/// `config-<TICKER>.json` → `<TICKER>`
fn conf_ticker(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let ticker = name.strip_prefix("config-")?.strip_suffix(".json")?;
    (!ticker.is_empty()).then(|| ticker.to_string())
}

/// Write a conf with the daemon's 4-space JSON formatting
fn write_conf(path: &Path, conf: &WalletConf) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    conf.serialize(&mut ser)?;
    buf.push(b'\n');
    fs::write(path, buf)
        .map_err(|e| Error::Config(format!("Failed to write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    const USABLE_MASTER: &str = r#"{
        "rpcEnabled": true,
        "rpcUsername": "muxadmin",
        "rpcPassword": "s3cret",
        "rpcPort": 19119
    }"#;

    #[test]
    fn test_usable_master_is_left_alone() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "config-master.json", USABLE_MASTER);

        let report = load_confs(dir.path(), None).unwrap();
        assert!(!report.master_healed);
        assert_eq!(
            report.master().unwrap().rpc_username.as_deref(),
            Some("muxadmin")
        );
        // the file itself was not rewritten
        assert_eq!(fs::read_to_string(path).unwrap(), USABLE_MASTER);
    }

    #[test]
    fn test_master_with_rpc_disabled_is_healed() {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            "config-master.json",
            r#"{"rpcEnabled": false, "rpcUsername": "u", "rpcPassword": "p", "rpcPort": 19119}"#,
        );

        let report = load_confs(dir.path(), None).unwrap();
        assert!(report.master_healed);
        let master = report.master().unwrap();
        assert!(master.rpc_enabled);
        assert_eq!(master.rpc_port, Some(DEFAULT_MASTER_RPC_PORT));
        let user = master.rpc_username.as_deref().unwrap();
        assert_eq!(user.len(), CREDENTIAL_LEN);
        assert!(user.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_master_on_privileged_port_is_healed() {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            "config-master.json",
            r#"{"rpcEnabled": true, "rpcUsername": "u", "rpcPassword": "p", "rpcPort": 443}"#,
        );

        let report = load_confs(dir.path(), None).unwrap();
        assert!(report.master_healed);
        assert_eq!(
            report.master().unwrap().rpc_port,
            Some(DEFAULT_MASTER_RPC_PORT)
        );
    }

    #[test]
    fn test_master_missing_fields_is_healed_with_four_space_json() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "config-master.json", "{}");

        let report = load_confs(dir.path(), None).unwrap();
        assert!(report.master_healed);

        let rewritten = fs::read_to_string(path).unwrap();
        assert!(rewritten.contains("\n    \"rpcEnabled\": true"));
        assert!(rewritten.ends_with('\n'));
    }

    #[test]
    fn test_absent_master_conf_is_created() {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            "config-BTC.json",
            r#"{"rpcEnabled": true, "rpcPort": 8332}"#,
        );

        let report = load_confs(dir.path(), None).unwrap();
        assert!(report.master_healed);
        assert!(dir.path().join("config-master.json").is_file());
    }

    #[test]
    fn test_corrupt_asset_conf_is_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "config-master.json", USABLE_MASTER);
        write_file(dir.path(), "config-LTC.json", "{not json");
        write_file(
            dir.path(),
            "config-BTC.json",
            r#"{"rpcEnabled": true, "rpcUsername": "a", "rpcPassword": "b", "rpcPort": 8332}"#,
        );

        let report = load_confs(dir.path(), None).unwrap();
        assert_eq!(report.failed.len(), 1);
        assert!(report.confs.contains_key("BTC"));
        assert!(!report.confs.contains_key("LTC"));
    }

    #[test]
    fn test_manifest_patches_asset_ports() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "config-master.json", USABLE_MASTER);
        write_file(
            dir.path(),
            "config-DOGE.json",
            r#"{"rpcEnabled": true, "rpcUsername": "a", "rpcPassword": "b", "rpcPort": 1000}"#,
        );

        let manifest: HashMap<String, u16> = [("DOGE".to_string(), 22555)].into();
        let report = load_confs(dir.path(), Some(&manifest)).unwrap();
        assert_eq!(report.confs["DOGE"].rpc_port, Some(22555));
    }

    #[test]
    fn test_unrelated_files_are_ignored() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "config-master.json", USABLE_MASTER);
        write_file(dir.path(), "notes.txt", "hello");
        write_file(dir.path(), "config-.json", "{}");

        let report = load_confs(dir.path(), None).unwrap();
        assert_eq!(report.confs.len(), 1);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_missing_settings_dir_is_fatal() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = load_confs(&missing, None).unwrap_err();
        assert!(matches!(err, Error::SettingsMissing(_)));
    }
}
