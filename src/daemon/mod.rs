//! Daemon lifecycle management
//!
//! The external multi-asset wallet daemon exposes no structured control
//! interface; everything here is built on three raw materials: conf files in
//! its settings directory (`conf`), free-text stdout/stderr classified into
//! tagged events (`events`), and a supervised subprocess plus RPC health
//! probe (`supervisor`).

pub mod conf;
pub mod events;
pub mod supervisor;

pub use conf::{ConfReport, WalletConf, DEFAULT_MASTER_RPC_PORT, MASTER_TICKER};
pub use events::{SpawnEvent, StreamSource};
pub use supervisor::{DaemonStatus, Supervisor};
