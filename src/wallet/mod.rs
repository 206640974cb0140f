//! Per-asset wallet surface
//!
//! One `AssetWallet` per ticker binds its RPC endpoint to the transaction
//! builder; the `WalletFleet` holds all of them and fans refresh operations
//! out concurrently. Supervision of the daemon itself lives in `daemon`, not
//! here.

pub mod facade;

pub use facade::{AssetWallet, BalanceEntry, WalletFleet};
