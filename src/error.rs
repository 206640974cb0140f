//! Error types for walletmux

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the supervisor and spend engine
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings directory not found: {0}")]
    SettingsMissing(String),

    #[error("Wallet daemon not installed at {0}")]
    NotInstalled(String),

    // RPC transport errors
    #[error("RPC {method} failed with HTTP {status}")]
    RpcHttp { method: String, status: u16 },

    #[error("RPC {method} timed out")]
    RpcTimeout { method: String },

    #[error("RPC {method} connection failed: {detail}")]
    RpcConnection { method: String, detail: String },

    #[error("RPC {method} returned error {code}: {message}")]
    RpcDaemon {
        method: String,
        code: i64,
        message: String,
    },

    #[error("RPC {method} returned a malformed response: {detail}")]
    RpcMalformed { method: String, detail: String },

    // Recipient validation errors
    #[error("Invalid recipient address: {0}")]
    InvalidRecipientAddress(String),

    #[error("Invalid recipient amount for {address}: {amount}")]
    InvalidRecipientAmount { address: String, amount: Decimal },

    // Funding errors
    #[error("No spendable unspent outputs above the dust threshold")]
    NoSpendableInputs,

    #[error("Insufficient funds: {available} available, {required} required (short {shortfall})")]
    InsufficientFunds {
        available: Decimal,
        required: Decimal,
        shortfall: Decimal,
    },

    // Send pipeline errors
    #[error("Daemon did not fully sign the transaction")]
    SigningIncomplete,

    // Daemon lifecycle errors (spawn-level; startup classification is boolean)
    #[error("Failed to spawn wallet daemon: {0}")]
    DaemonSpawn(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient transport failure)
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RpcTimeout { .. } | Error::RpcConnection { .. })
    }

    /// Check if this error came out of the funding pass
    pub fn is_funding(&self) -> bool {
        matches!(
            self,
            Error::NoSpendableInputs
                | Error::InsufficientFunds { .. }
                | Error::InvalidRecipientAddress(_)
                | Error::InvalidRecipientAmount { .. }
        )
    }

    /// Shortfall error helper: states how much is missing, not just that it is
    pub fn insufficient(available: Decimal, required: Decimal) -> Self {
        Error::InsufficientFunds {
            available,
            required,
            shortfall: required - available,
        }
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_states_shortfall() {
        let err = Error::insufficient(dec!(3.5), dec!(10));
        assert!(err.is_funding());
        let msg = err.to_string();
        assert!(msg.contains("3.5"));
        assert!(msg.contains("6.5"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::RpcTimeout {
            method: "help".into()
        }
        .is_retryable());
        assert!(!Error::NoSpendableInputs.is_retryable());
    }
}
