//! Wire types for the daemon's JSON-RPC surface

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One unspent output as reported by `listunspent`.
///
/// Immutable once read. Amounts are fixed-point display units; the daemon
/// sends them as JSON numbers and they must round-trip without float drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnspentOutput {
    pub tx_id: String,
    pub output_index: u32,
    pub address: String,
    pub amount: Decimal,
    #[serde(default = "default_spendable")]
    pub spendable: bool,
    #[serde(default)]
    pub confirmations: u32,
}

fn default_spendable() -> bool {
    true
}

/// Input reference in the shape `createrawtransaction` takes
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInputRef {
    pub tx_id: String,
    pub vout: u32,
}

impl From<&UnspentOutput> for TxInputRef {
    fn from(u: &UnspentOutput) -> Self {
        Self {
            tx_id: u.tx_id.clone(),
            vout: u.output_index,
        }
    }
}

/// Result of `signrawtransaction`
#[derive(Debug, Clone, Deserialize)]
pub struct SignedTransaction {
    pub hex: String,
    pub complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_unspent_output_from_daemon_json() {
        let raw = r#"{
            "txId": "5ad1",
            "outputIndex": 2,
            "address": "mhAd3GPlQmfTHZZ1",
            "amount": 1.30000001,
            "spendable": true,
            "confirmations": 12
        }"#;
        let utxo: UnspentOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(utxo.output_index, 2);
        // exact decimal, no binary-float rounding
        assert_eq!(utxo.amount, dec!(1.30000001));
    }

    #[test]
    fn test_spendable_defaults_to_true() {
        let raw = r#"{"txId": "5ad1", "outputIndex": 0, "address": "a1", "amount": 2}"#;
        let utxo: UnspentOutput = serde_json::from_str(raw).unwrap();
        assert!(utxo.spendable);
        assert_eq!(utxo.confirmations, 0);
    }

    #[test]
    fn test_input_ref_serializes_camel_case() {
        let utxo = UnspentOutput {
            tx_id: "5ad1".into(),
            output_index: 1,
            address: "a1".into(),
            amount: dec!(1),
            spendable: true,
            confirmations: 0,
        };
        let json = serde_json::to_value(TxInputRef::from(&utxo)).unwrap();
        assert_eq!(json["txId"], "5ad1");
        assert_eq!(json["vout"], 1);
    }
}
