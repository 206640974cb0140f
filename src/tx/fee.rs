//! Per-asset fee model and dust policy

use rust_decimal::Decimal;
use serde::Deserialize;

/// Dust threshold in smallest units, shared across assets. Divided by
/// `coin_units` to get the per-asset cutoff in display units.
pub const DUST_THRESHOLD_UNITS: u32 = 5460;

/// Approximate serialized size of one input, in bytes
const INPUT_BYTES: u32 = 192;

/// Approximate serialized size of one output, in bytes
const OUTPUT_BYTES: u32 = 34;

/// Per-asset fee constants, in smallest units except where noted
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeeInfo {
    #[serde(default = "default_fee_per_byte")]
    pub fee_per_byte: Decimal,

    #[serde(default = "default_min_tx_fee")]
    pub min_tx_fee: Decimal,

    /// Divisor between the smallest unit and the display unit
    #[serde(default = "default_coin_units")]
    pub coin_units: Decimal,
}

fn default_fee_per_byte() -> Decimal {
    Decimal::from(100u32)
}

fn default_min_tx_fee() -> Decimal {
    Decimal::from(10_000u32)
}

fn default_coin_units() -> Decimal {
    Decimal::from(100_000_000u64)
}

impl Default for FeeInfo {
    fn default() -> Self {
        Self {
            fee_per_byte: default_fee_per_byte(),
            min_tx_fee: default_min_tx_fee(),
            coin_units: default_coin_units(),
        }
    }
}

impl FeeInfo {
    /// Estimate the fee for a transaction shape, in display units.
    ///
    /// `max(fee_per_byte * (192*inputs + 34*outputs), min_tx_fee) / coin_units`
    /// — the byte-cost constants must not change, wire-compatible fee behavior
    /// depends on them.
    pub fn fee_estimate(&self, input_count: usize, output_count: usize) -> Decimal {
        let bytes = Decimal::from(INPUT_BYTES) * Decimal::from(input_count as u64)
            + Decimal::from(OUTPUT_BYTES) * Decimal::from(output_count as u64);
        let raw = self.fee_per_byte * bytes;
        raw.max(self.min_tx_fee) / self.coin_units
    }

    /// The dust cutoff in display units
    pub fn dust_cutoff(&self) -> Decimal {
        Decimal::from(DUST_THRESHOLD_UNITS) / self.coin_units
    }

    /// An amount at or below the cutoff costs more to spend than it is worth
    pub fn is_dust(&self, amount: Decimal) -> bool {
        amount <= self.dust_cutoff()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fee_estimate_constants() {
        let fee = FeeInfo::default();
        // 100 * (192*1 + 34*1) = 22_600 smallest units
        assert_eq!(fee.fee_estimate(1, 1), dec!(0.000226));
        // 100 * (192*1 + 34*2) = 26_000
        assert_eq!(fee.fee_estimate(1, 2), dec!(0.00026));
        // 100 * (192*2 + 34*3) = 48_600
        assert_eq!(fee.fee_estimate(2, 3), dec!(0.000486));
    }

    #[test]
    fn test_fee_never_below_minimum() {
        let fee = FeeInfo {
            fee_per_byte: dec!(1),
            ..FeeInfo::default()
        };
        // 1 * 226 = 226, below min_tx_fee of 10_000
        assert_eq!(fee.fee_estimate(1, 1), dec!(0.0001));
    }

    #[test]
    fn test_fee_monotonic_in_inputs() {
        let fee = FeeInfo::default();
        let floor = fee.min_tx_fee / fee.coin_units;
        let mut prev = Decimal::ZERO;
        for inputs in 1..=10 {
            let est = fee.fee_estimate(inputs, 2);
            assert!(est >= prev, "fee decreased at {} inputs", inputs);
            assert!(est >= floor);
            prev = est;
        }
    }

    #[test]
    fn test_dust_boundary() {
        let fee = FeeInfo::default();
        assert_eq!(fee.dust_cutoff(), dec!(0.0000546));
        assert!(fee.is_dust(dec!(0.0000546)));
        assert!(fee.is_dust(Decimal::ZERO));
        assert!(!fee.is_dust(dec!(0.0000547)));
    }
}
