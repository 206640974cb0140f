//! Spend recipients

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

lazy_static! {
    static ref ADDRESS_RE: Regex = Regex::new(r"^[a-zA-Z0-9]+$").unwrap();
}

/// A payment destination supplied by the caller.
///
/// Builders take copies on insertion, so fee subtraction never mutates
/// caller-held values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub address: String,

    /// Amount in display units, fixed-point
    pub amount: Decimal,

    #[serde(default)]
    pub description: String,
}

impl Recipient {
    pub fn new(address: impl Into<String>, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            amount,
            description: description.into(),
        }
    }

    /// Address must be alphanumeric and the amount strictly positive
    pub fn validate(&self) -> Result<()> {
        if !ADDRESS_RE.is_match(&self.address) {
            return Err(Error::InvalidRecipientAddress(self.address.clone()));
        }
        if self.amount <= Decimal::ZERO {
            return Err(Error::InvalidRecipientAmount {
                address: self.address.clone(),
                amount: self.amount,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_valid_recipient() {
        let r = Recipient::new("mhAd3GPlQmfTHZZ1", dec!(1.5), "rent");
        assert!(r.validate().is_ok());
    }

    #[test]
    fn test_empty_description_is_fine() {
        let r = Recipient::new("abc123", dec!(0.001), "");
        assert!(r.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_alphanumeric_address() {
        for addr in ["", "with space", "da-sh", "addr!", "müx"] {
            let r = Recipient::new(addr, dec!(1), "");
            assert!(
                matches!(r.validate(), Err(Error::InvalidRecipientAddress(_))),
                "accepted {:?}",
                addr
            );
        }
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        for amount in [Decimal::ZERO, dec!(-0.5)] {
            let r = Recipient::new("abc123", amount, "");
            assert!(matches!(
                r.validate(),
                Err(Error::InvalidRecipientAmount { .. })
            ));
        }
    }
}
