//! Transaction construction
//!
//! Turns unspent outputs + recipients + per-asset fee constants into a
//! funded, validated spend draft:
//! - fee model and dust policy (`fee`)
//! - recipient validation (`recipient`)
//! - coin selection and drafting (`builder`)
//!
//! The funding pass never under-funds, never emits a dust output, and picks
//! inputs deterministically; on failure nothing is published.

pub mod builder;
pub mod fee;
pub mod recipient;

pub use builder::{fund_transaction, Draft, TransactionBuilder};
pub use fee::{FeeInfo, DUST_THRESHOLD_UNITS};
pub use recipient::Recipient;
