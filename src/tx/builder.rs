//! Coin selection and transaction drafting
//!
//! The funding pass is a pure function over candidate unspent outputs;
//! `TransactionBuilder` is a thin stateful wrapper for call sites that
//! accumulate recipients before funding. A draft is only ever published
//! whole: on any funding error the caller's state is untouched.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{Error, Result};
use crate::rpc::UnspentOutput;
use crate::tx::fee::FeeInfo;
use crate::tx::recipient::Recipient;

/// A funded transaction draft: selected inputs, outputs (the recipients plus
/// at most one synthesized change output), and the network fee.
#[derive(Debug, Clone)]
pub struct Draft {
    pub inputs: Vec<UnspentOutput>,
    pub outputs: Vec<Recipient>,
    pub fees: Decimal,
}

impl Draft {
    /// Outputs as the address→amount map `createrawtransaction` takes.
    /// Last write wins when two outputs share an address.
    pub fn tx_outputs(&self) -> HashMap<String, Decimal> {
        self.outputs
            .iter()
            .map(|o| (o.address.clone(), o.amount))
            .collect()
    }
}

/// Select inputs and draft outputs for a spend.
///
/// Candidates are filtered to spendable, non-dust outputs; recipients are
/// validated; then the cheapest covering input set is chosen:
/// an exact-amount match where one exists, otherwise the smallest single
/// sufficient input, otherwise a greedy largest-first accumulation. A change
/// output is appended unless the remainder is dust, in which case it rides
/// as extra fee. With `subtract_fees`, a shortfall against `need + fee` is
/// taken out of the recipients in equal shares instead of failing.
pub fn fund_transaction(
    candidates: &[UnspentOutput],
    recipients: &[Recipient],
    fee_info: &FeeInfo,
    subtract_fees: bool,
) -> Result<Draft> {
    // Usable inputs only: spendable and above the dust cutoff, smallest first.
    let mut usable: Vec<&UnspentOutput> = candidates
        .iter()
        .filter(|u| u.spendable && !fee_info.is_dust(u.amount))
        .collect();
    usable.sort_by(|a, b| a.amount.cmp(&b.amount));
    if usable.is_empty() {
        return Err(Error::NoSpendableInputs);
    }

    if recipients.is_empty() {
        return Err(Error::Internal(
            "cannot fund a transaction with no recipients".into(),
        ));
    }
    for r in recipients {
        r.validate()?;
    }
    let need: Decimal = recipients.iter().map(|r| r.amount).sum();

    // Exact-amount lookup is a best-effort shortcut; duplicates overwrite.
    let mut exact: HashMap<Decimal, &UnspentOutput> = HashMap::new();
    for u in &usable {
        exact.insert(u.amount, *u);
    }

    let available: Decimal = usable.iter().map(|u| u.amount).sum();
    let funds_short = if subtract_fees {
        available < need
    } else {
        available <= need
    };
    if funds_short {
        return Err(Error::insufficient(available, need));
    }

    let out_count = recipients.len();
    let mut fee = fee_info.fee_estimate(1, out_count);

    // Exact-match fast paths: a single input, no change output needed.
    if subtract_fees {
        if let Some(u) = exact.get(&need) {
            let share = fee / Decimal::from(out_count as u64);
            let outputs = recipients
                .iter()
                .cloned()
                .map(|mut r| {
                    r.amount -= share;
                    r
                })
                .collect();
            return Ok(Draft {
                inputs: vec![(*u).clone()],
                outputs,
                fees: fee,
            });
        }
    }
    if let Some(u) = exact.get(&(need + fee)) {
        return Ok(Draft {
            inputs: vec![(*u).clone()],
            outputs: recipients.to_vec(),
            fees: fee,
        });
    }

    // One change output from here on.
    fee = fee_info.fee_estimate(1, out_count + 1);

    let selected: Vec<UnspentOutput> = if usable.len() == 1 {
        let only = usable[0];
        if !subtract_fees && only.amount < need + fee {
            return Err(Error::insufficient(only.amount, need + fee));
        }
        vec![only.clone()]
    } else if usable[usable.len() - 1].amount < need + fee {
        // The largest alone cannot cover it: accumulate greedily from the
        // largest down, re-estimating the fee as inputs are added.
        let mut acc: Vec<UnspentOutput> = Vec::new();
        let mut total = Decimal::ZERO;
        for u in usable.iter().rev() {
            acc.push((*u).clone());
            total += u.amount;
            fee = fee_info.fee_estimate(acc.len(), out_count + 1);
            if total >= need + fee {
                break;
            }
        }
        if total < need + fee && !subtract_fees {
            return Err(Error::insufficient(total, need + fee));
        }
        acc
    } else {
        // The largest alone suffices: walk down for the smallest single input
        // still covering the required amount; the moment one falls short,
        // take the previous (next larger) candidate.
        let required = need + fee;
        let mut idx = usable.len() - 1;
        for i in (0..usable.len()).rev() {
            if usable[i].amount >= required {
                idx = i;
            } else {
                break;
            }
        }
        vec![usable[idx].clone()]
    };

    let selected_total: Decimal = selected.iter().map(|u| u.amount).sum();
    // Change goes back to the first selected input's address.
    let change_address = selected[0].address.clone();

    let mut outputs: Vec<Recipient> = recipients.to_vec();
    if subtract_fees && selected_total < need + fee {
        // Short of the full fee: take it out of the recipients, equal shares.
        let share = fee / Decimal::from(out_count as u64);
        for o in &mut outputs {
            o.amount -= share;
        }
    }

    let spent: Decimal = outputs.iter().map(|o| o.amount).sum();
    let change = selected_total - spent - fee;
    if !fee_info.is_dust(change) {
        outputs.push(Recipient::new(change_address, change, ""));
    }
    // Dust change is dropped and silently rides as extra fee.

    debug!(
        inputs = selected.len(),
        outputs = outputs.len(),
        %fee,
        %change,
        "funded transaction draft"
    );

    Ok(Draft {
        inputs: selected,
        outputs,
        fees: fee,
    })
}

/// Stateful wrapper over the pure funding pass.
///
/// One builder per send: recipients accumulate, `fund` runs the selection,
/// and the draft is discarded wholesale on the next attempt.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    fee_info: FeeInfo,
    recipients: Vec<Recipient>,
    draft: Option<Draft>,
}

impl TransactionBuilder {
    pub fn new(fee_info: FeeInfo) -> Self {
        Self {
            fee_info,
            recipients: Vec::new(),
            draft: None,
        }
    }

    /// Append a copy of the recipient. No dedupe: paying one address twice
    /// legitimately produces two outputs.
    pub fn add_recipient(&mut self, recipient: &Recipient) {
        self.recipients.push(recipient.clone());
    }

    /// Run the funding pass. On error the builder keeps its pre-call state
    /// and stays invalid.
    pub fn fund(&mut self, candidates: &[UnspentOutput], subtract_fees: bool) -> Result<()> {
        let draft = fund_transaction(candidates, &self.recipients, &self.fee_info, subtract_fees)?;
        self.draft = Some(draft);
        Ok(())
    }

    /// A draft is valid once funding selected at least one input, produced at
    /// least one output, and no output went negative.
    pub fn is_valid(&self) -> bool {
        match &self.draft {
            Some(d) => {
                !d.inputs.is_empty()
                    && !d.outputs.is_empty()
                    && d.outputs.iter().all(|o| o.amount >= Decimal::ZERO)
            }
            None => false,
        }
    }

    pub fn fee_estimate(&self, input_count: usize, output_count: usize) -> Decimal {
        self.fee_info.fee_estimate(input_count, output_count)
    }

    pub fn is_dust(&self, amount: Decimal) -> bool {
        self.fee_info.is_dust(amount)
    }

    pub fn inputs(&self) -> &[UnspentOutput] {
        self.draft.as_ref().map(|d| d.inputs.as_slice()).unwrap_or(&[])
    }

    pub fn outputs(&self) -> &[Recipient] {
        self.draft.as_ref().map(|d| d.outputs.as_slice()).unwrap_or(&[])
    }

    /// Address→amount map for `createrawtransaction`; empty when unfunded
    pub fn tx_outputs(&self) -> HashMap<String, Decimal> {
        self.draft.as_ref().map(Draft::tx_outputs).unwrap_or_default()
    }

    pub fn fees(&self) -> Decimal {
        self.draft.as_ref().map(|d| d.fees).unwrap_or(Decimal::ZERO)
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }
}
