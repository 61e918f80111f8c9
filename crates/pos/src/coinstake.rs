//! Value conservation for coinstakes that spend coinstake-opcode scripts.

use stakecore_consensus::{money_range, Amount};
use stakecore_primitives::transaction::{Transaction, TxOut};

use crate::chain::ChainView;
use crate::error::PosError;
use crate::resolve::resolve_prevout;

/// Every extra input must spend `kernel_script`, and the outputs paying back to
/// `kernel_script` must carry at least the staked total. Only standard and data
/// outputs are allowed. The treasury split is validated elsewhere.
pub fn verify_coinstake_outputs<V: ChainView + ?Sized>(
    view: &V,
    tx: &Transaction,
    kernel_script: &[u8],
    kernel_amount: Amount,
) -> Result<(), PosError> {
    let mut staked = kernel_amount;
    for (input, txin) in tx.vin.iter().enumerate().skip(1) {
        let resolved = resolve_prevout(view, &txin.prevout, input)?;
        if resolved.script_pubkey != kernel_script {
            return Err(PosError::MixedPrevoutScripts { input });
        }
        staked = add_value(staked, resolved.value)?;
    }

    let mut paid: Amount = 0;
    for (output, txout) in tx.vout.iter().enumerate() {
        match txout {
            TxOut::Standard {
                value,
                script_pubkey,
            } => {
                if script_pubkey.as_slice() == kernel_script {
                    paid = add_value(paid, *value)?;
                }
            }
            TxOut::Data { .. } => {}
            other => {
                return Err(PosError::BadOutputType {
                    output,
                    output_type: other.output_type(),
                });
            }
        }
    }

    if paid < staked {
        return Err(PosError::AmountScriptMismatch { paid, staked });
    }
    Ok(())
}

fn add_value(total: Amount, value: Amount) -> Result<Amount, PosError> {
    if !money_range(value) {
        return Err(PosError::ValueOutOfRange);
    }
    total
        .checked_add(value)
        .filter(|sum| money_range(*sum))
        .ok_or(PosError::ValueOutOfRange)
}
