//! Input script verification for the script forms the stake kernel can carry.

use secp256k1::{ecdsa::Signature, Message, PublicKey};
use stakecore_consensus::Amount;
use stakecore_log::{log_category, Category};
use stakecore_primitives::hash::{hash160, hash256_to_hex, sha256};
use stakecore_primitives::transaction::Transaction;

use crate::secp::secp256k1_verify;
use crate::sighash::{signature_hash, SighashError, SighashType};
use crate::standard::{
    classify_script_pubkey, has_is_coinstake_op, parse_pushes, split_coinstake_script, ScriptType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptError {
    InputIndexOutOfRange,
    StackSize,
    SigPushOnly,
    WitnessWithScriptSig,
    BadCoinstakeScript,
    UnsupportedScript,
    EqualVerify,
    SigEncoding,
    SigHighS,
    SigHashType,
    PubkeyEncoding,
    SigCheck,
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptError::InputIndexOutOfRange => write!(f, "input index out of range"),
            ScriptError::StackSize => write!(f, "wrong number of signature stack items"),
            ScriptError::SigPushOnly => write!(f, "scriptSig is not push-only"),
            ScriptError::WitnessWithScriptSig => write!(f, "witness spend with non-empty scriptSig"),
            ScriptError::BadCoinstakeScript => write!(f, "malformed coinstake script"),
            ScriptError::UnsupportedScript => write!(f, "unsupported script type"),
            ScriptError::EqualVerify => write!(f, "public key does not match script hash"),
            ScriptError::SigEncoding => write!(f, "invalid signature encoding"),
            ScriptError::SigHighS => write!(f, "signature s value is not low"),
            ScriptError::SigHashType => write!(f, "invalid sighash type"),
            ScriptError::PubkeyEncoding => write!(f, "invalid public key encoding"),
            ScriptError::SigCheck => write!(f, "signature check failed"),
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<SighashError> for ScriptError {
    fn from(err: SighashError) -> Self {
        match err {
            SighashError::InputIndexOutOfRange => ScriptError::InputIndexOutOfRange,
            SighashError::UndefinedType(_) => ScriptError::SigHashType,
        }
    }
}

/// Checks that input `input_index` of `tx` satisfies `script_pubkey`, which
/// locks `amount`.
pub trait ScriptVerifier {
    fn verify(
        &self,
        tx: &Transaction,
        input_index: usize,
        script_pubkey: &[u8],
        amount: Amount,
    ) -> Result<(), ScriptError>;
}

/// ECDSA verifier for P2PKH, P2PKH256, P2PK and coinstake-opcode scripts.
///
/// Signatures are DER with a trailing sighash byte, low-S only. Coinstake-opcode
/// scripts are evaluated on their stake branch when the spending transaction is
/// a coinstake and on their spend branch otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardScriptVerifier;

impl ScriptVerifier for StandardScriptVerifier {
    fn verify(
        &self,
        tx: &Transaction,
        input_index: usize,
        script_pubkey: &[u8],
        amount: Amount,
    ) -> Result<(), ScriptError> {
        let result = verify_input(tx, input_index, script_pubkey, amount);
        if let Err(err) = &result {
            log_category!(
                Category::Script,
                "input {} of {} failed: {}",
                input_index,
                hash256_to_hex(&tx.txid()),
                err
            );
        }
        result
    }
}

fn verify_input(
    tx: &Transaction,
    input_index: usize,
    script_pubkey: &[u8],
    amount: Amount,
) -> Result<(), ScriptError> {
    let input = tx
        .vin
        .get(input_index)
        .ok_or(ScriptError::InputIndexOutOfRange)?;

    let stack = if input.witness.is_empty() {
        parse_pushes(&input.script_sig).ok_or(ScriptError::SigPushOnly)?
    } else if input.script_sig.is_empty() {
        input.witness.clone()
    } else {
        return Err(ScriptError::WitnessWithScriptSig);
    };

    let branch = if has_is_coinstake_op(script_pubkey) {
        let split = split_coinstake_script(script_pubkey).ok_or(ScriptError::BadCoinstakeScript)?;
        if tx.is_coin_stake() {
            split.stake
        } else {
            split.spend
        }
    } else {
        script_pubkey
    };

    let checker = SignatureChecker {
        tx,
        input_index,
        script_code: script_pubkey,
        amount,
    };

    match classify_script_pubkey(branch) {
        ScriptType::P2Pkh => {
            let [sig, pubkey] = stack.as_slice() else {
                return Err(ScriptError::StackSize);
            };
            if hash160(pubkey)[..] != branch[3..23] {
                return Err(ScriptError::EqualVerify);
            }
            checker.check_sig(sig, pubkey)
        }
        ScriptType::P2Pkh256 => {
            let [sig, pubkey] = stack.as_slice() else {
                return Err(ScriptError::StackSize);
            };
            if sha256(pubkey)[..] != branch[3..35] {
                return Err(ScriptError::EqualVerify);
            }
            checker.check_sig(sig, pubkey)
        }
        ScriptType::P2Pk => {
            let [sig] = stack.as_slice() else {
                return Err(ScriptError::StackSize);
            };
            checker.check_sig(sig, &branch[1..branch.len() - 1])
        }
        _ => Err(ScriptError::UnsupportedScript),
    }
}

struct SignatureChecker<'a> {
    tx: &'a Transaction,
    input_index: usize,
    script_code: &'a [u8],
    amount: Amount,
}

impl SignatureChecker<'_> {
    fn check_sig(&self, sig_bytes: &[u8], pubkey_bytes: &[u8]) -> Result<(), ScriptError> {
        let (&hash_type, der) = sig_bytes.split_last().ok_or(ScriptError::SigCheck)?;
        let sighash_type = SighashType(u32::from(hash_type));
        if !sighash_type.is_defined() {
            return Err(ScriptError::SigHashType);
        }

        let sig = Signature::from_der(der).map_err(|_| ScriptError::SigEncoding)?;
        let mut normalized = sig;
        normalized.normalize_s();
        if normalized != sig {
            return Err(ScriptError::SigHighS);
        }

        let pubkey = PublicKey::from_slice(pubkey_bytes).map_err(|_| ScriptError::PubkeyEncoding)?;
        let sighash = signature_hash(
            self.tx,
            self.input_index,
            self.script_code,
            self.amount,
            sighash_type,
        )?;
        let msg = Message::from_digest(sighash);
        secp256k1_verify()
            .verify_ecdsa(&msg, &sig, &pubkey)
            .map_err(|_| ScriptError::SigCheck)
    }
}
