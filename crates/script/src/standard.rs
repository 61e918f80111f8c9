//! Standard script classification and construction.

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_IF: u8 = 0x63;
pub const OP_ELSE: u8 = 0x67;
pub const OP_ENDIF: u8 = 0x68;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_SHA256: u8 = 0xa8;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
/// Pushes true when the spending transaction is a coinstake.
pub const OP_ISCOINSTAKE: u8 = 0xb8;

const P2PKH_LEN: usize = 25;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScriptType {
    P2Pk,
    P2Pkh,
    /// Like P2PKH, committing to the sha256 of the key.
    P2Pkh256,
    P2Sh,
    /// `OP_ISCOINSTAKE OP_IF <stake> OP_ELSE <spend> OP_ENDIF`
    Coinstake,
    NullData,
    Unknown,
}

pub fn classify_script_pubkey(script: &[u8]) -> ScriptType {
    if is_p2pkh(script) {
        ScriptType::P2Pkh
    } else if is_p2pkh256(script) {
        ScriptType::P2Pkh256
    } else if is_p2sh(script) {
        ScriptType::P2Sh
    } else if is_p2pk(script) {
        ScriptType::P2Pk
    } else if split_coinstake_script(script).is_some() {
        ScriptType::Coinstake
    } else if script.first() == Some(&OP_RETURN) {
        ScriptType::NullData
    } else {
        ScriptType::Unknown
    }
}

/// True when the script starts with `OP_ISCOINSTAKE`, regardless of what follows.
pub fn has_is_coinstake_op(script: &[u8]) -> bool {
    script.first() == Some(&OP_ISCOINSTAKE)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CoinstakeScript<'a> {
    pub stake: &'a [u8],
    pub spend: &'a [u8],
}

/// Splits a coinstake-opcode script into its branches. The stake branch must be
/// P2PKH; the spend branch is whatever sits between `OP_ELSE` and `OP_ENDIF`.
pub fn split_coinstake_script(script: &[u8]) -> Option<CoinstakeScript<'_>> {
    let else_pos = 2 + P2PKH_LEN;
    if script.len() < else_pos + 2
        || script[0] != OP_ISCOINSTAKE
        || script[1] != OP_IF
        || script[else_pos] != OP_ELSE
        || script[script.len() - 1] != OP_ENDIF
    {
        return None;
    }
    let stake = &script[2..else_pos];
    let spend = &script[else_pos + 1..script.len() - 1];
    if !is_p2pkh(stake) || spend.is_empty() {
        return None;
    }
    Some(CoinstakeScript { stake, spend })
}

pub fn is_p2pkh(script: &[u8]) -> bool {
    script.len() == P2PKH_LEN
        && script[0] == OP_DUP
        && script[1] == OP_HASH160
        && script[2] == 0x14
        && script[23] == OP_EQUALVERIFY
        && script[24] == OP_CHECKSIG
}

pub fn is_p2pkh256(script: &[u8]) -> bool {
    script.len() == 37
        && script[0] == OP_DUP
        && script[1] == OP_SHA256
        && script[2] == 0x20
        && script[35] == OP_EQUALVERIFY
        && script[36] == OP_CHECKSIG
}

fn is_p2sh(script: &[u8]) -> bool {
    script.len() == 23 && script[0] == OP_HASH160 && script[1] == 0x14 && script[22] == OP_EQUAL
}

fn is_p2pk(script: &[u8]) -> bool {
    match script.first().copied() {
        Some(len @ (33 | 65)) => {
            script.len() == len as usize + 2 && script[script.len() - 1] == OP_CHECKSIG
        }
        _ => false,
    }
}

pub fn p2pkh_script(key_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2PKH_LEN);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, 0x14]);
    script.extend_from_slice(key_hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

pub fn p2pkh256_script(key_hash: &[u8; 32]) -> Vec<u8> {
    let mut script = Vec::with_capacity(37);
    script.extend_from_slice(&[OP_DUP, OP_SHA256, 0x20]);
    script.extend_from_slice(key_hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

pub fn p2pk_script(pubkey: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(pubkey.len() + 2);
    script.push(pubkey.len() as u8);
    script.extend_from_slice(pubkey);
    script.push(OP_CHECKSIG);
    script
}

pub fn coinstake_script(stake: &[u8], spend: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(stake.len() + spend.len() + 4);
    script.extend_from_slice(&[OP_ISCOINSTAKE, OP_IF]);
    script.extend_from_slice(stake);
    script.push(OP_ELSE);
    script.extend_from_slice(spend);
    script.push(OP_ENDIF);
    script
}

/// Parses a push-only script into its pushed items. Returns `None` if any
/// opcode is not a data push.
pub fn parse_pushes(script: &[u8]) -> Option<Vec<Vec<u8>>> {
    let mut items = Vec::new();
    let mut pos = 0usize;
    while pos < script.len() {
        let opcode = script[pos];
        pos += 1;
        let len = match opcode {
            OP_0 => 0,
            0x01..=0x4b => opcode as usize,
            OP_PUSHDATA1 => {
                let len = *script.get(pos)? as usize;
                pos += 1;
                len
            }
            OP_PUSHDATA2 => {
                let bytes = script.get(pos..pos + 2)?;
                pos += 2;
                u16::from_le_bytes([bytes[0], bytes[1]]) as usize
            }
            OP_PUSHDATA4 => {
                let bytes = script.get(pos..pos + 4)?;
                pos += 4;
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
            }
            _ => return None,
        };
        let data = script.get(pos..pos.checked_add(len)?)?;
        pos += len;
        items.push(data.to_vec());
    }
    Some(items)
}
