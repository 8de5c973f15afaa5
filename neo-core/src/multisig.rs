//! M-of-N multi-signature scripts used for block witnesses and the
//! `next_consensus` address.

use crate::{LedgerError, LedgerResult, Witness, MAX_VALIDATORS};
use neo_crypto::{Crypto, ECPoint, Signature, SIGNATURE_SIZE};
use neo_primitives::UInt160;

const PUSHBYTES33: u8 = 0x21;
const PUSHBYTES64: u8 = 0x40;
const PUSH1: u8 = 0x51;
const CHECKMULTISIG: u8 = 0xae;

/// Signatures required out of `n` validators: `n - (n - 1) / 3`.
pub fn byzantine_quorum(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    n - (n - 1) / 3
}

fn emit_push_int(script: &mut Vec<u8>, value: usize) {
    if (1..=16).contains(&value) {
        script.push(PUSH1 - 1 + value as u8);
        return;
    }
    // minimal little-endian two's complement
    let mut bytes = value.to_le_bytes().to_vec();
    while bytes.len() > 1 && bytes[bytes.len() - 1] == 0 && bytes[bytes.len() - 2] & 0x80 == 0 {
        bytes.pop();
    }
    if bytes.last().is_some_and(|b| b & 0x80 != 0) {
        bytes.push(0);
    }
    script.push(bytes.len() as u8);
    script.extend_from_slice(&bytes);
}

fn sorted_keys(public_keys: &[ECPoint]) -> Vec<ECPoint> {
    let mut keys = public_keys.to_vec();
    keys.sort();
    keys
}

/// Builds `PUSH m, <keys sorted>, PUSH n, CHECKMULTISIG`.
pub fn create_multisig_script(m: usize, public_keys: &[ECPoint]) -> LedgerResult<Vec<u8>> {
    let n = public_keys.len();
    if m == 0 || m > n || n > MAX_VALIDATORS {
        return Err(LedgerError::InvalidMultiSig {
            message: format!("m = {m}, n = {n}"),
        });
    }
    let mut script = Vec::with_capacity(3 + n * 34);
    emit_push_int(&mut script, m);
    for key in sorted_keys(public_keys) {
        script.push(PUSHBYTES33);
        script.extend_from_slice(key.as_bytes());
    }
    emit_push_int(&mut script, n);
    script.push(CHECKMULTISIG);
    Ok(script)
}

/// Script hash of the BFT multi-signature contract for `validators`.
pub fn consensus_address(validators: &[ECPoint]) -> LedgerResult<UInt160> {
    let script = create_multisig_script(byzantine_quorum(validators.len()), validators)?;
    Ok(Crypto::hash160_uint(&script))
}

/// Assembles a witness from the first `m` signatures in sorted-key order.
///
/// Signatures from keys outside `public_keys` are ignored.
pub fn create_multisig_witness(
    m: usize,
    public_keys: &[ECPoint],
    signatures: &[(ECPoint, Signature)],
) -> LedgerResult<Witness> {
    let verification = create_multisig_script(m, public_keys)?;
    let mut invocation = Vec::with_capacity(m * (SIGNATURE_SIZE + 1));
    let mut count = 0;
    for key in sorted_keys(public_keys) {
        if count == m {
            break;
        }
        if let Some((_, sig)) = signatures.iter().find(|(k, _)| *k == key) {
            invocation.push(PUSHBYTES64);
            invocation.extend_from_slice(sig.as_bytes());
            count += 1;
        }
    }
    if count < m {
        return Err(LedgerError::InvalidMultiSig {
            message: format!("only {count} of {m} signatures available"),
        });
    }
    Ok(Witness::new(invocation, verification))
}

/// Checks a multi-signature witness over `message` the way CHECKMULTISIG
/// does: signatures must match keys in order, each key used at most once.
pub fn verify_multisig_witness(
    witness: &Witness,
    message: &[u8],
    m: usize,
    public_keys: &[ECPoint],
) -> bool {
    let Ok(expected) = create_multisig_script(m, public_keys) else {
        return false;
    };
    if witness.verification_script != expected {
        return false;
    }
    let invocation = &witness.invocation_script;
    if invocation.len() % (SIGNATURE_SIZE + 1) != 0 {
        return false;
    }
    let mut signatures = Vec::new();
    for chunk in invocation.chunks(SIGNATURE_SIZE + 1) {
        if chunk[0] != PUSHBYTES64 {
            return false;
        }
        match Signature::from_bytes(&chunk[1..]) {
            Ok(sig) => signatures.push(sig),
            Err(_) => return false,
        }
    }
    if signatures.len() < m {
        return false;
    }
    let keys = sorted_keys(public_keys);
    let (mut i, mut j) = (0, 0);
    while i < signatures.len() && j < keys.len() {
        if signatures[i].verify(message, &keys[j]) {
            i += 1;
        }
        j += 1;
        if signatures.len() - i > keys.len() - j {
            return false;
        }
    }
    i == signatures.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_crypto::KeyPair;

    #[test]
    fn quorum_values() {
        assert_eq!(byzantine_quorum(1), 1);
        assert_eq!(byzantine_quorum(4), 3);
        assert_eq!(byzantine_quorum(7), 5);
        assert_eq!(byzantine_quorum(10), 7);
    }

    #[test]
    fn script_layout() {
        let keys: Vec<_> = (0..4).map(|_| KeyPair::generate().public_key()).collect();
        let script = create_multisig_script(3, &keys).unwrap();
        assert_eq!(script[0], 0x53);
        assert_eq!(script[script.len() - 2], 0x54);
        assert_eq!(*script.last().unwrap(), CHECKMULTISIG);
        assert_eq!(script.len(), 3 + 4 * 34);
    }

    #[test]
    fn large_counts_use_push_bytes() {
        let mut script = Vec::new();
        emit_push_int(&mut script, 200);
        assert_eq!(script, vec![2, 200, 0]);
        script.clear();
        emit_push_int(&mut script, 17);
        assert_eq!(script, vec![1, 17]);
    }

    #[test]
    fn address_is_order_independent() {
        let keys: Vec<_> = (0..4).map(|_| KeyPair::generate().public_key()).collect();
        let mut reversed = keys.clone();
        reversed.reverse();
        assert_eq!(
            consensus_address(&keys).unwrap(),
            consensus_address(&reversed).unwrap()
        );
    }

    #[test]
    fn witness_verifies_with_quorum() {
        let pairs: Vec<_> = (0..4).map(|_| KeyPair::generate()).collect();
        let keys: Vec<_> = pairs.iter().map(KeyPair::public_key).collect();
        let message = b"header";
        let sigs: Vec<_> = pairs
            .iter()
            .skip(1)
            .map(|p| (p.public_key(), p.sign(message).unwrap()))
            .collect();
        let witness = create_multisig_witness(3, &keys, &sigs).unwrap();
        assert!(verify_multisig_witness(&witness, message, 3, &keys));
        assert!(!verify_multisig_witness(&witness, b"other", 3, &keys));
    }

    #[test]
    fn witness_needs_m_signatures() {
        let pairs: Vec<_> = (0..4).map(|_| KeyPair::generate()).collect();
        let keys: Vec<_> = pairs.iter().map(KeyPair::public_key).collect();
        let sigs: Vec<_> = pairs
            .iter()
            .take(2)
            .map(|p| (p.public_key(), p.sign(b"m").unwrap()))
            .collect();
        assert!(create_multisig_witness(3, &keys, &sigs).is_err());
    }
}
