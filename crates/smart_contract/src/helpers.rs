// Copyright (C) 2015-2025 The Neo Project.
//
// helpers.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Verification-script builders shared by witnesses, consensus and the
//! account syscalls.

use crate::error::{ContractError, ContractResult};
use crate::interop;
use neo3_core::UInt160;
use neo3_crypto::ECPoint;
use neo3_vm::ScriptBuilder;

/// The single-signature verification script for a compressed key.
pub fn signature_redeem_script(public_key: &[u8]) -> ContractResult<Vec<u8>> {
    if public_key.len() != 33 {
        return Err(ContractError::InvalidArgument(
            "public key must be 33 bytes".into(),
        ));
    }
    let mut builder = ScriptBuilder::new();
    builder.emit_push_bytes(public_key);
    builder.emit_syscall(interop::method_hash("System.Crypto.CheckSig"));
    Ok(builder.into_bytes())
}

/// The m-of-n multisig verification script. Keys are sorted into
/// canonical order before emission.
pub fn multisig_redeem_script(m: usize, public_keys: &[ECPoint]) -> ContractResult<Vec<u8>> {
    let n = public_keys.len();
    if m == 0 || m > n || n > 1024 {
        return Err(ContractError::InvalidArgument(format!(
            "invalid multisig shape {m}-of-{n}"
        )));
    }
    let mut sorted: Vec<&ECPoint> = public_keys.iter().collect();
    sorted.sort();
    let mut builder = ScriptBuilder::new();
    builder.emit_push_i64(m as i64);
    for key in sorted {
        builder.emit_push_bytes(key.as_bytes());
    }
    builder.emit_push_i64(n as i64);
    builder.emit_syscall(interop::method_hash("System.Crypto.CheckMultisig"));
    Ok(builder.into_bytes())
}

/// The account (script hash) of a single-signature key.
pub fn public_key_to_script_hash(public_key: &ECPoint) -> ContractResult<UInt160> {
    let script = signature_redeem_script(public_key.as_bytes())?;
    Ok(UInt160::from_script(&script))
}

/// The account of an m-of-n committee/validator multisig.
pub fn multisig_script_hash(m: usize, public_keys: &[ECPoint]) -> ContractResult<UInt160> {
    let script = multisig_redeem_script(m, public_keys)?;
    Ok(UInt160::from_script(&script))
}

/// Whether a script has the exact single-signature shape.
pub fn is_signature_contract(script: &[u8]) -> bool {
    script.len() == 40
        && script[0] == 0x0C
        && script[1] == 33
        && script[35] == 0x41
        && script[36..40] == interop::method_hash("System.Crypto.CheckSig").to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_crypto::KeyPair;

    #[test]
    fn test_signature_script_shape() {
        let pair = KeyPair::generate();
        let script = signature_redeem_script(pair.public_key().as_bytes()).unwrap();
        assert_eq!(script.len(), 40);
        assert!(is_signature_contract(&script));
    }

    #[test]
    fn test_multisig_is_order_insensitive() {
        let keys: Vec<_> = (0..4).map(|_| *KeyPair::generate().public_key()).collect();
        let mut shuffled = keys.clone();
        shuffled.reverse();
        assert_eq!(
            multisig_redeem_script(3, &keys).unwrap(),
            multisig_redeem_script(3, &shuffled).unwrap()
        );
    }

    #[test]
    fn test_multisig_shape_validation() {
        let keys: Vec<_> = (0..2).map(|_| *KeyPair::generate().public_key()).collect();
        assert!(multisig_redeem_script(0, &keys).is_err());
        assert!(multisig_redeem_script(3, &keys).is_err());
    }
}
