// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signature recovery and signer-policy enforcement.

use alloy::primitives::{Address, Signature, B256};

use super::policy::{guardian_majority, SignaturePolicy, SignatureRequirement};
use crate::error::RelayError;
use crate::models::RelaySignature;
use crate::wallet::Wallet;

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LEN: usize = 65;

/// Verified signers of a request, strictly ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignerSet {
    signers: Vec<Address>,
}

impl SignerSet {
    pub fn as_slice(&self) -> &[Address] {
        &self.signers
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    pub fn contains(&self, account: &Address) -> bool {
        self.signers.binary_search(account).is_ok()
    }
}

/// Recover the signer of one signature.
pub fn recover_signer(sign_hash: &B256, signature: &[u8]) -> Result<Address, RelayError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(RelayError::InvalidSignatures(format!(
            "signature is {} bytes, expected {SIGNATURE_LEN}",
            signature.len()
        )));
    }
    if !matches!(signature[64], 0 | 1 | 27 | 28) {
        return Err(RelayError::InvalidSignatures(format!(
            "unsupported recovery id {}",
            signature[64]
        )));
    }

    let signature = Signature::from_raw(signature)
        .map_err(|e| RelayError::InvalidSignatures(format!("malformed signature: {e}")))?;
    if signature.normalize_s().is_some() {
        return Err(RelayError::InvalidSignatures(
            "signature s value is not canonical".into(),
        ));
    }

    signature
        .recover_address_from_prehash(sign_hash)
        .map_err(|e| RelayError::InvalidSignatures(format!("recovery failed: {e}")))
}

/// Recover every signer, checking declared addresses and ascending order.
pub fn recover_signers(
    sign_hash: &B256,
    signatures: &[RelaySignature],
) -> Result<SignerSet, RelayError> {
    let mut signers: Vec<Address> = Vec::with_capacity(signatures.len());

    for (index, entry) in signatures.iter().enumerate() {
        let recovered = recover_signer(sign_hash, &entry.signature)?;
        if recovered != entry.signer {
            return Err(RelayError::InvalidSignatures(format!(
                "signature {index} was produced by {recovered}, not {}",
                entry.signer
            )));
        }
        if let Some(previous) = signers.last() {
            if recovered <= *previous {
                return Err(RelayError::InvalidSignatures(format!(
                    "signature {index} is not in strictly ascending signer order"
                )));
            }
        }
        signers.push(recovered);
    }

    Ok(SignerSet { signers })
}

/// Verify `signatures` against `requirement` and the wallet's current owner
/// and guardians.
///
/// A module may demand more signatures than its policy implies for the
/// wallet's guardian count, never fewer.
pub fn verify(
    requirement: &SignatureRequirement,
    wallet: &Wallet,
    sign_hash: &B256,
    signatures: &[RelaySignature],
) -> Result<SignerSet, RelayError> {
    if requirement.policy == SignaturePolicy::Anyone {
        return Ok(SignerSet::default());
    }
    requirement.check_count(signatures.len())?;

    let minimum = SignatureRequirement::for_policy(requirement.policy, wallet.guardian_count());
    if requirement.required_signatures < minimum.required_signatures {
        return Err(RelayError::WrongSignerCount {
            required: minimum.required_signatures,
            provided: signatures.len(),
        });
    }

    let signers = recover_signers(sign_hash, signatures)?;
    check_membership(requirement.policy, wallet, &signers)?;
    Ok(signers)
}

fn check_membership(
    policy: SignaturePolicy,
    wallet: &Wallet,
    signers: &SignerSet,
) -> Result<(), RelayError> {
    let owner = wallet.owner();

    match policy {
        SignaturePolicy::Anyone => Ok(()),
        SignaturePolicy::OwnerOnly => {
            if signers.as_slice() == [owner] {
                Ok(())
            } else {
                Err(RelayError::InvalidSignatures(
                    "signer is not the wallet owner".into(),
                ))
            }
        }
        SignaturePolicy::OwnerAndGuardians => {
            if !signers.contains(&owner) {
                return Err(RelayError::InvalidSignatures(
                    "owner signature is missing".into(),
                ));
            }
            guardian_quorum(wallet, signers.as_slice().iter().filter(|s| **s != owner))
        }
        SignaturePolicy::GuardianMajority => {
            if signers.contains(&owner) {
                return Err(RelayError::InvalidSignatures(
                    "owner may not sign a guardian-only call".into(),
                ));
            }
            guardian_quorum(wallet, signers.as_slice().iter())
        }
    }
}

/// Every signer must be a current guardian and together they must form a
/// strict majority of the guardian set.
fn guardian_quorum<'a>(
    wallet: &Wallet,
    signers: impl Iterator<Item = &'a Address>,
) -> Result<(), RelayError> {
    let mut approvals = 0;
    for signer in signers {
        if !wallet.is_guardian(signer) {
            return Err(RelayError::InvalidSignatures(format!(
                "{signer} is not a guardian"
            )));
        }
        approvals += 1;
    }

    let majority = guardian_majority(wallet.guardian_count());
    if approvals < majority {
        return Err(RelayError::InvalidSignatures(format!(
            "{approvals} guardian signatures, a majority needs {majority}"
        )));
    }
    Ok(())
}
