// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signer policies declared by modules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::modules::Module;
use crate::wallet::Wallet;

/// Who must sign a relayed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignaturePolicy {
    /// No signature needed
    Anyone,
    /// The owner alone
    OwnerOnly,
    /// The owner plus a majority of guardians
    OwnerAndGuardians,
    /// A majority of guardians, owner excluded
    GuardianMajority,
}

impl fmt::Display for SignaturePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignaturePolicy::Anyone => "anyone",
            SignaturePolicy::OwnerOnly => "owner_only",
            SignaturePolicy::OwnerAndGuardians => "owner_and_guardians",
            SignaturePolicy::GuardianMajority => "guardian_majority",
        };
        f.write_str(name)
    }
}

/// Strict majority of `guardian_count` guardians: `ceil((n + 1) / 2)`.
pub fn guardian_majority(guardian_count: usize) -> usize {
    guardian_count / 2 + 1
}

/// A policy together with the exact number of signatures it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureRequirement {
    pub policy: SignaturePolicy,
    pub required_signatures: usize,
}

impl SignatureRequirement {
    pub fn new(policy: SignaturePolicy, required_signatures: usize) -> Self {
        Self {
            policy,
            required_signatures,
        }
    }

    /// Requirement derived from the policy and the wallet's guardian count.
    pub fn for_policy(policy: SignaturePolicy, guardian_count: usize) -> Self {
        let required_signatures = match policy {
            SignaturePolicy::Anyone => 0,
            SignaturePolicy::OwnerOnly => 1,
            SignaturePolicy::OwnerAndGuardians => 1 + guardian_majority(guardian_count),
            SignaturePolicy::GuardianMajority => guardian_majority(guardian_count),
        };
        Self::new(policy, required_signatures)
    }

    pub fn anyone() -> Self {
        Self::new(SignaturePolicy::Anyone, 0)
    }

    pub fn owner_only() -> Self {
        Self::new(SignaturePolicy::OwnerOnly, 1)
    }

    /// Check the number of provided signatures against the requirement.
    ///
    /// `Anyone` accepts any count; its signatures are ignored.
    pub fn check_count(&self, provided: usize) -> Result<(), RelayError> {
        if self.policy == SignaturePolicy::Anyone {
            return Ok(());
        }
        if self.required_signatures == 0 || provided != self.required_signatures {
            return Err(RelayError::WrongSignerCount {
                required: self.required_signatures,
                provided,
            });
        }
        Ok(())
    }
}

/// Ask `module` for the requirement of `selector` on `wallet`.
pub fn resolve(
    module: &dyn Module,
    selector: [u8; 4],
    wallet: &Wallet,
) -> Result<SignatureRequirement, RelayError> {
    module
        .signature_requirement(selector, wallet)
        .ok_or_else(|| {
            RelayError::NotAuthorized(format!(
                "{} does not relay selector 0x{}",
                module.name(),
                alloy::primitives::hex::encode(selector)
            ))
        })
}
