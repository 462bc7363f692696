// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gas schedule, metering and refund arithmetic.

use alloy::primitives::U256;

use crate::models::RelayRequest;

/// Gas costs charged for a relay attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSchedule {
    /// Flat cost of the outer transaction
    pub base: u64,
    pub calldata_zero_byte: u64,
    pub calldata_nonzero_byte: u64,
    /// Recovery and membership check per signature
    pub per_signature: u64,
    /// Cost of paying the refund itself
    pub refund_overhead: u64,
    pub sload: u64,
    pub sstore_set: u64,
    pub sstore_reset: u64,
    pub transfer: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            base: 21_000,
            calldata_zero_byte: 4,
            calldata_nonzero_byte: 16,
            per_signature: 6_000,
            refund_overhead: 10_000,
            sload: 2_100,
            sstore_set: 20_000,
            sstore_reset: 5_000,
            transfer: 9_000,
        }
    }
}

impl GasSchedule {
    pub fn calldata_gas(&self, data: &[u8]) -> u64 {
        data.iter()
            .map(|byte| {
                if *byte == 0 {
                    self.calldata_zero_byte
                } else {
                    self.calldata_nonzero_byte
                }
            })
            .fold(0u64, u64::saturating_add)
    }

    /// Gas consumed before the module runs: base, call data and signatures.
    pub fn intrinsic_gas(&self, request: &RelayRequest) -> u64 {
        let signatures = u64::try_from(request.signatures.len()).unwrap_or(u64::MAX);
        self.base
            .saturating_add(self.calldata_gas(&request.data))
            .saturating_add(self.per_signature.saturating_mul(signatures))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("out of gas: needed {needed}, remaining {remaining}")]
pub struct OutOfGas {
    pub needed: u64,
    pub remaining: u64,
}

/// Gas meter for a single module execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Charge `amount`. On failure the meter is exhausted.
    pub fn charge(&mut self, amount: u64) -> Result<(), OutOfGas> {
        let remaining = self.remaining();
        if amount > remaining {
            self.used = self.limit;
            return Err(OutOfGas {
                needed: amount,
                remaining,
            });
        }
        self.used += amount;
        Ok(())
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// Amount owed to the relayer.
///
/// `min(gas_used, gas_limit) * min(signed_price, paid_price)`.
pub fn refund_amount(gas_used: u64, gas_limit: u64, signed_price: U256, paid_price: U256) -> U256 {
    let gas = U256::from(gas_used.min(gas_limit));
    gas.saturating_mul(signed_price.min(paid_price))
}
