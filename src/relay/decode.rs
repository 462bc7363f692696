// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shape validation of relayed call data.

use alloy::primitives::{Address, Bytes, B256};

use crate::error::RelayError;

/// Selector plus the first ABI word.
pub const MIN_CALL_DATA_LEN: usize = 4 + 32;

/// A module call split into selector and wallet argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCall {
    pub selector: [u8; 4],
    /// First ABI argument, expected to encode the target wallet
    pub wallet_word: B256,
    /// Full call data, selector included
    pub data: Bytes,
}

impl DecodedCall {
    /// Whether the first argument is exactly the ABI encoding of `wallet`.
    pub fn targets(&self, wallet: &Address) -> bool {
        self.wallet_word == wallet.into_word()
    }

    /// ABI-encoded arguments after the selector.
    pub fn args(&self) -> &[u8] {
        &self.data[4..]
    }
}

pub fn decode(data: &Bytes) -> Result<DecodedCall, RelayError> {
    if data.len() < MIN_CALL_DATA_LEN {
        return Err(RelayError::InvalidData(format!(
            "call data is {} bytes, need at least {MIN_CALL_DATA_LEN}",
            data.len()
        )));
    }

    let mut selector = [0u8; 4];
    selector.copy_from_slice(&data[..4]);

    Ok(DecodedCall {
        selector,
        wallet_word: B256::from_slice(&data[4..MIN_CALL_DATA_LEN]),
        data: data.clone(),
    })
}
