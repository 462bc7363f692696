// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relay error taxonomy.
//!
//! [`RelayError`] aborts an attempt. Module failures and refund failures are
//! never attempt-aborting: they are captured as [`ExecutionError`] and
//! [`RefundError`] and reported as data inside the
//! [`RelayOutcome`](crate::models::RelayOutcome).

use alloy::primitives::{Address, U256};

use crate::modules::ModuleError;
use crate::storage::ReplayStoreError;
use crate::wallet::WalletError;

/// Errors that abort a relay attempt.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The relayed call data is malformed (shorter than selector + wallet word).
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The request targets a wallet the ledger does not know.
    #[error("unknown wallet: {0}")]
    UnknownWallet(Address),

    /// The module is not authorised for the wallet, not approved, or the call
    /// does not act on the request's wallet.
    #[error("module not authorised: {0}")]
    NotAuthorized(String),

    /// A signature could not be recovered, is out of order, or was produced
    /// by an address the policy does not accept.
    #[error("invalid signatures: {0}")]
    InvalidSignatures(String),

    /// The number of signatures does not match the module's requirement.
    #[error("wrong number of signatures: required {required}, provided {provided}")]
    WrongSignerCount { required: usize, provided: usize },

    /// The nonce was already consumed for this wallet.
    #[error("duplicate request: nonce {nonce} already consumed for {wallet}")]
    DuplicateRequest { wallet: Address, nonce: U256 },

    /// The nonce is not acceptable yet (gap or block component too far ahead).
    #[error("invalid nonce {nonce}: {reason}")]
    InvalidNonce { nonce: U256, reason: String },

    /// The replay store failed.
    #[error("replay store error: {0}")]
    Storage(#[from] ReplayStoreError),
}

impl RelayError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::InvalidData(_) => "invalid_data",
            RelayError::UnknownWallet(_) => "unknown_wallet",
            RelayError::NotAuthorized(_) => "not_authorized",
            RelayError::InvalidSignatures(_) => "invalid_signatures",
            RelayError::WrongSignerCount { .. } => "wrong_signer_count",
            RelayError::DuplicateRequest { .. } => "duplicate_request",
            RelayError::InvalidNonce { .. } => "invalid_nonce",
            RelayError::Storage(_) => "storage_error",
        }
    }
}

/// Failure of the module call itself. Reported, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error("module panicked: {0}")]
    Panicked(String),
}

/// Failure to pay the relayer. Reported, never propagated.
#[derive(Debug, thiserror::Error)]
#[error("refund failed: {source}")]
pub struct RefundError {
    #[from]
    source: WalletError,
}
