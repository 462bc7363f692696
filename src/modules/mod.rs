// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Module capability interface.
//!
//! A module is a piece of wallet logic addressed by the relay. It declares,
//! per entry point, which signatures a relayed call needs, and executes the
//! call against an [`ExecutionContext`] holding a working copy of the wallet.
//! Entry points take the wallet as their first ABI argument.

pub mod context;

use alloy::primitives::{hex, Bytes};

use crate::relay::decode::DecodedCall;
use crate::relay::gas::OutOfGas;
use crate::relay::policy::SignatureRequirement;
use crate::wallet::{Wallet, WalletError};

pub use context::ExecutionContext;

/// Errors raised by module code. Any of them fails the execution and rolls
/// back the working copy.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("reverted: {0}")]
    Revert(String),

    #[error("unknown selector 0x{}", hex::encode(.0))]
    UnknownSelector([u8; 4]),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    OutOfGas(#[from] OutOfGas),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl ModuleError {
    pub fn revert(reason: impl Into<String>) -> Self {
        ModuleError::Revert(reason.into())
    }
}

impl From<alloy::sol_types::Error> for ModuleError {
    fn from(err: alloy::sol_types::Error) -> Self {
        ModuleError::InvalidArguments(err.to_string())
    }
}

/// Wallet logic reachable through the relay.
pub trait Module: Send + Sync {
    /// Human readable name, used in logs.
    fn name(&self) -> &str;

    /// Signatures required to relay a call to `selector` on `wallet`.
    ///
    /// `None` means the module does not expose the selector through the relay.
    fn signature_requirement(
        &self,
        selector: [u8; 4],
        wallet: &Wallet,
    ) -> Option<SignatureRequirement>;

    /// Execute a relayed call.
    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        call: &DecodedCall,
    ) -> Result<Bytes, ModuleError>;
}
