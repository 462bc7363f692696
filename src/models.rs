// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relay request, submission context and outcome types.

use std::fmt;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// Default gas limit signed into requests built with [`RelayRequest::new`].
pub const DEFAULT_GAS_LIMIT: u64 = 2_000_000;

/// Asset held by accounts and used to pay relayer refunds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Asset {
    /// Native chain currency
    #[default]
    Native,
    /// ERC-20 token (contract address)
    Erc20(Address),
}

impl Asset {
    /// Address bound into the sign hash for this asset (zero for native).
    pub fn token_address(&self) -> Address {
        match self {
            Asset::Native => Address::ZERO,
            Asset::Erc20(token) => *token,
        }
    }

    /// One-byte kind tag, so a token at the zero address never encodes like
    /// the native currency.
    pub fn kind_tag(&self) -> u8 {
        match self {
            Asset::Native => 0x00,
            Asset::Erc20(_) => 0x01,
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "native"),
            Asset::Erc20(token) => write!(f, "erc20 {token}"),
        }
    }
}

/// One signature of a relayed request together with the address that
/// claims to have produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySignature {
    /// Declared signer
    pub signer: Address,
    /// 65-byte `r || s || v` ECDSA signature over the request's sign hash
    pub signature: Bytes,
}

/// A pre-signed module call submitted by a relayer.
///
/// Every field except `signatures` is bound into the sign hash, so changing
/// any of them after signing invalidates the signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    /// Target wallet
    pub wallet: Address,
    /// Module to invoke
    pub module: Address,
    /// ABI call data: selector followed by arguments, the first being the wallet
    pub data: Bytes,
    /// Signatures sorted by ascending signer address
    pub signatures: Vec<RelaySignature>,
    /// Refund recipient; `None` pays whoever submits the request
    pub refund_address: Option<Address>,
    /// Asset the refund is paid in
    pub refund_token: Asset,
    /// Maximum gas price the wallet agrees to refund
    pub gas_price: U256,
    /// Maximum gas the wallet agrees to refund
    pub gas_limit: u64,
    /// Replay-protection nonce
    pub nonce: U256,
}

impl RelayRequest {
    /// Create an unsigned request with no refund (zero gas price).
    pub fn new(wallet: Address, module: Address, data: impl Into<Bytes>, nonce: U256) -> Self {
        Self {
            wallet,
            module,
            data: data.into(),
            signatures: Vec::new(),
            refund_address: None,
            refund_token: Asset::Native,
            gas_price: U256::ZERO,
            gas_limit: DEFAULT_GAS_LIMIT,
            nonce,
        }
    }

    /// Set the signed gas price and gas limit.
    pub fn with_gas(mut self, gas_price: U256, gas_limit: u64) -> Self {
        self.gas_price = gas_price;
        self.gas_limit = gas_limit;
        self
    }

    /// Pay the refund to a fixed address instead of the submitter.
    pub fn with_refund_address(mut self, refund_address: Address) -> Self {
        self.refund_address = Some(refund_address);
        self
    }

    /// Pay the refund in the given asset.
    pub fn with_refund_token(mut self, token: Asset) -> Self {
        self.refund_token = token;
        self
    }

    /// Address that receives the refund when submitted by `relayer`.
    ///
    /// A zero refund address signs the same as `None` and pays the relayer.
    pub fn refund_recipient(&self, relayer: Address) -> Address {
        self.refund_address
            .filter(|address| !address.is_zero())
            .unwrap_or(relayer)
    }
}

/// Environment of a single relay attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayContext {
    /// Address submitting the request
    pub relayer: Address,
    /// Gas price actually paid by the relayer for the submission
    pub gas_price: U256,
    /// Current block number
    pub block_number: u64,
}

impl RelayContext {
    pub fn new(relayer: Address, gas_price: U256) -> Self {
        Self {
            relayer,
            gas_price,
            block_number: 0,
        }
    }

    pub fn at_block(mut self, block_number: u64) -> Self {
        self.block_number = block_number;
        self
    }
}

/// Coarse classification of a completed relay attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayStatus {
    Succeeded,
    ExecutionFailed,
    RefundFailed,
    ExecutionAndRefundFailed,
}

/// Result of a relay attempt that got past signature verification.
///
/// Execution and refund are independent: a failed module call is still
/// refunded, and a failed refund never undoes the module's effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    /// Sign hash of the relayed request
    pub sign_hash: B256,
    /// Nonce consumed by the attempt
    pub nonce: U256,
    /// Whether the module call succeeded
    pub execution_success: bool,
    /// Module failure reason
    pub execution_error: Option<String>,
    /// Data returned by the module on success
    pub return_data: Bytes,
    /// Whether the refund was paid
    pub refund_success: bool,
    /// Refund failure reason
    pub refund_error: Option<String>,
    /// Amount owed to the refund recipient
    pub refund_amount: U256,
    /// Who the refund was (or would have been) paid to
    pub refund_recipient: Address,
    /// Gas charged for the attempt
    pub gas_used: u64,
}

impl RelayOutcome {
    pub fn status(&self) -> RelayStatus {
        match (self.execution_success, self.refund_success) {
            (true, true) => RelayStatus::Succeeded,
            (false, true) => RelayStatus::ExecutionFailed,
            (true, false) => RelayStatus::RefundFailed,
            (false, false) => RelayStatus::ExecutionAndRefundFailed,
        }
    }
}
