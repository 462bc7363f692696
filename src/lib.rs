// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Relay - Meta-transaction relay core for modular smart wallets
//!
//! A relayer submits a pre-signed module call on behalf of a wallet's owner
//! and guardians. The [`RelayManager`](relay::RelayManager) authenticates the
//! request, enforces the module's signer policy, burns the nonce, executes
//! the call in isolation and refunds the relayer from the wallet.
//!
//! ## Modules
//!
//! - `config` - Runtime configuration from the environment
//! - `error` - Relay error taxonomy
//! - `models` - Relay request, context and outcome types
//! - `modules` - Module capability trait and execution context
//! - `relay` - Decoding, signer policy, verification, gas and the dispatcher
//! - `signing` - Request signing helper for relayer clients
//! - `state` - Shared ledger handle
//! - `storage` - Replay guard stores (memory, redb) and audit trail
//! - `telemetry` - Tracing subscriber setup
//! - `wallet` - Wallet records, ledger and module registry

pub mod config;
pub mod error;
pub mod models;
pub mod modules;
pub mod relay;
pub mod signing;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use config::RelayConfig;
pub use error::{ExecutionError, RefundError, RelayError};
pub use models::{Asset, RelayContext, RelayOutcome, RelayRequest, RelaySignature, RelayStatus};
pub use relay::RelayManager;
