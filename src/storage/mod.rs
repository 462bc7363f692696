// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Replay protection and audit storage.
//!
//! ## Nonce schemes
//!
//! A nonce is a 256-bit value. Its high 128 bits are a block component and
//! its low 128 bits a sequence component.
//!
//! - **Sequential**: the nonce must equal the wallet's next value, starting
//!   at zero. Anything lower was consumed already; anything higher leaves a
//!   gap and is refused without being consumed.
//! - **Windowed**: any unseen `(block, sequence)` pair whose block component
//!   is at or above the wallet's floor and at most `block_bound` blocks ahead
//!   of the chain. Consuming a nonce raises the floor to `block - window`,
//!   so the set of remembered pairs stays bounded.
//!
//! Both stores check and consume in one atomic step, and a consumed nonce
//! is never released.

pub mod audit;
pub mod memory;
pub mod replay_db;

use alloy::primitives::{Address, U256};

use crate::error::RelayError;

pub use audit::{AuditEvent, AuditEventType, AuditLog, DEFAULT_AUDIT_CAPACITY};
pub use memory::MemoryReplayStore;
pub use replay_db::RedbReplayStore;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ReplayStoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt nonce record for {wallet}: {reason}")]
    Corrupt { wallet: Address, reason: String },
}

pub type ReplayStoreResult<T> = Result<T, ReplayStoreError>;

// =============================================================================
// Scheme
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceScheme {
    Sequential,
    Windowed {
        /// How many blocks ahead of the chain a block component may be
        block_bound: u64,
        /// How far the floor trails the highest consumed block component
        window: u128,
    },
}

impl NonceScheme {
    pub fn is_windowed(&self) -> bool {
        matches!(self, NonceScheme::Windowed { .. })
    }
}

/// Split a nonce into its block and sequence components.
pub fn split_nonce(nonce: U256) -> (u128, u128) {
    let high: U256 = nonce >> 128;
    let low: U256 = nonce & U256::from(u128::MAX);
    (high.to::<u128>(), low.to::<u128>())
}

/// Build a nonce from block and sequence components.
pub fn compose_nonce(block: u128, sequence: u128) -> U256 {
    (U256::from(block) << 128) | U256::from(sequence)
}

// =============================================================================
// Replay Guard
// =============================================================================

/// Per-wallet nonce store.
pub trait ReplayStore: Send + Sync {
    /// Atomically check `nonce` for `wallet` and consume it.
    ///
    /// Fails with [`RelayError::DuplicateRequest`] for consumed nonces and
    /// [`RelayError::InvalidNonce`] for nonces that are not usable yet.
    fn check_and_consume(
        &self,
        wallet: &Address,
        nonce: U256,
        block_number: u64,
    ) -> Result<(), RelayError>;

    /// Next nonce a fresh request should use.
    fn next_nonce(&self, wallet: &Address) -> ReplayStoreResult<U256>;

    /// Most recently consumed nonce.
    fn last_consumed(&self, wallet: &Address) -> ReplayStoreResult<Option<U256>>;
}

/// Per-wallet counters shared by both stores.
///
/// Consumed windowed pairs are tracked by each store separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct NonceState {
    /// Sequential: the only acceptable nonce. Windowed: highest consumed + 1.
    pub next: U256,
    /// Lowest acceptable block component (windowed only)
    pub floor: u128,
    pub last: Option<U256>,
}

/// `next (32) || floor (16) || has_last (1) || last (32)`
const NONCE_STATE_LEN: usize = 32 + 16 + 1 + 32;

impl NonceState {
    /// Whether `nonce` may be consumed, ignoring windowed pairs already seen.
    pub fn admit(
        &self,
        scheme: NonceScheme,
        wallet: &Address,
        nonce: U256,
        block_number: u64,
    ) -> Result<(), RelayError> {
        if nonce == U256::MAX {
            return Err(RelayError::InvalidNonce {
                nonce,
                reason: "nonce space exhausted".into(),
            });
        }

        match scheme {
            NonceScheme::Sequential => {
                if nonce < self.next {
                    return Err(RelayError::DuplicateRequest {
                        wallet: *wallet,
                        nonce,
                    });
                }
                if nonce > self.next {
                    return Err(RelayError::InvalidNonce {
                        nonce,
                        reason: format!("expected nonce {}", self.next),
                    });
                }
            }
            NonceScheme::Windowed { block_bound, .. } => {
                let (block, _) = split_nonce(nonce);
                if block < self.floor {
                    return Err(RelayError::DuplicateRequest {
                        wallet: *wallet,
                        nonce,
                    });
                }
                let horizon = u128::from(block_number.saturating_add(block_bound));
                if block > horizon {
                    return Err(RelayError::InvalidNonce {
                        nonce,
                        reason: format!("block component {block} is beyond block {horizon}"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Record `nonce` as consumed.
    pub fn record(&mut self, scheme: NonceScheme, nonce: U256) {
        self.last = Some(nonce);
        let after = nonce.saturating_add(U256::from(1));
        if after > self.next {
            self.next = after;
        }
        if let NonceScheme::Windowed { window, .. } = scheme {
            let (block, _) = split_nonce(nonce);
            self.floor = self.floor.max(block.saturating_sub(window));
        }
    }

    pub fn encode(&self) -> [u8; NONCE_STATE_LEN] {
        let mut out = [0u8; NONCE_STATE_LEN];
        out[..32].copy_from_slice(&self.next.to_be_bytes::<32>());
        out[32..48].copy_from_slice(&self.floor.to_be_bytes());
        if let Some(last) = self.last {
            out[48] = 1;
            out[49..].copy_from_slice(&last.to_be_bytes::<32>());
        }
        out
    }

    pub fn decode(wallet: &Address, bytes: &[u8]) -> ReplayStoreResult<Self> {
        if bytes.len() != NONCE_STATE_LEN {
            return Err(ReplayStoreError::Corrupt {
                wallet: *wallet,
                reason: format!("record is {} bytes", bytes.len()),
            });
        }
        let mut floor = [0u8; 16];
        floor.copy_from_slice(&bytes[32..48]);
        let last = match bytes[48] {
            0 => None,
            1 => Some(U256::from_be_slice(&bytes[49..])),
            flag => {
                return Err(ReplayStoreError::Corrupt {
                    wallet: *wallet,
                    reason: format!("invalid flag {flag}"),
                })
            }
        };
        Ok(Self {
            next: U256::from_be_slice(&bytes[..32]),
            floor: u128::from_be_bytes(floor),
            last,
        })
    }
}
