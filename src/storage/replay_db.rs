// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistent replay store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `nonce_state`: wallet address → encoded [`NonceState`]
//! - `consumed_nonces`: `wallet || nonce` → block number at consumption
//!   (windowed scheme only)
//!
//! Check and consumption run inside a single write transaction, so two
//! relayers racing on the same nonce cannot both succeed.

use std::path::Path;

use alloy::primitives::{Address, U256};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};

use super::{NonceScheme, NonceState, ReplayStore, ReplayStoreError, ReplayStoreResult};
use crate::error::RelayError;

// =============================================================================
// Table Definitions
// =============================================================================

/// Wallet address (20 bytes) → encoded nonce state.
const NONCE_STATE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("nonce_state");

/// Composite key `wallet (20) || nonce (32 BE)` → block number.
const CONSUMED_NONCES: TableDefinition<&[u8], u64> = TableDefinition::new("consumed_nonces");

fn consumed_key(wallet: &Address, nonce: U256) -> [u8; 52] {
    let mut key = [0u8; 52];
    key[..20].copy_from_slice(wallet.as_slice());
    key[20..].copy_from_slice(&nonce.to_be_bytes::<32>());
    key
}

// =============================================================================
// RedbReplayStore
// =============================================================================

pub struct RedbReplayStore {
    db: Database,
    scheme: NonceScheme,
}

impl RedbReplayStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path, scheme: NonceScheme) -> ReplayStoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(NONCE_STATE)?;
            let _ = write_txn.open_table(CONSUMED_NONCES)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), ?scheme, "Replay store opened");
        Ok(Self { db, scheme })
    }

    fn load_state(&self, wallet: &Address) -> ReplayStoreResult<NonceState> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NONCE_STATE)?;
        match table.get(wallet.as_slice())? {
            Some(value) => NonceState::decode(wallet, value.value()),
            None => Ok(NonceState::default()),
        }
    }

    /// Decide and stage the consumption inside `txn`.
    ///
    /// The outer result is a storage failure, the inner one the verdict.
    fn consume_in(
        &self,
        txn: &WriteTransaction,
        wallet: &Address,
        nonce: U256,
        block_number: u64,
    ) -> ReplayStoreResult<Result<(), RelayError>> {
        let mut states = txn.open_table(NONCE_STATE)?;
        let mut state = match states.get(wallet.as_slice())? {
            Some(value) => NonceState::decode(wallet, value.value())?,
            None => NonceState::default(),
        };

        if let Err(rejection) = state.admit(self.scheme, wallet, nonce, block_number) {
            return Ok(Err(rejection));
        }

        if self.scheme.is_windowed() {
            let mut consumed = txn.open_table(CONSUMED_NONCES)?;
            let key = consumed_key(wallet, nonce);
            if consumed.get(key.as_slice())?.is_some() {
                return Ok(Err(RelayError::DuplicateRequest {
                    wallet: *wallet,
                    nonce,
                }));
            }
            consumed.insert(key.as_slice(), block_number)?;

            state.record(self.scheme, nonce);
            self.prune_below_floor(&mut consumed, wallet, state.floor)?;
        } else {
            state.record(self.scheme, nonce);
        }

        states.insert(wallet.as_slice(), state.encode().as_slice())?;
        Ok(Ok(()))
    }

    /// Drop consumed pairs whose block component fell below the floor.
    fn prune_below_floor(
        &self,
        consumed: &mut redb::Table<'_, &'static [u8], u64>,
        wallet: &Address,
        floor: u128,
    ) -> ReplayStoreResult<()> {
        let start = consumed_key(wallet, U256::ZERO);
        let end = consumed_key(wallet, super::compose_nonce(floor, 0));

        let stale: Vec<Vec<u8>> = consumed
            .range(start.as_slice()..end.as_slice())?
            .map(|entry| entry.map(|(key, _)| key.value().to_vec()))
            .collect::<Result<_, _>>()?;
        for key in &stale {
            consumed.remove(key.as_slice())?;
        }
        Ok(())
    }
}

impl ReplayStore for RedbReplayStore {
    fn check_and_consume(
        &self,
        wallet: &Address,
        nonce: U256,
        block_number: u64,
    ) -> Result<(), RelayError> {
        let write_txn = self.db.begin_write().map_err(ReplayStoreError::from)?;
        match self.consume_in(&write_txn, wallet, nonce, block_number)? {
            Ok(()) => {
                write_txn.commit().map_err(ReplayStoreError::from)?;
                Ok(())
            }
            Err(rejection) => {
                write_txn.abort().map_err(ReplayStoreError::from)?;
                Err(rejection)
            }
        }
    }

    fn next_nonce(&self, wallet: &Address) -> ReplayStoreResult<U256> {
        Ok(self.load_state(wallet)?.next)
    }

    fn last_consumed(&self, wallet: &Address) -> ReplayStoreResult<Option<U256>> {
        Ok(self.load_state(wallet)?.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::compose_nonce;
    use tempfile::TempDir;

    fn open(dir: &TempDir, scheme: NonceScheme) -> RedbReplayStore {
        RedbReplayStore::open(&dir.path().join("relay").join("replay.redb"), scheme).unwrap()
    }

    #[test]
    fn consumed_nonces_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let wallet = Address::repeat_byte(1);
        {
            let store = open(&dir, NonceScheme::Sequential);
            store.check_and_consume(&wallet, U256::ZERO, 0).unwrap();
            store.check_and_consume(&wallet, U256::from(1), 0).unwrap();
        }

        let store = open(&dir, NonceScheme::Sequential);
        assert_eq!(store.next_nonce(&wallet).unwrap(), U256::from(2));
        assert_eq!(store.last_consumed(&wallet).unwrap(), Some(U256::from(1)));
        assert!(matches!(
            store.check_and_consume(&wallet, U256::from(1), 0),
            Err(RelayError::DuplicateRequest { .. })
        ));
    }

    #[test]
    fn rejected_nonce_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, NonceScheme::Sequential);
        let wallet = Address::repeat_byte(1);

        assert!(matches!(
            store.check_and_consume(&wallet, U256::from(3), 0),
            Err(RelayError::InvalidNonce { .. })
        ));
        assert_eq!(store.next_nonce(&wallet).unwrap(), U256::ZERO);
        assert_eq!(store.last_consumed(&wallet).unwrap(), None);
    }

    #[test]
    fn windowed_pairs_are_single_use() {
        let dir = TempDir::new().unwrap();
        let store = open(
            &dir,
            NonceScheme::Windowed {
                block_bound: 100,
                window: 8,
            },
        );
        let wallet = Address::repeat_byte(1);

        store
            .check_and_consume(&wallet, compose_nonce(30, 1), 20)
            .unwrap();
        store
            .check_and_consume(&wallet, compose_nonce(30, 0), 20)
            .unwrap();
        assert!(matches!(
            store.check_and_consume(&wallet, compose_nonce(30, 1), 20),
            Err(RelayError::DuplicateRequest { .. })
        ));
        assert!(matches!(
            store.check_and_consume(&wallet, compose_nonce(200, 0), 20),
            Err(RelayError::InvalidNonce { .. })
        ));
        assert_eq!(store.next_nonce(&wallet).unwrap(), compose_nonce(30, 2));
    }

    #[test]
    fn windowed_prunes_stale_pairs() {
        let dir = TempDir::new().unwrap();
        let store = open(
            &dir,
            NonceScheme::Windowed {
                block_bound: 1_000,
                window: 4,
            },
        );
        let wallet = Address::repeat_byte(1);

        store
            .check_and_consume(&wallet, compose_nonce(2, 0), 0)
            .unwrap();
        store
            .check_and_consume(&wallet, compose_nonce(20, 0), 0)
            .unwrap();

        let read_txn = store.db.begin_read().unwrap();
        let table = read_txn.open_table(CONSUMED_NONCES).unwrap();
        assert!(table
            .get(consumed_key(&wallet, compose_nonce(2, 0)).as_slice())
            .unwrap()
            .is_none());
        assert!(table
            .get(consumed_key(&wallet, compose_nonce(20, 0)).as_slice())
            .unwrap()
            .is_some());
        drop(table);
        drop(read_txn);

        assert!(matches!(
            store.check_and_consume(&wallet, compose_nonce(2, 0), 0),
            Err(RelayError::DuplicateRequest { .. })
        ));
    }
}
