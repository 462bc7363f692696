// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process replay store.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use alloy::primitives::{Address, U256};

use super::{split_nonce, NonceScheme, NonceState, ReplayStore, ReplayStoreResult};
use crate::error::RelayError;

#[derive(Debug, Default)]
struct WalletNonces {
    state: NonceState,
    /// Consumed windowed nonces at or above the floor
    consumed: BTreeSet<U256>,
}

/// Replay store kept in memory behind a mutex.
#[derive(Debug)]
pub struct MemoryReplayStore {
    scheme: NonceScheme,
    wallets: Mutex<HashMap<Address, WalletNonces>>,
}

impl MemoryReplayStore {
    pub fn new(scheme: NonceScheme) -> Self {
        Self {
            scheme,
            wallets: Mutex::new(HashMap::new()),
        }
    }

    pub fn scheme(&self) -> NonceScheme {
        self.scheme
    }
}

impl Default for MemoryReplayStore {
    fn default() -> Self {
        Self::new(NonceScheme::Sequential)
    }
}

impl ReplayStore for MemoryReplayStore {
    fn check_and_consume(
        &self,
        wallet: &Address,
        nonce: U256,
        block_number: u64,
    ) -> Result<(), RelayError> {
        let mut wallets = self.wallets.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = wallets.entry(*wallet).or_default();

        entry.state.admit(self.scheme, wallet, nonce, block_number)?;

        if self.scheme.is_windowed() {
            if !entry.consumed.insert(nonce) {
                return Err(RelayError::DuplicateRequest {
                    wallet: *wallet,
                    nonce,
                });
            }
            entry.state.record(self.scheme, nonce);
            let floor = entry.state.floor;
            entry.consumed.retain(|seen| split_nonce(*seen).0 >= floor);
        } else {
            entry.state.record(self.scheme, nonce);
        }
        Ok(())
    }

    fn next_nonce(&self, wallet: &Address) -> ReplayStoreResult<U256> {
        let wallets = self.wallets.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(wallets
            .get(wallet)
            .map(|entry| entry.state.next)
            .unwrap_or_default())
    }

    fn last_consumed(&self, wallet: &Address) -> ReplayStoreResult<Option<U256>> {
        let wallets = self.wallets.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(wallets.get(wallet).and_then(|entry| entry.state.last))
    }
}
