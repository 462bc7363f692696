// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet records, the ledger that owns them, and the module registry.
//!
//! A [`Wallet`] is a modular account: an owner, a set of guardians, the
//! modules allowed to act on it, balances and per-module storage. Every
//! mutation goes through methods that uphold the account invariants (the
//! owner is never a module or a guardian).

pub mod ledger;
pub mod registry;

use std::collections::{BTreeSet, HashMap};

use alloy::primitives::{Address, B256, U256};

use crate::models::Asset;

pub use ledger::Ledger;
pub use registry::{InMemoryModuleRegistry, ModuleRegistry};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("wallet already exists: {0}")]
    AlreadyExists(Address),

    #[error("unknown wallet: {0}")]
    UnknownWallet(Address),

    #[error("zero address is not allowed")]
    ZeroAddress,

    #[error("module is not registered: {0}")]
    ModuleNotRegistered(Address),

    #[error("module is already authorised: {0}")]
    ModuleAlreadyAuthorised(Address),

    #[error("module is not authorised: {0}")]
    ModuleNotAuthorised(Address),

    #[error("owner cannot be an authorised module")]
    OwnerIsModule,

    #[error("owner cannot be a guardian")]
    OwnerIsGuardian,

    #[error("guardian already added: {0}")]
    GuardianExists(Address),

    #[error("not a guardian: {0}")]
    NotGuardian(Address),

    #[error("wallet is locked")]
    Locked,

    #[error("insufficient {asset} balance: required {required}, available {available}")]
    InsufficientBalance {
        asset: Asset,
        required: U256,
        available: U256,
    },

    #[error("{asset} balance would overflow")]
    BalanceOverflow { asset: Asset },
}

// =============================================================================
// Balances
// =============================================================================

/// Native and token balances of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balances {
    native: U256,
    tokens: HashMap<Address, U256>,
}

impl Balances {
    pub fn of(&self, asset: Asset) -> U256 {
        match asset {
            Asset::Native => self.native,
            Asset::Erc20(token) => self.tokens.get(&token).copied().unwrap_or_default(),
        }
    }

    pub fn credit(&mut self, asset: Asset, amount: U256) -> Result<(), WalletError> {
        let total = self
            .of(asset)
            .checked_add(amount)
            .ok_or(WalletError::BalanceOverflow { asset })?;
        match asset {
            Asset::Native => self.native = total,
            Asset::Erc20(token) => {
                self.tokens.insert(token, total);
            }
        }
        Ok(())
    }

    pub fn debit(&mut self, asset: Asset, amount: U256) -> Result<(), WalletError> {
        let available = self.of(asset);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or(WalletError::InsufficientBalance {
                    asset,
                    required: amount,
                    available,
                })?;
        match asset {
            Asset::Native => self.native = remaining,
            Asset::Erc20(token) => {
                self.tokens.insert(token, remaining);
            }
        }
        Ok(())
    }
}

// =============================================================================
// Wallet
// =============================================================================

/// A modular smart wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    address: Address,
    owner: Address,
    modules: Vec<Address>,
    guardians: BTreeSet<Address>,
    balances: Balances,
    locked: bool,
    storage: HashMap<Address, HashMap<B256, B256>>,
}

impl Wallet {
    pub(crate) fn new(address: Address, owner: Address) -> Result<Self, WalletError> {
        if address.is_zero() || owner.is_zero() {
            return Err(WalletError::ZeroAddress);
        }
        Ok(Self {
            address,
            owner,
            modules: Vec::new(),
            guardians: BTreeSet::new(),
            balances: Balances::default(),
            locked: false,
            storage: HashMap::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Authorised modules, in the order they were added.
    pub fn modules(&self) -> &[Address] {
        &self.modules
    }

    pub fn is_authorised_module(&self, module: &Address) -> bool {
        self.modules.contains(module)
    }

    pub fn guardians(&self) -> &BTreeSet<Address> {
        &self.guardians
    }

    pub fn guardian_count(&self) -> usize {
        self.guardians.len()
    }

    pub fn is_guardian(&self, account: &Address) -> bool {
        self.guardians.contains(account)
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn balance(&self, asset: Asset) -> U256 {
        self.balances.of(asset)
    }

    /// Replace the owner.
    pub fn set_owner(&mut self, new_owner: Address) -> Result<(), WalletError> {
        if new_owner.is_zero() {
            return Err(WalletError::ZeroAddress);
        }
        if self.is_authorised_module(&new_owner) {
            return Err(WalletError::OwnerIsModule);
        }
        if self.is_guardian(&new_owner) {
            return Err(WalletError::OwnerIsGuardian);
        }
        self.owner = new_owner;
        Ok(())
    }

    /// Authorise a module. Only registry-approved modules are accepted.
    pub fn authorise_module(
        &mut self,
        module: Address,
        registry: &dyn ModuleRegistry,
    ) -> Result<(), WalletError> {
        if module == self.owner {
            return Err(WalletError::OwnerIsModule);
        }
        if !registry.is_approved(&module) {
            return Err(WalletError::ModuleNotRegistered(module));
        }
        if self.is_authorised_module(&module) {
            return Err(WalletError::ModuleAlreadyAuthorised(module));
        }
        self.modules.push(module);
        Ok(())
    }

    pub fn revoke_module(&mut self, module: &Address) -> Result<(), WalletError> {
        let position = self
            .modules
            .iter()
            .position(|m| m == module)
            .ok_or(WalletError::ModuleNotAuthorised(*module))?;
        self.modules.remove(position);
        self.storage.remove(module);
        Ok(())
    }

    pub fn add_guardian(&mut self, guardian: Address) -> Result<(), WalletError> {
        if guardian.is_zero() {
            return Err(WalletError::ZeroAddress);
        }
        if guardian == self.owner {
            return Err(WalletError::OwnerIsGuardian);
        }
        if !self.guardians.insert(guardian) {
            return Err(WalletError::GuardianExists(guardian));
        }
        Ok(())
    }

    pub fn remove_guardian(&mut self, guardian: &Address) -> Result<(), WalletError> {
        if !self.guardians.remove(guardian) {
            return Err(WalletError::NotGuardian(*guardian));
        }
        Ok(())
    }

    /// Lock or unlock outgoing transfers.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub(crate) fn credit(&mut self, asset: Asset, amount: U256) -> Result<(), WalletError> {
        self.balances.credit(asset, amount)
    }

    pub(crate) fn debit(&mut self, asset: Asset, amount: U256) -> Result<(), WalletError> {
        if self.locked {
            return Err(WalletError::Locked);
        }
        self.balances.debit(asset, amount)
    }

    /// Read a storage slot owned by `module` (zero when unset).
    pub fn storage_slot(&self, module: &Address, key: &B256) -> B256 {
        self.storage
            .get(module)
            .and_then(|slots| slots.get(key))
            .copied()
            .unwrap_or_default()
    }

    /// Write a storage slot owned by `module`, returning the previous value.
    pub(crate) fn set_storage_slot(&mut self, module: Address, key: B256, value: B256) -> B256 {
        let slots = self.storage.entry(module).or_default();
        let previous = if value.is_zero() {
            slots.remove(&key)
        } else {
            slots.insert(key, value)
        };
        previous.unwrap_or_default()
    }
}
