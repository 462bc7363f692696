// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger of wallets and plain (externally owned) accounts.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};

use super::{Balances, ModuleRegistry, Wallet, WalletError};
use crate::models::Asset;

/// A credit produced by a module, applied when its execution commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credit {
    pub to: Address,
    pub asset: Asset,
    pub amount: U256,
}

/// Wallets and account balances.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    wallets: HashMap<Address, Wallet>,
    accounts: HashMap<Address, Balances>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a wallet owned by `owner` with an initial set of modules.
    ///
    /// Every module must be approved by `registry`.
    pub fn create_wallet(
        &mut self,
        address: Address,
        owner: Address,
        modules: &[Address],
        registry: &dyn ModuleRegistry,
    ) -> Result<&mut Wallet, WalletError> {
        if self.wallets.contains_key(&address) {
            return Err(WalletError::AlreadyExists(address));
        }

        let mut wallet = Wallet::new(address, owner)?;
        for module in modules {
            wallet.authorise_module(*module, registry)?;
        }
        // Funds sent before deployment follow the wallet.
        if let Some(balances) = self.accounts.remove(&address) {
            wallet.balances = balances;
        }

        tracing::info!(
            wallet = %address,
            owner = %owner,
            modules = modules.len(),
            "Wallet created"
        );
        Ok(self.wallets.entry(address).or_insert(wallet))
    }

    pub fn wallet(&self, address: &Address) -> Option<&Wallet> {
        self.wallets.get(address)
    }

    pub fn wallet_mut(&mut self, address: &Address) -> Option<&mut Wallet> {
        self.wallets.get_mut(address)
    }

    pub fn contains_wallet(&self, address: &Address) -> bool {
        self.wallets.contains_key(address)
    }

    pub fn wallet_count(&self) -> usize {
        self.wallets.len()
    }

    /// Balance of a wallet or plain account.
    pub fn balance_of(&self, account: &Address, asset: Asset) -> U256 {
        match self.wallets.get(account) {
            Some(wallet) => wallet.balance(asset),
            None => self
                .accounts
                .get(account)
                .map(|balances| balances.of(asset))
                .unwrap_or_default(),
        }
    }

    /// Mint funds into an account.
    pub fn deposit(
        &mut self,
        account: Address,
        asset: Asset,
        amount: U256,
    ) -> Result<(), WalletError> {
        self.credit(account, asset, amount)
    }

    /// Move funds out of a wallet.
    pub fn transfer_from_wallet(
        &mut self,
        wallet: &Address,
        to: Address,
        asset: Asset,
        amount: U256,
    ) -> Result<(), WalletError> {
        if to != *wallet {
            self.balance_of(&to, asset)
                .checked_add(amount)
                .ok_or(WalletError::BalanceOverflow { asset })?;
        }
        self.wallets
            .get_mut(wallet)
            .ok_or(WalletError::UnknownWallet(*wallet))?
            .debit(asset, amount)?;
        self.credit(to, asset, amount)
    }

    /// Replace a wallet with its executed working copy and apply the credits
    /// its module produced.
    ///
    /// Nothing is written when any credit would overflow its recipient.
    pub(crate) fn commit(
        &mut self,
        wallet: Wallet,
        credits: Vec<Credit>,
    ) -> Result<(), WalletError> {
        let mut totals: HashMap<(Address, Asset), U256> = HashMap::new();
        for credit in &credits {
            let key = (credit.to, credit.asset);
            let current = match totals.get(&key) {
                Some(total) => *total,
                None if credit.to == wallet.address() => wallet.balance(credit.asset),
                None => self.balance_of(&credit.to, credit.asset),
            };
            let total = current
                .checked_add(credit.amount)
                .ok_or(WalletError::BalanceOverflow {
                    asset: credit.asset,
                })?;
            totals.insert(key, total);
        }

        self.wallets.insert(wallet.address(), wallet);
        for credit in credits {
            self.credit(credit.to, credit.asset, credit.amount)?;
        }
        Ok(())
    }

    fn credit(&mut self, account: Address, asset: Asset, amount: U256) -> Result<(), WalletError> {
        match self.wallets.get_mut(&account) {
            Some(wallet) => wallet.credit(asset, amount),
            None => self.accounts.entry(account).or_default().credit(asset, amount),
        }
    }
}
