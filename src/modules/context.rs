// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Isolated execution context handed to modules.
//!
//! The context owns a working copy of the wallet. Everything a module does
//! (storage writes, guardian changes, transfers) lands in that copy and in a
//! list of pending credits. The dispatcher commits both to the ledger only
//! when the module returns successfully.

use alloy::primitives::{Address, B256, U256};

use super::ModuleError;
use crate::models::Asset;
use crate::relay::gas::{GasMeter, GasSchedule};
use crate::wallet::ledger::Credit;
use crate::wallet::{ModuleRegistry, Wallet};

pub struct ExecutionContext<'a> {
    wallet: Wallet,
    module: Address,
    signers: &'a [Address],
    registry: &'a dyn ModuleRegistry,
    schedule: &'a GasSchedule,
    gas: GasMeter,
    credits: Vec<Credit>,
}

/// Effects of a successful execution, ready to commit.
pub(crate) struct Effects {
    pub wallet: Wallet,
    pub credits: Vec<Credit>,
}

impl<'a> ExecutionContext<'a> {
    pub(crate) fn new(
        wallet: Wallet,
        module: Address,
        signers: &'a [Address],
        registry: &'a dyn ModuleRegistry,
        schedule: &'a GasSchedule,
        gas_limit: u64,
    ) -> Self {
        Self {
            wallet,
            module,
            signers,
            registry,
            schedule,
            gas: GasMeter::new(gas_limit),
            credits: Vec::new(),
        }
    }

    /// Working copy of the wallet.
    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Mutable working copy of the wallet. Changes are only kept if the
    /// module returns successfully.
    pub fn wallet_mut(&mut self) -> &mut Wallet {
        &mut self.wallet
    }

    /// Address of the executing module.
    pub fn module(&self) -> Address {
        self.module
    }

    /// Verified signers of the relayed request, ascending.
    pub fn signers(&self) -> &[Address] {
        self.signers
    }

    pub fn registry(&self) -> &dyn ModuleRegistry {
        self.registry
    }

    pub fn charge(&mut self, gas: u64) -> Result<(), ModuleError> {
        Ok(self.gas.charge(gas)?)
    }

    pub fn gas_used(&self) -> u64 {
        self.gas.used()
    }

    pub fn gas_remaining(&self) -> u64 {
        self.gas.remaining()
    }

    /// Read a slot of this module's wallet storage.
    pub fn sload(&mut self, key: B256) -> Result<B256, ModuleError> {
        self.charge(self.schedule.sload)?;
        Ok(self.wallet.storage_slot(&self.module, &key))
    }

    /// Write a slot of this module's wallet storage.
    pub fn sstore(&mut self, key: B256, value: B256) -> Result<(), ModuleError> {
        let current = self.wallet.storage_slot(&self.module, &key);
        let cost = if current.is_zero() && !value.is_zero() {
            self.schedule.sstore_set
        } else {
            self.schedule.sstore_reset
        };
        self.charge(cost)?;
        self.wallet.set_storage_slot(self.module, key, value);
        Ok(())
    }

    /// Send funds out of the wallet.
    pub fn transfer(&mut self, to: Address, asset: Asset, amount: U256) -> Result<(), ModuleError> {
        self.charge(self.schedule.transfer)?;
        if to.is_zero() {
            return Err(ModuleError::revert("transfer to the zero address"));
        }
        self.wallet.debit(asset, amount)?;
        if to == self.wallet.address() {
            self.wallet.credit(asset, amount)?;
        } else {
            self.credits.push(Credit { to, asset, amount });
        }
        Ok(())
    }

    /// Authorise another module on the wallet.
    pub fn authorise_module(&mut self, module: Address) -> Result<(), ModuleError> {
        self.charge(self.schedule.sstore_set)?;
        self.wallet.authorise_module(module, self.registry)?;
        Ok(())
    }

    pub(crate) fn into_effects(self) -> Effects {
        Effects {
            wallet: self.wallet,
            credits: self.credits,
        }
    }
}
