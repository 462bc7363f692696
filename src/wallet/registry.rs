// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Module registry: which module addresses are approved, and the capability
//! object behind each of them.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use alloy::primitives::Address;

use crate::modules::Module;

/// Registry of approved modules.
pub trait ModuleRegistry: Send + Sync {
    /// Whether the module address is currently approved.
    fn is_approved(&self, module: &Address) -> bool;

    /// Resolve an approved module address to its implementation.
    fn module(&self, module: &Address) -> Option<Arc<dyn Module>>;
}

/// Registry kept in process memory.
///
/// An address can be approved with or without an implementation; approval
/// alone is enough for a wallet to authorise it, but relaying to it requires
/// the implementation.
#[derive(Default)]
pub struct InMemoryModuleRegistry {
    entries: RwLock<HashMap<Address, Option<Arc<dyn Module>>>>,
}

impl InMemoryModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Approve `address` and bind it to `module`.
    pub fn register(&self, address: Address, module: Arc<dyn Module>) {
        tracing::info!(module = %address, name = module.name(), "Module registered");
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address, Some(module));
    }

    /// Approve `address` without an implementation.
    pub fn approve(&self, address: Address) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(address)
            .or_insert(None);
    }

    /// Withdraw approval. Returns whether the address was approved.
    pub fn deregister(&self, address: &Address) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(address)
            .is_some();
        if removed {
            tracing::info!(module = %address, "Module deregistered");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ModuleRegistry for InMemoryModuleRegistry {
    fn is_approved(&self, module: &Address) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(module)
    }

    fn module(&self, module: &Address) -> Option<Arc<dyn Module>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(module)
            .cloned()
            .flatten()
    }
}

impl fmt::Debug for InMemoryModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryModuleRegistry")
            .field("modules", &self.len())
            .finish()
    }
}
