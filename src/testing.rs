// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test fixtures: deterministic keys, sample modules and a wired-up manager.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::config::RelayConfig;
use crate::models::{Asset, RelayContext, RelayRequest, RelaySignature};
use crate::modules::{ExecutionContext, Module, ModuleError};
use crate::relay::decode::DecodedCall;
use crate::relay::policy::{SignaturePolicy, SignatureRequirement};
use crate::relay::RelayManager;
use crate::signing;
use crate::wallet::{InMemoryModuleRegistry, ModuleRegistry, Wallet};

sol! {
    interface ITestModule {
        function setIntOwnerOnly(address wallet, uint256 value);
        function setIntAnyone(address wallet, uint256 value);
        function clearInt();
        function transferOwnerOnly(address wallet, address to, uint256 amount);
        function transferThenRevert(address wallet, address to, uint256 amount);
        function alwaysPanic(address wallet);
        function burnGas(address wallet, uint256 amount);
    }

    interface IRecoveryModule {
        function transferOwnership(address wallet, address newOwner);
        function executeRecovery(address wallet, address recovery);
        function lockWallet(address wallet);
    }
}

/// Storage slot the test module keeps its integer in.
pub const INT_SLOT: B256 = B256::ZERO;

/// Deterministic key; `seed` must be non-zero.
pub fn signer(seed: u8) -> PrivateKeySigner {
    PrivateKeySigner::from_slice(&[seed; 32]).unwrap()
}

pub fn sign(key: &PrivateKeySigner, hash: &B256) -> RelaySignature {
    signing::sign_hash(key, hash).unwrap()
}

fn store_int(ctx: &mut ExecutionContext<'_>, value: U256) -> Result<Bytes, ModuleError> {
    let word = value.to_be_bytes::<32>();
    ctx.sstore(INT_SLOT, B256::from(word))?;
    Ok(Bytes::copy_from_slice(&word))
}

// =============================================================================
// Modules
// =============================================================================

/// Owner-gated storage and transfers, plus misbehaving entry points.
pub struct TestModule;

impl Module for TestModule {
    fn name(&self) -> &str {
        "TestModule"
    }

    fn signature_requirement(
        &self,
        selector: [u8; 4],
        _wallet: &Wallet,
    ) -> Option<SignatureRequirement> {
        match selector {
            ITestModule::setIntAnyoneCall::SELECTOR => Some(SignatureRequirement::anyone()),
            ITestModule::setIntOwnerOnlyCall::SELECTOR
            | ITestModule::transferOwnerOnlyCall::SELECTOR
            | ITestModule::transferThenRevertCall::SELECTOR
            | ITestModule::alwaysPanicCall::SELECTOR
            | ITestModule::burnGasCall::SELECTOR => Some(SignatureRequirement::owner_only()),
            _ => None,
        }
    }

    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        call: &DecodedCall,
    ) -> Result<Bytes, ModuleError> {
        match call.selector {
            ITestModule::setIntOwnerOnlyCall::SELECTOR => {
                let args = ITestModule::setIntOwnerOnlyCall::abi_decode(&call.data)?;
                store_int(ctx, args.value)
            }
            ITestModule::setIntAnyoneCall::SELECTOR => {
                let args = ITestModule::setIntAnyoneCall::abi_decode(&call.data)?;
                store_int(ctx, args.value)
            }
            ITestModule::transferOwnerOnlyCall::SELECTOR => {
                let args = ITestModule::transferOwnerOnlyCall::abi_decode(&call.data)?;
                ctx.transfer(args.to, Asset::Native, args.amount)?;
                Ok(Bytes::new())
            }
            ITestModule::transferThenRevertCall::SELECTOR => {
                let args = ITestModule::transferThenRevertCall::abi_decode(&call.data)?;
                ctx.transfer(args.to, Asset::Native, args.amount)?;
                Err(ModuleError::revert("transfer rejected"))
            }
            ITestModule::alwaysPanicCall::SELECTOR => panic!("test module panic"),
            ITestModule::burnGasCall::SELECTOR => {
                let args = ITestModule::burnGasCall::abi_decode(&call.data)?;
                ctx.charge(args.amount.saturating_to())?;
                Ok(Bytes::new())
            }
            other => Err(ModuleError::UnknownSelector(other)),
        }
    }
}

/// Ownership transfer and recovery gated by guardians.
pub struct RecoveryModule;

impl Module for RecoveryModule {
    fn name(&self) -> &str {
        "RecoveryModule"
    }

    fn signature_requirement(
        &self,
        selector: [u8; 4],
        wallet: &Wallet,
    ) -> Option<SignatureRequirement> {
        let policy = match selector {
            IRecoveryModule::transferOwnershipCall::SELECTOR => SignaturePolicy::OwnerAndGuardians,
            IRecoveryModule::executeRecoveryCall::SELECTOR => SignaturePolicy::GuardianMajority,
            IRecoveryModule::lockWalletCall::SELECTOR => SignaturePolicy::OwnerOnly,
            _ => return None,
        };
        Some(SignatureRequirement::for_policy(
            policy,
            wallet.guardian_count(),
        ))
    }

    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        call: &DecodedCall,
    ) -> Result<Bytes, ModuleError> {
        ctx.charge(5_000)?;
        match call.selector {
            IRecoveryModule::transferOwnershipCall::SELECTOR => {
                let args = IRecoveryModule::transferOwnershipCall::abi_decode(&call.data)?;
                ctx.wallet_mut().set_owner(args.newOwner)?;
            }
            IRecoveryModule::executeRecoveryCall::SELECTOR => {
                let args = IRecoveryModule::executeRecoveryCall::abi_decode(&call.data)?;
                ctx.wallet_mut().set_owner(args.recovery)?;
            }
            IRecoveryModule::lockWalletCall::SELECTOR => ctx.wallet_mut().set_locked(true),
            other => return Err(ModuleError::UnknownSelector(other)),
        }
        Ok(Bytes::new())
    }
}

/// Recovery entry points that ask for one signature whatever the guardian
/// count.
pub struct LaxRecoveryModule;

impl Module for LaxRecoveryModule {
    fn name(&self) -> &str {
        "LaxRecoveryModule"
    }

    fn signature_requirement(
        &self,
        selector: [u8; 4],
        wallet: &Wallet,
    ) -> Option<SignatureRequirement> {
        RecoveryModule
            .signature_requirement(selector, wallet)
            .map(|requirement| SignatureRequirement::new(requirement.policy, 1))
    }

    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        call: &DecodedCall,
    ) -> Result<Bytes, ModuleError> {
        RecoveryModule.execute(ctx, call)
    }
}

/// Declares an owner-only entry point that needs zero signatures.
pub struct MisconfiguredModule;

impl Module for MisconfiguredModule {
    fn name(&self) -> &str {
        "MisconfiguredModule"
    }

    fn signature_requirement(
        &self,
        selector: [u8; 4],
        _wallet: &Wallet,
    ) -> Option<SignatureRequirement> {
        (selector == ITestModule::setIntOwnerOnlyCall::SELECTOR)
            .then(|| SignatureRequirement::new(SignaturePolicy::OwnerOnly, 0))
    }

    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        call: &DecodedCall,
    ) -> Result<Bytes, ModuleError> {
        let args = ITestModule::setIntOwnerOnlyCall::abi_decode(&call.data)?;
        store_int(ctx, args.value)
    }
}

// =============================================================================
// Fixture
// =============================================================================

/// A manager with one wallet that has the sample modules authorised.
pub struct Fixture {
    pub manager: RelayManager,
    pub registry: Arc<InMemoryModuleRegistry>,
    pub owner: PrivateKeySigner,
    pub wallet: Address,
    pub relayer: Address,
    pub test_module: Address,
    pub recovery_module: Address,
    pub misconfigured_module: Address,
    pub lax_module: Address,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(RelayConfig::default())
    }

    pub fn with_config(config: RelayConfig) -> Self {
        Self::with_manager(|registry| RelayManager::in_memory(config, registry))
    }

    pub fn with_manager<F>(build: F) -> Self
    where
        F: FnOnce(Arc<dyn ModuleRegistry>) -> RelayManager,
    {
        let test_module = Address::repeat_byte(0xa1);
        let recovery_module = Address::repeat_byte(0xa2);
        let misconfigured_module = Address::repeat_byte(0xa3);
        let lax_module = Address::repeat_byte(0xa4);

        let registry = Arc::new(InMemoryModuleRegistry::new());
        registry.register(test_module, Arc::new(TestModule));
        registry.register(recovery_module, Arc::new(RecoveryModule));
        registry.register(misconfigured_module, Arc::new(MisconfiguredModule));
        registry.register(lax_module, Arc::new(LaxRecoveryModule));

        let manager = build(registry.clone());
        let owner = signer(0x01);
        let wallet = Address::repeat_byte(0x0f);
        manager
            .create_wallet(
                wallet,
                owner.address(),
                &[test_module, recovery_module, misconfigured_module, lax_module],
            )
            .unwrap();

        Self {
            manager,
            registry,
            owner,
            wallet,
            relayer: Address::repeat_byte(0xee),
            test_module,
            recovery_module,
            misconfigured_module,
            lax_module,
        }
    }

    pub fn add_guardians(&self, seeds: &[u8]) -> Vec<PrivateKeySigner> {
        let guardians: Vec<_> = seeds.iter().map(|seed| signer(*seed)).collect();
        let mut ledger = self.manager.ledger().write();
        let wallet = ledger.wallet_mut(&self.wallet).unwrap();
        for guardian in &guardians {
            wallet.add_guardian(guardian.address()).unwrap();
        }
        guardians
    }

    pub fn fund(&self, asset: Asset, amount: U256) {
        self.manager
            .ledger()
            .write()
            .deposit(self.wallet, asset, amount)
            .unwrap();
    }

    /// Submission context paying a gas price of one.
    pub fn context(&self) -> RelayContext {
        RelayContext::new(self.relayer, U256::from(1))
    }

    /// Unsigned request at the wallet's next nonce, without refund.
    pub fn request(&self, module: Address, data: Vec<u8>) -> RelayRequest {
        let nonce = self.manager.get_nonce(&self.wallet).unwrap();
        RelayRequest::new(self.wallet, module, data, nonce).with_gas(U256::ZERO, 1_000_000)
    }

    pub fn sign(&self, request: &mut RelayRequest, signers: &[&PrivateKeySigner]) {
        let config = self.manager.config();
        signing::sign_request(request, config.chain_id, config.manager_address, signers).unwrap();
    }

    pub fn signed_request(
        &self,
        mut request: RelayRequest,
        signers: &[&PrivateKeySigner],
    ) -> RelayRequest {
        self.sign(&mut request, signers);
        request
    }

    pub fn signed(
        &self,
        module: Address,
        data: Vec<u8>,
        signers: &[&PrivateKeySigner],
    ) -> RelayRequest {
        self.signed_request(self.request(module, data), signers)
    }

    pub fn set_int_call(&self, value: u64) -> Vec<u8> {
        ITestModule::setIntOwnerOnlyCall {
            wallet: self.wallet,
            value: U256::from(value),
        }
        .abi_encode()
    }

    /// Integer stored by the test module on the fixture wallet.
    pub fn stored_int(&self) -> U256 {
        let wallet = self.manager.wallet(&self.wallet).unwrap();
        U256::from_be_bytes(wallet.storage_slot(&self.test_module, &INT_SLOT).0)
    }
}
