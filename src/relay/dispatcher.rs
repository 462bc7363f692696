// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The relay manager: entry point for relayed module calls.
//!
//! An attempt holds the ledger write lock from the wallet lookup to the
//! refund, so attempts are strictly serialised and each one observes every
//! mutation of the attempts before it. Queries only take the read lock.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use alloy::primitives::{hex, Address, Bytes, B256, U256};

use super::decode::{self, DecodedCall};
use super::gas;
use super::policy;
use super::verifier::{self, SignerSet};
use crate::config::RelayConfig;
use crate::error::{ExecutionError, RefundError, RelayError};
use crate::models::{Asset, RelayContext, RelayOutcome, RelayRequest};
use crate::modules::{ExecutionContext, Module};
use crate::state::SharedLedger;
use crate::storage::{
    AuditEvent, AuditEventType, AuditLog, MemoryReplayStore, RedbReplayStore, ReplayStore,
    ReplayStoreError,
};
use crate::wallet::{Ledger, ModuleRegistry, Wallet, WalletError};

/// Result of running the module.
struct Execution {
    result: Result<Bytes, ExecutionError>,
    gas_used: u64,
}

/// Authenticates, authorises, executes and refunds relayed module calls.
pub struct RelayManager {
    config: RelayConfig,
    registry: Arc<dyn ModuleRegistry>,
    replay: Arc<dyn ReplayStore>,
    ledger: SharedLedger,
    audit: Arc<AuditLog>,
}

impl RelayManager {
    /// Create a manager with an empty ledger and an in-memory audit log
    /// bounded by the configured capacity.
    pub fn new(
        config: RelayConfig,
        registry: Arc<dyn ModuleRegistry>,
        replay: Arc<dyn ReplayStore>,
    ) -> Self {
        let audit = AuditLog::in_memory().with_capacity(config.audit_capacity);
        Self {
            config,
            registry,
            replay,
            ledger: SharedLedger::default(),
            audit: Arc::new(audit),
        }
    }

    /// Manager whose replay guard lives in memory.
    pub fn in_memory(config: RelayConfig, registry: Arc<dyn ModuleRegistry>) -> Self {
        let replay = Arc::new(MemoryReplayStore::new(config.nonce_scheme));
        Self::new(config, registry, replay)
    }

    /// Manager with a redb replay guard and a JSONL audit journal under the
    /// configured data directory.
    pub fn open(
        config: RelayConfig,
        registry: Arc<dyn ModuleRegistry>,
    ) -> Result<Self, ReplayStoreError> {
        let replay = Arc::new(RedbReplayStore::open(
            &config.replay_db_path(),
            config.nonce_scheme,
        )?);
        let audit = Arc::new(
            AuditLog::with_journal(config.audit_journal_path())
                .with_capacity(config.audit_capacity),
        );
        Ok(Self::new(config, registry, replay).with_audit(audit))
    }

    pub fn with_ledger(mut self, ledger: SharedLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn registry(&self) -> &dyn ModuleRegistry {
        self.registry.as_ref()
    }

    // =========================================================================
    // Wallet queries
    // =========================================================================

    /// Create a wallet with an initial set of registry-approved modules.
    pub fn create_wallet(
        &self,
        address: Address,
        owner: Address,
        modules: &[Address],
    ) -> Result<(), WalletError> {
        self.ledger
            .write()
            .create_wallet(address, owner, modules, self.registry.as_ref())?;
        Ok(())
    }

    /// Snapshot of a wallet.
    pub fn wallet(&self, address: &Address) -> Option<Wallet> {
        self.ledger.read().wallet(address).cloned()
    }

    pub fn balance_of(&self, account: &Address, asset: Asset) -> U256 {
        self.ledger.read().balance_of(account, asset)
    }

    /// Nonce a fresh request for `wallet` must use.
    pub fn get_nonce(&self, wallet: &Address) -> Result<U256, RelayError> {
        Ok(self.replay.next_nonce(wallet)?)
    }

    /// Most recently consumed nonce of `wallet`.
    pub fn last_consumed_nonce(&self, wallet: &Address) -> Result<Option<U256>, RelayError> {
        Ok(self.replay.last_consumed(wallet)?)
    }

    /// Hash the signers of `request` must sign for this manager.
    pub fn sign_hash(&self, request: &RelayRequest) -> B256 {
        super::digest::sign_hash(self.config.chain_id, self.config.manager_address, request)
    }

    // =========================================================================
    // Relay
    // =========================================================================

    /// Relay a pre-signed module call.
    ///
    /// Errors abort the attempt; a nonce consumed before the error stays
    /// consumed. Module and refund failures are reported in the outcome.
    pub fn relay(
        &self,
        ctx: &RelayContext,
        request: &RelayRequest,
    ) -> Result<RelayOutcome, RelayError> {
        let sign_hash = self.sign_hash(request);
        let span = tracing::debug_span!(
            "relay",
            wallet = %request.wallet,
            module = %request.module,
            nonce = %request.nonce,
        );
        let _entered = span.enter();

        self.process(ctx, request, sign_hash).inspect_err(|err| {
            tracing::warn!(
                code = err.code(),
                relayer = %ctx.relayer,
                error = %err,
                "Relay rejected"
            );
            self.audit.record(
                AuditEvent::new(AuditEventType::RelayRejected)
                    .with_wallet(&request.wallet)
                    .with_relayer(&ctx.relayer)
                    .with_sign_hash(&sign_hash)
                    .with_details(serde_json::json!({
                        "code": err.code(),
                        "module": request.module.to_string(),
                        "nonce": request.nonce.to_string(),
                    }))
                    .failed(err.to_string()),
            );
        })
    }

    fn process(
        &self,
        ctx: &RelayContext,
        request: &RelayRequest,
        sign_hash: B256,
    ) -> Result<RelayOutcome, RelayError> {
        let mut ledger = self.ledger.write();

        if !ledger.contains_wallet(&request.wallet) {
            return Err(RelayError::UnknownWallet(request.wallet));
        }

        let call = decode::decode(&request.data)?;
        tracing::debug!(selector = %hex::encode(call.selector), "Call decoded");

        self.replay
            .check_and_consume(&request.wallet, request.nonce, ctx.block_number)?;
        tracing::debug!("Nonce consumed");
        self.audit.record(
            AuditEvent::new(AuditEventType::NonceConsumed)
                .with_wallet(&request.wallet)
                .with_relayer(&ctx.relayer)
                .with_sign_hash(&sign_hash)
                .with_details(serde_json::json!({
                    "nonce": request.nonce.to_string(),
                    "block_number": ctx.block_number,
                })),
        );

        let wallet = ledger
            .wallet(&request.wallet)
            .ok_or(RelayError::UnknownWallet(request.wallet))?;
        let module = self.authorize(wallet, request, &call)?;
        tracing::debug!(module_name = module.name(), "Module authorised");

        let requirement = policy::resolve(module.as_ref(), call.selector, wallet)?;
        let signers = verifier::verify(&requirement, wallet, &sign_hash, &request.signatures)?;
        tracing::debug!(
            policy = %requirement.policy,
            signers = signers.len(),
            "Signatures verified"
        );
        let working_copy = wallet.clone();

        let schedule = &self.config.gas;
        let intrinsic_gas = schedule.intrinsic_gas(request);
        let execution = self.execute(
            &mut ledger,
            working_copy,
            module.as_ref(),
            request,
            &call,
            &signers,
            request.gas_limit.saturating_sub(intrinsic_gas),
        );

        let gas_used = intrinsic_gas
            .saturating_add(execution.gas_used)
            .saturating_add(schedule.refund_overhead);
        let refund_recipient = request.refund_recipient(ctx.relayer);
        let refund_amount =
            gas::refund_amount(gas_used, request.gas_limit, request.gas_price, ctx.gas_price);
        let refund = Self::refund(&mut ledger, request, refund_recipient, refund_amount);
        drop(ledger);

        let (execution_success, execution_error, return_data) = match execution.result {
            Ok(data) => (true, None, data),
            Err(err) => (false, Some(err.to_string()), Bytes::new()),
        };
        let outcome = RelayOutcome {
            sign_hash,
            nonce: request.nonce,
            execution_success,
            execution_error,
            return_data,
            refund_success: refund.is_ok(),
            refund_error: refund.err().map(|e| e.to_string()),
            refund_amount,
            refund_recipient,
            gas_used,
        };
        self.report(ctx, request, &outcome);
        Ok(outcome)
    }

    /// Check that `request.module` may act on `wallet` through `call`.
    fn authorize(
        &self,
        wallet: &Wallet,
        request: &RelayRequest,
        call: &DecodedCall,
    ) -> Result<Arc<dyn Module>, RelayError> {
        if !wallet.is_authorised_module(&request.module) {
            return Err(RelayError::NotAuthorized(format!(
                "{} is not a module of wallet {}",
                request.module, request.wallet
            )));
        }
        if !self.registry.is_approved(&request.module) {
            return Err(RelayError::NotAuthorized(format!(
                "{} is no longer approved by the registry",
                request.module
            )));
        }
        let module = self.registry.module(&request.module).ok_or_else(|| {
            RelayError::NotAuthorized(format!("{} has no implementation", request.module))
        })?;
        if !call.targets(&request.wallet) {
            return Err(RelayError::NotAuthorized(format!(
                "call data does not target wallet {}",
                request.wallet
            )));
        }
        Ok(module)
    }

    /// Run the module against a working copy of the wallet and commit its
    /// effects only on success. Panics are contained.
    #[allow(clippy::too_many_arguments)]
    fn execute(
        &self,
        ledger: &mut Ledger,
        wallet: Wallet,
        module: &dyn Module,
        request: &RelayRequest,
        call: &DecodedCall,
        signers: &SignerSet,
        gas_limit: u64,
    ) -> Execution {
        let mut ctx = ExecutionContext::new(
            wallet,
            request.module,
            signers.as_slice(),
            self.registry.as_ref(),
            &self.config.gas,
            gas_limit,
        );

        let result = panic::catch_unwind(AssertUnwindSafe(|| module.execute(&mut ctx, call)));
        let gas_used = ctx.gas_used();

        let result = match result {
            Ok(Ok(return_data)) => {
                let effects = ctx.into_effects();
                ledger
                    .commit(effects.wallet, effects.credits)
                    .map(|()| return_data)
                    .map_err(|e| ExecutionError::Module(e.into()))
            }
            Ok(Err(err)) => Err(ExecutionError::Module(err)),
            Err(payload) => Err(ExecutionError::Panicked(panic_message(payload.as_ref()))),
        };
        Execution { result, gas_used }
    }

    /// Pay the relayer from the wallet. A zero amount is a successful no-op.
    fn refund(
        ledger: &mut Ledger,
        request: &RelayRequest,
        recipient: Address,
        amount: U256,
    ) -> Result<(), RefundError> {
        if amount.is_zero() {
            return Ok(());
        }
        ledger.transfer_from_wallet(&request.wallet, recipient, request.refund_token, amount)?;
        Ok(())
    }

    fn report(&self, ctx: &RelayContext, request: &RelayRequest, outcome: &RelayOutcome) {
        tracing::info!(
            relayer = %ctx.relayer,
            status = ?outcome.status(),
            gas_used = outcome.gas_used,
            refund = %outcome.refund_amount,
            "Relay executed"
        );
        if let Some(error) = &outcome.execution_error {
            tracing::debug!(error = %error, "Module call failed");
        }

        let mut executed = AuditEvent::new(AuditEventType::RelayExecuted)
            .with_wallet(&request.wallet)
            .with_relayer(&ctx.relayer)
            .with_sign_hash(&outcome.sign_hash)
            .with_details(serde_json::json!({
                "module": request.module.to_string(),
                "nonce": outcome.nonce.to_string(),
                "gas_used": outcome.gas_used,
            }));
        if let Some(error) = &outcome.execution_error {
            executed = executed.failed(error.clone());
        }
        self.audit.record(executed);

        let refund_details = serde_json::json!({
            "recipient": outcome.refund_recipient.to_string(),
            "token": request.refund_token.to_string(),
            "amount": outcome.refund_amount.to_string(),
        });
        match &outcome.refund_error {
            Some(error) => {
                tracing::warn!(
                    recipient = %outcome.refund_recipient,
                    amount = %outcome.refund_amount,
                    error = %error,
                    "Refund failed"
                );
                self.audit.record(
                    AuditEvent::new(AuditEventType::RefundFailed)
                        .with_wallet(&request.wallet)
                        .with_relayer(&ctx.relayer)
                        .with_sign_hash(&outcome.sign_hash)
                        .with_details(refund_details)
                        .failed(error.clone()),
                );
            }
            None if !outcome.refund_amount.is_zero() => {
                self.audit.record(
                    AuditEvent::new(AuditEventType::RefundPaid)
                        .with_wallet(&request.wallet)
                        .with_relayer(&ctx.relayer)
                        .with_sign_hash(&outcome.sign_hash)
                        .with_details(refund_details),
                );
            }
            None => {}
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
