// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit trail of relay attempts.
//!
//! Every attempt leaves events behind: a rejection, or a consumed nonce
//! followed by the execution and refund results. Wallet owners inspect them
//! to see what was relayed on their behalf. The most recent events are kept
//! in memory, up to a fixed capacity, and every event is appended to a JSONL
//! file when a journal path is configured.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use alloy::primitives::{Address, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// The attempt was refused before execution
    RelayRejected,
    /// The replay guard burned a nonce
    NonceConsumed,
    /// The module call ran (successfully or not)
    RelayExecuted,
    /// The relayer was paid
    RefundPaid,
    /// The relayer could not be paid
    RefundFailed,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Wallet the attempt targeted.
    pub wallet: Option<String>,
    /// Relayer that submitted the attempt.
    pub relayer: Option<String>,
    /// Sign hash of the relayed request.
    pub sign_hash: Option<String>,
    /// Additional details as JSON.
    pub details: Option<serde_json::Value>,
    /// Whether the step succeeded.
    pub success: bool,
    /// Error message if the step failed.
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            wallet: None,
            relayer: None,
            sign_hash: None,
            details: None,
            success: true,
            error: None,
        }
    }

    pub fn with_wallet(mut self, wallet: &Address) -> Self {
        self.wallet = Some(wallet.to_string());
        self
    }

    pub fn with_relayer(mut self, relayer: &Address) -> Self {
        self.relayer = Some(relayer.to_string());
        self
    }

    pub fn with_sign_hash(mut self, sign_hash: &B256) -> Self {
        self.sign_hash = Some(sign_hash.to_string());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type AuditResult<T> = Result<T, AuditError>;

/// Events kept in memory when no capacity is given.
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

/// Bounded in-memory audit log with an optional JSONL journal.
///
/// Once `capacity` events are held, recording a new one evicts the oldest.
/// The journal is never truncated.
#[derive(Debug)]
pub struct AuditLog {
    events: Mutex<VecDeque<AuditEvent>>,
    capacity: usize,
    journal: Option<PathBuf>,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: DEFAULT_AUDIT_CAPACITY,
            journal: None,
        }
    }
}

impl AuditLog {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Also append every event to the JSONL file at `path`.
    pub fn with_journal(path: impl Into<PathBuf>) -> Self {
        Self {
            journal: Some(path.into()),
            ..Self::default()
        }
    }

    /// Keep at most `capacity` events in memory. Zero keeps none.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn journal_path(&self) -> Option<&Path> {
        self.journal.as_deref()
    }

    /// Record an event. Journal failures are logged and never propagated.
    pub fn record(&self, event: AuditEvent) {
        if let Some(path) = &self.journal {
            if let Err(e) = append_line(path, &event) {
                tracing::warn!(
                    path = %path.display(),
                    event_id = %event.event_id,
                    error = %e,
                    "Failed to append audit event to journal"
                );
            }
        }
        if self.capacity == 0 {
            return;
        }
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Events held in memory, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Events concerning one wallet, oldest first.
    pub fn events_for_wallet(&self, wallet: &Address) -> Vec<AuditEvent> {
        let wallet = wallet.to_string();
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.wallet.as_deref() == Some(wallet.as_str()))
            .cloned()
            .collect()
    }

    /// Read a JSONL journal back.
    pub fn read_journal(path: &Path) -> AuditResult<Vec<AuditEvent>> {
        let content = std::fs::read_to_string(path)?;
        let mut events = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(line)?);
        }
        Ok(events)
    }
}

fn append_line(path: &Path, event: &AuditEvent) -> AuditResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&line)?;
    Ok(())
}
