// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`RelayConfig`] assembled
//! from them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RELAY_CHAIN_ID` | Chain id bound into every sign hash | `43113` |
//! | `RELAY_MANAGER_ADDRESS` | Dispatcher address bound into every sign hash | zero address |
//! | `RELAY_NONCE_SCHEME` | Replay guard scheme (`sequential` or `windowed`) | `sequential` |
//! | `RELAY_BLOCK_BOUND` | Windowed scheme: blocks a nonce may be ahead of the chain | `10000` |
//! | `RELAY_NONCE_WINDOW` | Windowed scheme: floor lag behind the highest block component | `256` |
//! | `RELAY_AUDIT_CAPACITY` | Audit events kept in memory (oldest evicted first) | `10000` |
//! | `DATA_DIR` | Root directory for the replay store and audit journal | `/data` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::str::FromStr;

use alloy::primitives::Address;

use crate::relay::gas::GasSchedule;
use crate::storage::{NonceScheme, DEFAULT_AUDIT_CAPACITY};
use crate::telemetry::LogFormat;

/// Environment variable name for the chain id bound into sign hashes.
pub const CHAIN_ID_ENV: &str = "RELAY_CHAIN_ID";

/// Environment variable name for the dispatcher address bound into sign hashes.
///
/// Requests signed for one manager deployment cannot be replayed against
/// another.
pub const MANAGER_ADDRESS_ENV: &str = "RELAY_MANAGER_ADDRESS";

/// Environment variable name for the nonce scheme.
pub const NONCE_SCHEME_ENV: &str = "RELAY_NONCE_SCHEME";

/// Environment variable name for the windowed scheme's future block bound.
pub const BLOCK_BOUND_ENV: &str = "RELAY_BLOCK_BOUND";

/// Environment variable name for the windowed scheme's floor lag.
pub const NONCE_WINDOW_ENV: &str = "RELAY_NONCE_WINDOW";

/// Environment variable name for the number of audit events kept in memory.
///
/// The JSONL journal keeps every event regardless.
pub const AUDIT_CAPACITY_ENV: &str = "RELAY_AUDIT_CAPACITY";

/// Environment variable name for the data directory path.
///
/// The replay database lives at `$DATA_DIR/relay/replay.redb` and the audit
/// journal at `$DATA_DIR/relay/audit.jsonl`.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Avalanche Fuji testnet.
pub const DEFAULT_CHAIN_ID: u64 = 43113;

pub const DEFAULT_DATA_DIR: &str = "/data";

pub const DEFAULT_BLOCK_BOUND: u64 = 10_000;

pub const DEFAULT_NONCE_WINDOW: u128 = 256;

/// Default `RUST_LOG` filter when the variable is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Relay manager configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub chain_id: u64,
    pub manager_address: Address,
    pub nonce_scheme: NonceScheme,
    pub audit_capacity: usize,
    pub data_dir: PathBuf,
    pub log_format: LogFormat,
    pub gas: GasSchedule,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            manager_address: Address::ZERO,
            nonce_scheme: NonceScheme::Sequential,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_format: LogFormat::default(),
            gas: GasSchedule::default(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let chain_id = parse_or(&lookup, CHAIN_ID_ENV, defaults.chain_id)?;
        let manager_address = parse_or(&lookup, MANAGER_ADDRESS_ENV, defaults.manager_address)?;
        let block_bound = parse_or(&lookup, BLOCK_BOUND_ENV, DEFAULT_BLOCK_BOUND)?;
        let window = parse_or(&lookup, NONCE_WINDOW_ENV, DEFAULT_NONCE_WINDOW)?;
        let audit_capacity = parse_or(&lookup, AUDIT_CAPACITY_ENV, defaults.audit_capacity)?;

        let nonce_scheme = match lookup(NONCE_SCHEME_ENV).as_deref().map(str::trim) {
            None | Some("") | Some("sequential") => NonceScheme::Sequential,
            Some("windowed") => NonceScheme::Windowed {
                block_bound,
                window,
            },
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: NONCE_SCHEME_ENV,
                    value: other.to_string(),
                })
            }
        };

        let data_dir = lookup(DATA_DIR_ENV)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let log_format = parse_or(&lookup, LOG_FORMAT_ENV, defaults.log_format)?;

        Ok(Self {
            chain_id,
            manager_address,
            nonce_scheme,
            audit_capacity,
            data_dir,
            log_format,
            gas: defaults.gas,
        })
    }

    /// Directory holding the relay's persistent files.
    pub fn relay_dir(&self) -> PathBuf {
        self.data_dir.join("relay")
    }

    /// Path of the redb replay store.
    pub fn replay_db_path(&self) -> PathBuf {
        self.relay_dir().join("replay.redb")
    }

    /// Path of the JSONL audit journal.
    pub fn audit_journal_path(&self) -> PathBuf {
        self.relay_dir().join("audit.jsonl")
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
    }
}
