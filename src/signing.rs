// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request signing for relayer clients.
//!
//! Wallet owners and guardians sign the canonical sign hash of a request
//! with their local keys. Signatures must reach the relay ordered by
//! ascending signer address; [`sign_request`] takes care of the ordering.

use alloy::primitives::{Address, Bytes, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::models::{RelayRequest, RelaySignature};
use crate::relay::digest;

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("signing failed: {0}")]
    Signer(#[from] alloy::signers::Error),
}

/// Create a signer from a hex-encoded private key (with or without `0x`).
pub fn signer_from_hex(private_key: &str) -> Result<PrivateKeySigner, SigningError> {
    private_key
        .trim()
        .parse::<PrivateKeySigner>()
        .map_err(|e| SigningError::InvalidPrivateKey(e.to_string()))
}

/// Sign a precomputed sign hash.
pub fn sign_hash(
    signer: &PrivateKeySigner,
    sign_hash: &B256,
) -> Result<RelaySignature, SigningError> {
    let signature = signer.sign_hash_sync(sign_hash)?;
    Ok(RelaySignature {
        signer: signer.address(),
        signature: Bytes::copy_from_slice(&signature.as_bytes()),
    })
}

/// Sign `request` for the relay manager at `dispatcher` on `chain_id`.
///
/// Replaces any existing signatures and returns the sign hash.
pub fn sign_request(
    request: &mut RelayRequest,
    chain_id: u64,
    dispatcher: Address,
    signers: &[&PrivateKeySigner],
) -> Result<B256, SigningError> {
    let hash = digest::sign_hash(chain_id, dispatcher, request);

    let mut ordered = signers.to_vec();
    ordered.sort_by_key(|signer| signer.address());

    request.signatures = ordered
        .into_iter()
        .map(|signer| sign_hash(signer, &hash))
        .collect::<Result<_, _>>()?;
    Ok(hash)
}
