// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical sign hash of a relay request.
//!
//! ```text
//! keccak256(0x19 || 0x00 || dispatcher || wallet || module || chain_id
//!           || nonce || gas_price || gas_limit || refund_kind
//!           || refund_token || refund_address || data)
//! ```
//!
//! wrapped with the EIP-191 personal message prefix. Words are 32-byte big
//! endian, addresses are 20 bytes, `refund_kind` is one byte (`0x00` native,
//! `0x01` ERC-20), and the call data is the only variable length field. A
//! `None` refund address is encoded as the zero address.

use alloy::primitives::{eip191_hash_message, keccak256, Address, B256, U256};

use crate::models::RelayRequest;

/// Inner request hash, before the EIP-191 prefix.
pub fn request_hash(chain_id: u64, dispatcher: Address, request: &RelayRequest) -> B256 {
    let mut buf = Vec::with_capacity(3 + 20 * 5 + 32 * 4 + request.data.len());
    buf.extend_from_slice(&[0x19, 0x00]);
    buf.extend_from_slice(dispatcher.as_slice());
    buf.extend_from_slice(request.wallet.as_slice());
    buf.extend_from_slice(request.module.as_slice());
    buf.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    buf.extend_from_slice(&request.nonce.to_be_bytes::<32>());
    buf.extend_from_slice(&request.gas_price.to_be_bytes::<32>());
    buf.extend_from_slice(&U256::from(request.gas_limit).to_be_bytes::<32>());
    buf.push(request.refund_token.kind_tag());
    buf.extend_from_slice(request.refund_token.token_address().as_slice());
    buf.extend_from_slice(request.refund_address.unwrap_or(Address::ZERO).as_slice());
    buf.extend_from_slice(&request.data);
    keccak256(&buf)
}

/// Hash the signers sign.
pub fn sign_hash(chain_id: u64, dispatcher: Address, request: &RelayRequest) -> B256 {
    eip191_hash_message(request_hash(chain_id, dispatcher, request))
}
