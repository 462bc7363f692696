// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relay pipeline.
//!
//! ```text
//! Received -> Decoded -> NonceChecked -> Authorized -> SignaturesVerified
//!          -> Executed -> Refunded -> Done
//! ```
//!
//! Every step up to signature verification fails fast with a
//! [`RelayError`](crate::error::RelayError). Once the nonce is checked it
//! stays consumed whatever happens next.

pub mod decode;
pub mod digest;
pub mod dispatcher;
pub mod gas;
pub mod policy;
pub mod verifier;

pub use decode::DecodedCall;
pub use dispatcher::RelayManager;
pub use gas::{GasMeter, GasSchedule};
pub use policy::{SignaturePolicy, SignatureRequirement};
pub use verifier::SignerSet;
