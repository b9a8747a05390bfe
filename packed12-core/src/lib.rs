// packed12
// Copyright (c) 2021 The packed12 Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `packed12-core`: a bit-exact codec for a packed 12-bit-per-sample, 2-channel interleaved image
//! format (spec.md §1–§4). No I/O, no allocation, and no logging on any decode/encode/transform
//! path — those are the driver and CLI crates' job (spec.md §1 "Non-goals").
//!
//! The public surface is the five operations of spec.md §6: [`decode`], [`encode`],
//! [`scalar::transform_inplace`], [`encode_log_inplace`], and [`message_from_code`]. Each is a
//! pure function of its inputs modulo the in-place buffer mutation (spec.md §4.8: "no state
//! machines").

pub mod dispatch;
pub mod error;
pub mod layout;
pub mod log_enc;
pub mod scalar;
pub mod simd;

pub use dispatch::{decode, encode, encode_log_inplace};
pub use error::{message_from_code, Error, Result};
pub use log_enc::linear16_to_log12;
