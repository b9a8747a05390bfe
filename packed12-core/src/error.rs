// packed12
// Copyright (c) 2021 The packed12 Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `error` module defines the core's error type and the fixed code↔message table.
//!
//! Grounded on `symphonia_core::errors` (examples/pdeljanov-Symphonia/symphonia-core/src/errors.rs):
//! a dense `enum` implementing `Display`/`std::error::Error`, plus free helper constructors. Unlike
//! Symphonia's open-ended `&'static str` payloads, this taxonomy is the small, fixed set from the
//! wire contract (spec.md §4.1), so each variant also answers a stable `code() -> i32` matching the
//! original C library's return codes.

use core::fmt;

/// All ways a core entry point can refuse to run. `Ok(())`/success has no variant: the codec
/// functions return `Result<()>` rather than an explicit success code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Source length is not divisible by 12 bytes (decode, transform).
    SrcNotDivisibleBy12,
    /// Destination buffer does not have enough capacity for the operation's output.
    DstTooSmall,
    /// Source base pointer is not aligned to 16 bytes.
    SrcNotAligned16,
    /// Destination base pointer is not aligned to 16 bytes.
    DstNotAligned16,
    /// Source base pointer is not aligned to 32 bytes.
    SrcNotAligned32,
    /// Destination base pointer is not aligned to 32 bytes.
    DstNotAligned32,
    /// Source length is not divisible by 8 elements (encode).
    SrcNotDivisibleBy8,
}

impl Error {
    /// The negative integer code this error maps to, matching the reference C ABI (spec.md §4.1).
    pub const fn code(self) -> i32 {
        match self {
            Error::SrcNotDivisibleBy12 => -1,
            Error::DstTooSmall => -2,
            Error::SrcNotAligned16 => -3,
            Error::DstNotAligned16 => -4,
            Error::SrcNotAligned32 => -5,
            Error::DstNotAligned32 => -6,
            Error::SrcNotDivisibleBy8 => -7,
        }
    }

    /// Recovers an `Error` from its wire code, for callers that only have the raw integer (e.g.
    /// crossing an FFI boundary). Returns `None` for `0` (success has no `Error`) and for codes
    /// outside the taxonomy.
    pub const fn from_code(code: i32) -> Option<Error> {
        match code {
            -1 => Some(Error::SrcNotDivisibleBy12),
            -2 => Some(Error::DstTooSmall),
            -3 => Some(Error::SrcNotAligned16),
            -4 => Some(Error::DstNotAligned16),
            -5 => Some(Error::SrcNotAligned32),
            -6 => Some(Error::DstNotAligned32),
            -7 => Some(Error::SrcNotDivisibleBy8),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Error::SrcNotDivisibleBy12 => "source buffer must be divisible by 12",
            Error::DstTooSmall => "destination buffer is too small",
            Error::SrcNotAligned16 => "source buffer must be aligned to 16 bytes",
            Error::DstNotAligned16 => "destination buffer must be aligned to 16 bytes",
            Error::SrcNotAligned32 => "source buffer must be aligned to 32 bytes",
            Error::DstNotAligned32 => "destination buffer must be aligned to 32 bytes",
            Error::SrcNotDivisibleBy8 => "source buffer must be divisible by 8",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::error::Error for Error {}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Looks up the human-readable message for a raw return code (§6 operation 5).
///
/// `0` and any code outside the taxonomy in §4.1 return `None`; `message_from_code` never
/// panics, matching the C reference's "unknown codes yield no message" contract.
pub fn message_from_code(code: i32) -> Option<&'static str> {
    Error::from_code(code).map(Error::as_str)
}
