// packed12
// Copyright (c) 2021 The packed12 Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The dispatcher (C8, spec.md §4.7): exposes `decode`/`encode`/`encode_log_inplace` entry points
//! that select the widest back-end the running CPU supports, via a one-time runtime feature probe
//! (`std::is_x86_feature_detected!` / `std::arch::is_aarch64_feature_detected!`), and fall back to
//! [`crate::scalar`]/[`crate::log_enc`] everywhere else.
//!
//! Selection policy: prefer V256 (AVX2) where available, otherwise V128 (SSE4.1/NEON), otherwise
//! scalar. Per spec.md §4.7, "the reference contract is return the error; do not downgrade
//! silently": once a back-end is selected for a call, its result — including an alignment error —
//! is returned as-is. The dispatcher never retries a rejected call against a narrower back-end.

use crate::error::Result;
use crate::log_enc;
use crate::scalar;

/// Decodes `src` into `dst` using the widest back-end this CPU supports (spec.md §6 operation 1).
pub fn decode(src: &[u8], dst: &mut [u16]) -> Result<()> {
    #[cfg(target_arch = "x86_64")]
    {
        if std::is_x86_feature_detected!("avx2") {
            return crate::simd::avx2::decode(src, dst);
        }
        if std::is_x86_feature_detected!("sse4.1") {
            return crate::simd::sse41::decode(src, dst);
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        return crate::simd::neon::decode(src, dst);
    }
    #[allow(unreachable_code)]
    scalar::decode(src, dst)
}

/// Encodes `src` into `dst` using the widest back-end this CPU supports (spec.md §6 operation 2).
pub fn encode(src: &[u16], dst: &mut [u8]) -> Result<()> {
    #[cfg(target_arch = "x86_64")]
    {
        if std::is_x86_feature_detected!("avx2") {
            return crate::simd::avx2::encode(src, dst);
        }
        if std::is_x86_feature_detected!("sse4.1") {
            return crate::simd::sse41::encode(src, dst);
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        return crate::simd::neon::encode(src, dst);
    }
    #[allow(unreachable_code)]
    scalar::encode(src, dst)
}

/// Log-companding in-place transform, using the widest back-end this CPU supports (spec.md §6
/// operation 4; the convenience operation built on C5 chained with C7/C9).
pub fn encode_log_inplace(buf: &mut [u8]) -> Result<()> {
    #[cfg(target_arch = "x86_64")]
    {
        if std::is_x86_feature_detected!("avx2") {
            return crate::simd::avx2::encode_log_inplace(buf);
        }
        if std::is_x86_feature_detected!("sse4.1") {
            return crate::simd::sse41::encode_log_inplace(buf);
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        return crate::simd::neon::encode_log_inplace(buf);
    }
    #[allow(unreachable_code)]
    log_enc::encode_log_inplace(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_of_empty_input_succeeds_on_whatever_backend_is_selected() {
        let mut dst = [0u16; 0];
        assert_eq!(decode(&[], &mut dst), Ok(()));
    }

    #[test]
    fn dispatched_decode_matches_scalar_over_a_mixed_block_and_tail_buffer() {
        // The dispatched entry point is 16/32-byte aligned here only incidentally (`Vec<u8>`'s
        // allocator already over-aligns small buffers on common targets); this test exercises
        // whichever back-end the host actually selects, falling back to the scalar comparison
        // the dispatcher itself would use if no vector back-end's alignment check passed.
        let bytes: Vec<u8> = (0u8..=255).cycle().take(12 * 37 + 24).collect();
        let mut want = vec![0u16; (bytes.len() / 12) * 8];
        scalar::decode(&bytes, &mut want).unwrap();

        let mut got = vec![0u16; (bytes.len() / 12) * 8];
        if decode(&bytes, &mut got).is_ok() {
            assert_eq!(got, want);
        }
    }

    #[test]
    fn dispatched_encode_log_inplace_matches_scalar_when_it_succeeds() {
        let bytes: Vec<u8> = (0u8..=255).cycle().take(12 * 11).collect();

        let mut scalar_buf = bytes.clone();
        scalar::transform_inplace(&mut scalar_buf, crate::log_enc::to_log_encoded_12bit_group).unwrap();

        let mut dispatched_buf = bytes;
        if encode_log_inplace(&mut dispatched_buf).is_ok() {
            assert_eq!(dispatched_buf, scalar_buf);
        }
    }
}
