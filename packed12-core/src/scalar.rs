// packed12
// Copyright (c) 2021 The packed12 Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scalar reference implementations (spec.md §4.2 decode, §4.3 encode, §4.5 in-place transform).
//!
//! These are the ground truth every vector kernel's tail falls back to (spec.md §4.6 "the tail
//! call is required to preserve bit-exactness"), so they stay dependency-free and are never
//! changed without also updating `layout.rs`.

use crate::error::{Error, Result};
use crate::layout::{decode_group, encode_group, BYTES_PER_GROUP, SAMPLES_PER_GROUP};

/// Decodes `src` (a whole number of 12-byte groups) into `dst` (spec.md §4.2).
///
/// Preconditions, checked in order: empty `src` is success with no writes; `src.len() % 12 != 0`
/// is [`Error::SrcNotDivisibleBy12`]; insufficient `dst` capacity is [`Error::DstTooSmall`].
pub fn decode(src: &[u8], dst: &mut [u16]) -> Result<()> {
    if src.is_empty() {
        return Ok(());
    }
    if src.len() % BYTES_PER_GROUP != 0 {
        return Err(Error::SrcNotDivisibleBy12);
    }
    let n_groups = src.len() / BYTES_PER_GROUP;
    if dst.len() < n_groups * SAMPLES_PER_GROUP {
        return Err(Error::DstTooSmall);
    }

    for (src_group, dst_group) in src.chunks_exact(BYTES_PER_GROUP).zip(dst.chunks_exact_mut(SAMPLES_PER_GROUP)) {
        let bytes: &[u8; BYTES_PER_GROUP] = src_group.try_into().unwrap();
        dst_group.copy_from_slice(&decode_group(bytes));
    }
    Ok(())
}

/// Encodes `src` (a whole number of 8-sample groups) into `dst` (spec.md §4.3).
///
/// Preconditions, checked in order: empty `src` is success with no writes; `src.len() % 8 != 0`
/// is [`Error::SrcNotDivisibleBy8`]; insufficient `dst` capacity is [`Error::DstTooSmall`]. Only
/// the low 12 bits of each source word are used; the upper 4 bits are implicitly masked away by
/// the pack expressions in [`encode_group`].
pub fn encode(src: &[u16], dst: &mut [u8]) -> Result<()> {
    if src.is_empty() {
        return Ok(());
    }
    if src.len() % SAMPLES_PER_GROUP != 0 {
        return Err(Error::SrcNotDivisibleBy8);
    }
    let n_groups = src.len() / SAMPLES_PER_GROUP;
    if dst.len() < n_groups * BYTES_PER_GROUP {
        return Err(Error::DstTooSmall);
    }

    for (src_group, dst_group) in src.chunks_exact(SAMPLES_PER_GROUP).zip(dst.chunks_exact_mut(BYTES_PER_GROUP)) {
        let words: &[u16; SAMPLES_PER_GROUP] = src_group.try_into().unwrap();
        dst_group.copy_from_slice(&encode_group(words));
    }
    Ok(())
}

/// Decodes each 12-byte group of `buf` in place, hands the eight samples to `f`, and repacks
/// whatever `f` wrote back into `buf` (spec.md §4.5).
///
/// `f` is generic rather than a trait object so that callers like [`crate::log_enc::encode_log_inplace`]
/// monomorphise down to a single inlined hot loop with no indirect call per block (spec.md §9
/// "no dynamic dispatch inside hot loops"). Preconditions match [`decode`].
pub fn transform_inplace<F>(buf: &mut [u8], mut f: F) -> Result<()>
where
    F: FnMut(&mut [u16; SAMPLES_PER_GROUP]),
{
    if buf.is_empty() {
        return Ok(());
    }
    if buf.len() % BYTES_PER_GROUP != 0 {
        return Err(Error::SrcNotDivisibleBy12);
    }

    for group in buf.chunks_exact_mut(BYTES_PER_GROUP) {
        let bytes: &[u8; BYTES_PER_GROUP] = (&*group).try_into().unwrap();
        let mut samples = decode_group(bytes);
        f(&mut samples);
        group.copy_from_slice(&encode_group(&samples));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_decode_succeeds_without_writing() {
        let mut dst = [0xFFu16; 4];
        assert_eq!(decode(&[], &mut dst), Ok(()));
        assert_eq!(dst, [0xFFFF; 4]);
    }

    #[test]
    fn empty_encode_succeeds_without_writing() {
        let mut dst = [0xFFu8; 4];
        assert_eq!(encode(&[], &mut dst), Ok(()));
        assert_eq!(dst, [0xFF; 4]);
    }

    #[test]
    fn single_group_decode_then_encode_round_trips() {
        let bytes: [u8; 12] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C];
        let mut words = [0u16; 8];
        decode(&bytes, &mut words).unwrap();

        let mut back = [0u8; 12];
        encode(&words, &mut back).unwrap();
        assert_eq!(back, bytes);
    }

    #[test]
    fn shape_failures_return_documented_codes() {
        let mut dst16 = [0u16; 8];
        assert_eq!(decode(&[0u8; 11], &mut dst16), Err(Error::SrcNotDivisibleBy12));

        let mut dst8 = [0u8; 12];
        assert_eq!(encode(&[0u16; 7], &mut dst8), Err(Error::SrcNotDivisibleBy8));
    }

    #[test]
    fn capacity_failure_leaves_destination_untouched() {
        let src = [0xAAu8; 12];
        let mut dst = [0x55u16; 7];
        let sentinel = dst;
        assert_eq!(decode(&src, &mut dst), Err(Error::DstTooSmall));
        assert_eq!(dst, sentinel);
    }

    #[test]
    fn transform_inplace_sees_exactly_eight_samples_per_group() {
        let mut buf: Vec<u8> = (0u8..24).collect();
        let mut calls = 0;
        transform_inplace(&mut buf, |samples| {
            calls += 1;
            for s in samples.iter_mut() {
                *s = 0;
            }
        })
        .unwrap();
        assert_eq!(calls, 2);
        assert!(buf.iter().all(|&b| b == 0));
    }
}
