// packed12
// Copyright (c) 2021 The packed12 Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property tests over the quantified invariants of spec.md §8, plus the seed scenarios listed
//! there as concrete regression fixtures. Grounded on the one `proptest` dependency already
//! present in the retrieved corpus (`symphonia-codec-opus`'s test suite).

use packed12_core::{decode, encode, encode_log_inplace, linear16_to_log12, message_from_code};
use proptest::prelude::*;

fn arb_group_count() -> impl Strategy<Value = usize> {
    0usize..200
}

proptest! {
    /// Round-trip 1: `encode(decode(B)) == B` for any well-formed packed buffer.
    #[test]
    fn round_trip_decode_then_encode(n_groups in arb_group_count(), seed in any::<u64>()) {
        let src: Vec<u8> = (0..n_groups * 12).map(|i| (seed.wrapping_mul(2654435761).wrapping_add(i as u64) >> 8) as u8).collect();

        let mut decoded = vec![0u16; n_groups * 8];
        decode(&src, &mut decoded).unwrap();

        let mut back = vec![0u8; n_groups * 12];
        encode(&decoded, &mut back).unwrap();

        prop_assert_eq!(back, src);
    }

    /// Round-trip 2: for all 16-bit buffers whose values are all in `[0, 4096)`,
    /// `decode(encode(W)) == W`.
    #[test]
    fn round_trip_encode_then_decode(n_groups in arb_group_count(), seed in any::<u64>()) {
        let words: Vec<u16> = (0..n_groups * 8)
            .map(|i| ((seed.wrapping_mul(97).wrapping_add(i as u64 * 37)) & 0x0FFF) as u16)
            .collect();

        let mut encoded = vec![0u8; n_groups * 12];
        encode(&words, &mut encoded).unwrap();

        let mut back = vec![0u16; n_groups * 8];
        decode(&encoded, &mut back).unwrap();

        prop_assert_eq!(back, words);
    }

    /// High-nibble zero: every word `decode` produces has its top 4 bits clear.
    #[test]
    fn decode_output_is_always_12bit_clean(n_groups in 1usize..200, seed in any::<u64>()) {
        let src: Vec<u8> = (0..n_groups * 12).map(|i| (seed.wrapping_mul(2654435761).wrapping_add(i as u64) >> 8) as u8).collect();
        let mut decoded = vec![0u16; n_groups * 8];
        decode(&src, &mut decoded).unwrap();
        for w in decoded {
            prop_assert_eq!(w & 0xF000, 0);
        }
    }

    /// Log-encode range: for all 16-bit `v`, `linear16_to_log12(v) < 4096`.
    #[test]
    fn log_encode_always_in_range(v in any::<u16>()) {
        prop_assert!(linear16_to_log12(v) < 4096);
    }

    /// Log-encode piecewise identity below 1024.
    #[test]
    fn log_encode_identity_below_1024(v in 0u16..1024) {
        prop_assert_eq!(linear16_to_log12(v), v);
    }
}

#[test]
fn empty_decode_succeeds_with_no_writes() {
    let mut dst = [0u16; 0];
    assert_eq!(decode(&[], &mut dst), Ok(()));
}

#[test]
fn single_group_decode_fixture_matches_the_literal_byte_mapping() {
    let bytes: [u8; 12] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C];
    let mut words = [0u16; 8];
    decode(&bytes, &mut words).unwrap();

    let want = [
        ((0x03u16 << 8) & 0x0F00) | 0x02,
        ((0x04u16 << 4) & 0x0FF0) | ((0x03 >> 4) & 0x0F),
        ((0x08u16 << 8) & 0x0F00) | 0x07,
        ((0x01u16 << 4) & 0x0FF0) | ((0x08 >> 4) & 0x0F),
        ((0x05u16 << 8) & 0x0F00) | 0x0C,
        ((0x06u16 << 4) & 0x0FF0) | ((0x05 >> 4) & 0x0F),
        ((0x0Au16 << 8) & 0x0F00) | 0x09,
        ((0x0Bu16 << 4) & 0x0FF0) | ((0x0A >> 4) & 0x0F),
    ];
    assert_eq!(words, want);

    let mut back = [0u8; 12];
    encode(&words, &mut back).unwrap();
    assert_eq!(back, bytes);
}

#[test]
fn shape_failures_return_the_documented_codes() {
    let mut dst16 = [0u16; 8];
    assert_eq!(decode(&[0u8; 11], &mut dst16).unwrap_err().code(), -1);

    let mut dst8 = [0u8; 12];
    assert_eq!(encode(&[0u16; 7], &mut dst8).unwrap_err().code(), -7);
}

#[test]
fn capacity_failure_leaves_destination_byte_identical() {
    let src = [0xAAu8; 12];
    let mut dst = [0x55u16; 7];
    let before = dst;
    assert_eq!(decode(&src, &mut dst).unwrap_err().code(), -2);
    assert_eq!(dst, before);
}

#[test]
fn log_boundary_values_match_the_worked_examples() {
    assert_eq!(linear16_to_log12(1023), 1023);
    assert_eq!(linear16_to_log12(1024), (1 << 9) + (1024 >> 1));
    assert_eq!(linear16_to_log12(0xFFFF), (6 << 9) + (0xFFFFu32 >> 6) as u16);
    assert_eq!(linear16_to_log12(0xFFFF), 4095);
}

#[test]
fn large_buffer_end_to_end_encode_log_inplace_matches_scalar() {
    // A smaller stand-in for spec.md §8 scenario 6's `1620*2880*128`-byte case: large enough to
    // exercise every back-end's full-block path many times over plus a non-multiple tail, with
    // genuinely random (rather than cyclic) data to avoid accidentally-aligned coincidences.
    use rand::{Rng, SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xC0FFEE);

    let n_groups = 48 * 37 + 5;
    let mut buf: Vec<u8> = (0..n_groups * 12).map(|_| rng.gen()).collect();

    let mut want = buf.clone();
    packed12_core::scalar::transform_inplace(&mut want, |samples| {
        for s in samples.iter_mut() {
            *s = linear16_to_log12(*s << 4);
        }
    })
    .unwrap();

    encode_log_inplace(&mut buf).unwrap();
    assert_eq!(buf, want);
}

#[test]
fn message_lookup_matches_the_documented_table() {
    assert_eq!(message_from_code(0), None);
    assert_eq!(message_from_code(-1), Some("source buffer must be divisible by 12"));
    assert_eq!(message_from_code(-2), Some("destination buffer is too small"));
    assert_eq!(message_from_code(-7), Some("source buffer must be divisible by 8"));
    assert_eq!(message_from_code(-8), None);
}
