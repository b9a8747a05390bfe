// packed12
// Copyright (c) 2021 The packed12 Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The canonical bit-layout contract (spec.md §3): the mapping between one 12-byte packed group
//! and eight 12-bit samples stored in 16-bit words. Every other backend (scalar or vector) is
//! defined to be bit-exactly equivalent to the two functions in this module.

/// Bytes per packed group.
pub const BYTES_PER_GROUP: usize = 12;
/// Decoded samples per packed group.
pub const SAMPLES_PER_GROUP: usize = 8;

/// Unpacks one 12-byte group into eight 12-bit samples (top 4 bits of each `u16` are zero).
///
/// This is the literal mapping from spec.md §3 and must never be changed without changing the
/// spec: every vector kernel's tail handling calls back into this function (via [`decode_scalar`]
/// in `scalar.rs`) to stay bit-exact on non-multiple buffer lengths.
#[inline]
pub fn decode_group(b: &[u8; BYTES_PER_GROUP]) -> [u16; SAMPLES_PER_GROUP] {
    let b = [
        b[0] as u16,
        b[1] as u16,
        b[2] as u16,
        b[3] as u16,
        b[4] as u16,
        b[5] as u16,
        b[6] as u16,
        b[7] as u16,
        b[8] as u16,
        b[9] as u16,
        b[10] as u16,
        b[11] as u16,
    ];
    [
        ((b[2] << 8) & 0x0F00) | b[1],
        ((b[3] << 4) & 0x0FF0) | ((b[2] >> 4) & 0x0F),
        ((b[7] << 8) & 0x0F00) | b[6],
        ((b[0] << 4) & 0x0FF0) | ((b[7] >> 4) & 0x0F),
        ((b[4] << 8) & 0x0F00) | b[11],
        ((b[5] << 4) & 0x0FF0) | ((b[4] >> 4) & 0x0F),
        ((b[9] << 8) & 0x0F00) | b[8],
        ((b[10] << 4) & 0x0FF0) | ((b[9] >> 4) & 0x0F),
    ]
}

/// Packs eight samples (only the low 12 bits of each are used) back into a 12-byte group.
///
/// The exact inverse of [`decode_group`]; round-tripping any 12-bit-clean `u` through
/// `encode_group(decode_group(...))` and back reproduces the original bytes (spec.md §3
/// invariant 2/3).
#[inline]
pub fn encode_group(u: &[u16; SAMPLES_PER_GROUP]) -> [u8; BYTES_PER_GROUP] {
    [
        ((u[3] >> 4) & 0xFF) as u8,
        (u[0] & 0xFF) as u8,
        (((u[1] << 4) & 0xF0) | ((u[0] >> 8) & 0x0F)) as u8,
        ((u[1] >> 4) & 0xFF) as u8,
        (((u[5] << 4) & 0xF0) | ((u[4] >> 8) & 0x0F)) as u8,
        ((u[5] >> 4) & 0xFF) as u8,
        (u[2] & 0xFF) as u8,
        (((u[3] << 4) & 0xF0) | ((u[2] >> 8) & 0x0F)) as u8,
        (u[6] & 0xFF) as u8,
        (((u[7] << 4) & 0xF0) | ((u[6] >> 8) & 0x0F)) as u8,
        ((u[7] >> 4) & 0xFF) as u8,
        (u[4] & 0xFF) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_matches_the_fixture_from_the_seed_scenario() {
        let bytes: [u8; 12] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C];
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
        assert_eq!(decode_group(&bytes), want);
    }

    #[test]
    fn decode_then_encode_round_trips_any_byte_group() {
        for seed in 0u32..=255 {
            let bytes: [u8; 12] = core::array::from_fn(|i| (seed.wrapping_mul(31).wrapping_add(i as u32)) as u8);
            let decoded = decode_group(&bytes);
            assert!(decoded.iter().all(|&s| s & 0xF000 == 0));
            assert_eq!(encode_group(&decoded), bytes);
        }
    }

    #[test]
    fn encode_then_decode_round_trips_any_12bit_clean_words() {
        for seed in 0u32..=255 {
            let words: [u16; 8] =
                core::array::from_fn(|i| ((seed.wrapping_mul(97).wrapping_add(i as u32 * 37)) & 0x0FFF) as u16);
            let encoded = encode_group(&words);
            assert_eq!(decode_group(&encoded), words);
        }
    }
}
