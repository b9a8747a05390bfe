// packed12
// Copyright (c) 2021 The packed12 Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SSE4.1 vector kernels (the "V128-B" back-end, spec.md §4.6).
//!
//! Grounded on `examples/original_source/lib/convert.c`'s `u8_buf_12bit_encoded_to_u16_sse4`,
//! `u16_buf_to_u8_12bit_encoded_sse4`, and `to_log_encoded_12bit_sse4_inline`: the decode/encode
//! byte-shuffle-and-mask kernels are line-for-line translations of the original intrinsics; the
//! `_mm_bsr_epi16` leading-bit-scan and `_mm_srlv_epi16x` variable-shift helpers are the same
//! nibble-LUT / scalar-fallback constructions the original credits to a public r/simd discussion.
//!
//! A block is four packed groups: 48 source bytes decode into 32 samples (64 destination bytes),
//! and 32 samples (64 source bytes) encode into 48 destination bytes. Anything left over after the
//! last full block is handed to [`crate::scalar`] so odd-sized buffers stay bit-exact.

use core::arch::x86_64::*;

use crate::error::{Error, Result};
use crate::layout::{BYTES_PER_GROUP, SAMPLES_PER_GROUP};
use crate::scalar;

/// Required alignment, in bytes, of both buffer bases.
pub const ALIGN: usize = 16;
const DECODE_SRC_BLOCK: usize = BYTES_PER_GROUP * 4;
const DECODE_DST_BLOCK: usize = SAMPLES_PER_GROUP * 4;
const ENCODE_SRC_BLOCK: usize = SAMPLES_PER_GROUP * 4;
const ENCODE_DST_BLOCK: usize = BYTES_PER_GROUP * 4;

#[inline]
fn is_aligned(ptr: *const u8, align: usize) -> bool {
    (ptr as usize) & (align - 1) == 0
}

/// Un-dispatched SSE4.1 decode entry point (spec.md §6 "ISA-specific entry points").
pub fn decode(src: &[u8], dst: &mut [u16]) -> Result<()> {
    if src.is_empty() {
        return Ok(());
    }
    if !is_aligned(src.as_ptr(), ALIGN) {
        return Err(Error::SrcNotAligned16);
    }
    if !is_aligned(dst.as_ptr() as *const u8, ALIGN) {
        return Err(Error::DstNotAligned16);
    }
    if src.len() % BYTES_PER_GROUP != 0 {
        return Err(Error::SrcNotDivisibleBy12);
    }
    let n_groups = src.len() / BYTES_PER_GROUP;
    if dst.len() < n_groups * SAMPLES_PER_GROUP {
        return Err(Error::DstTooSmall);
    }

    let tail_src = src.len() % DECODE_SRC_BLOCK;
    let vec_src = src.len() - tail_src;
    let vec_dst = (vec_src / BYTES_PER_GROUP) * SAMPLES_PER_GROUP;

    if vec_src > 0 {
        // SAFETY: `vec_src` is a whole number of `DECODE_SRC_BLOCK`-sized blocks, `src`/`dst` are
        // each at least that long and 16-byte aligned (checked above), and SSE4.1 is available
        // (this function is only reachable through the dispatcher's feature probe, or directly by
        // a caller who has already established the target supports SSE4.1).
        unsafe { decode_blocks(&src[..vec_src], &mut dst[..vec_dst]) };
    }
    if tail_src > 0 {
        scalar::decode(&src[vec_src..], &mut dst[vec_dst..])?;
    }
    Ok(())
}

/// Un-dispatched SSE4.1 encode entry point.
pub fn encode(src: &[u16], dst: &mut [u8]) -> Result<()> {
    if src.is_empty() {
        return Ok(());
    }
    if !is_aligned(src.as_ptr() as *const u8, ALIGN) {
        return Err(Error::SrcNotAligned16);
    }
    if !is_aligned(dst.as_ptr(), ALIGN) {
        return Err(Error::DstNotAligned16);
    }
    if src.len() % SAMPLES_PER_GROUP != 0 {
        return Err(Error::SrcNotDivisibleBy8);
    }
    let n_groups = src.len() / SAMPLES_PER_GROUP;
    if dst.len() < n_groups * BYTES_PER_GROUP {
        return Err(Error::DstTooSmall);
    }

    let tail_src = src.len() % ENCODE_SRC_BLOCK;
    let vec_src = src.len() - tail_src;
    let vec_dst = (vec_src / SAMPLES_PER_GROUP) * BYTES_PER_GROUP;

    if vec_src > 0 {
        // SAFETY: see `decode`; the same block/alignment reasoning applies with src/dst swapped.
        unsafe { encode_blocks(&src[..vec_src], &mut dst[..vec_dst]) };
    }
    if tail_src > 0 {
        scalar::encode(&src[vec_src..], &mut dst[vec_dst..])?;
    }
    Ok(())
}

/// Un-dispatched SSE4.1 `encode_log_inplace` entry point (spec.md §4.6 "Log-encode vector kernel").
pub fn encode_log_inplace(buf: &mut [u8]) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    if !is_aligned(buf.as_ptr(), ALIGN) {
        return Err(Error::SrcNotAligned16);
    }
    if buf.len() % BYTES_PER_GROUP != 0 {
        return Err(Error::SrcNotDivisibleBy12);
    }

    let tail = buf.len() % DECODE_SRC_BLOCK;
    let vec_len = buf.len() - tail;

    if vec_len > 0 {
        // SAFETY: `vec_len` is a whole number of 48-byte blocks and `buf` is 16-byte aligned.
        unsafe { transform_blocks(&mut buf[..vec_len]) };
    }
    if tail > 0 {
        scalar::transform_inplace(&mut buf[vec_len..], crate::log_enc::to_log_encoded_12bit_group)?;
    }
    Ok(())
}

#[target_feature(enable = "sse4.1")]
unsafe fn decode_blocks(src: &[u8], dst: &mut [u16]) {
    let shuffle_mask_hb = _mm_setr_epi8(2, 3, 7, 0, 4, 5, 9, 10, -1, -1, -1, -1, -1, -1, -1, -1);
    let shuffle_mask_lb = _mm_setr_epi8(1, 2, 6, 7, 11, 4, 8, 9, -1, -1, -1, -1, -1, -1, -1, -1);
    let and_mask_hb = _mm_setr_epi16(0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16);
    let and_mask_lb = _mm_setr_epi16(0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F);

    let n_blocks = src.len() / DECODE_SRC_BLOCK;
    for i in 0..n_blocks {
        let src_off = i * DECODE_SRC_BLOCK;
        let dst_off = i * DECODE_DST_BLOCK;

        let v0 = _mm_loadu_si128(src.as_ptr().add(src_off) as *const __m128i);
        store_u16x8(dst, dst_off, decode_kernel(v0, shuffle_mask_hb, shuffle_mask_lb, and_mask_hb, and_mask_lb));

        let v1 = _mm_loadu_si128(src.as_ptr().add(src_off + 16) as *const __m128i);
        let p1 = _mm_alignr_epi8(v1, v0, 12);
        store_u16x8(dst, dst_off + 8, decode_kernel(p1, shuffle_mask_hb, shuffle_mask_lb, and_mask_hb, and_mask_lb));

        let v2 = _mm_loadu_si128(src.as_ptr().add(src_off + 32) as *const __m128i);
        let p2 = _mm_alignr_epi8(v2, v1, 8);
        store_u16x8(dst, dst_off + 16, decode_kernel(p2, shuffle_mask_hb, shuffle_mask_lb, and_mask_hb, and_mask_lb));

        let p3 = _mm_srli_si128(v2, 4);
        store_u16x8(dst, dst_off + 24, decode_kernel(p3, shuffle_mask_hb, shuffle_mask_lb, and_mask_hb, and_mask_lb));
    }
}

#[inline(always)]
unsafe fn decode_kernel(p: __m128i, shuffle_hb: __m128i, shuffle_lb: __m128i, and_hb: __m128i, and_lb: __m128i) -> __m128i {
    let mut phb = _mm_cvtepu8_epi16(_mm_shuffle_epi8(p, shuffle_hb));
    phb = _mm_and_si128(_mm_blend_epi16(_mm_slli_epi16(phb, 8), _mm_slli_epi16(phb, 4), 0b10101010), and_hb);
    let mut plb = _mm_cvtepu8_epi16(_mm_shuffle_epi8(p, shuffle_lb));
    plb = _mm_and_si128(_mm_blend_epi16(plb, _mm_srli_epi16(plb, 4), 0b10101010), and_lb);
    _mm_or_si128(phb, plb)
}

#[inline(always)]
unsafe fn store_u16x8(dst: &mut [u16], offset: usize, v: __m128i) {
    _mm_storeu_si128(dst.as_mut_ptr().add(offset) as *mut __m128i, v);
}

#[target_feature(enable = "sse4.1")]
unsafe fn encode_blocks(src: &[u16], dst: &mut [u8]) {
    let and_mask_hb = _mm_setr_epi16(0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0);
    let dst_shuffle_hb = _mm_setr_epi8(-1, 0, 2, -1, 10, -1, 4, 6, 12, 14, -1, 8, -1, -1, -1, -1);
    let and_mask_lb = _mm_setr_epi16(0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF);
    let dst_shuffle_lb = _mm_setr_epi8(6, -1, 0, 2, 8, 10, -1, 4, -1, 12, 14, -1, -1, -1, -1, -1);

    let n_blocks = src.len() / ENCODE_SRC_BLOCK;
    for i in 0..n_blocks {
        let src_off = i * ENCODE_SRC_BLOCK;
        let dst_off = i * ENCODE_DST_BLOCK;

        let load = |o: usize| _mm_loadu_si128(src.as_ptr().add(src_off + o) as *const __m128i);
        let v0 = encode_kernel(load(0), and_mask_hb, and_mask_lb, dst_shuffle_hb, dst_shuffle_lb);
        let v1 = encode_kernel(load(8), and_mask_hb, and_mask_lb, dst_shuffle_hb, dst_shuffle_lb);
        _mm_storeu_si128(dst.as_mut_ptr().add(dst_off) as *mut __m128i, _mm_or_si128(v0, _mm_slli_si128(v1, 12)));

        let v2 = encode_kernel(load(16), and_mask_hb, and_mask_lb, dst_shuffle_hb, dst_shuffle_lb);
        _mm_storeu_si128(dst.as_mut_ptr().add(dst_off + 16) as *mut __m128i, _mm_or_si128(_mm_srli_si128(v1, 4), _mm_slli_si128(v2, 8)));

        let v3 = encode_kernel(load(24), and_mask_hb, and_mask_lb, dst_shuffle_hb, dst_shuffle_lb);
        _mm_storeu_si128(dst.as_mut_ptr().add(dst_off + 32) as *mut __m128i, _mm_or_si128(_mm_srli_si128(v2, 8), _mm_slli_si128(v3, 4)));
    }
}

#[inline(always)]
unsafe fn encode_kernel(v: __m128i, and_hb: __m128i, and_lb: __m128i, dst_shuffle_hb: __m128i, dst_shuffle_lb: __m128i) -> __m128i {
    _mm_or_si128(
        _mm_shuffle_epi8(_mm_and_si128(_mm_blend_epi16(v, _mm_slli_epi16(v, 4), 0b10101010), and_hb), dst_shuffle_hb),
        _mm_shuffle_epi8(_mm_and_si128(_mm_blend_epi16(_mm_srli_epi16(v, 8), _mm_srli_epi16(v, 4), 0b10101010), and_lb), dst_shuffle_lb),
    )
}

/// `_mm_bsr_epi16`: per-lane floor(log2) of a 16-bit value via a nibble lookup table.
///
/// Credited in the original source to a public r/simd discussion on bit-scan tricks; reproduced
/// here because SSE4.1 (unlike AVX-512's `VPLZCNTW`) has no direct 16-bit bit-scan instruction.
#[inline(always)]
unsafe fn mm_bsr_epi16(h: __m128i) -> __m128i {
    let lut_lo = _mm_set_epi8(11, 11, 11, 11, 11, 11, 11, 11, 10, 10, 10, 10, 9, 9, 8, 0);
    let lut_hi = _mm_set_epi8(15, 15, 15, 15, 15, 15, 15, 15, 14, 14, 14, 14, 13, 13, 12, 0);
    let nibble_mask = _mm_set1_epi8(0x0F);
    let adj = _mm_set1_epi16(0x1F08u16 as i16);

    let h = _mm_max_epu8(
        _mm_shuffle_epi8(lut_hi, _mm_and_si128(_mm_srli_epi16(h, 4), nibble_mask)),
        _mm_shuffle_epi8(lut_lo, _mm_and_si128(nibble_mask, h)),
    );
    _mm_max_epi8(_mm_sub_epi8(h, adj), _mm_srli_epi16(h, 8))
}

/// Per-lane variable right shift of 16-bit values, the operation SSE4.1 has no instruction for.
///
/// With AVX2 available `_mm_srlv_epi32` does the work after widening to 32 bits and narrowing back
/// (`_mm_srlv_epi16x` in the original); plain SSE4.1 has no 32-bit variable shift either, so the
/// original falls back to eight scalar shifts through a stack buffer, which is what this does.
#[inline(always)]
unsafe fn mm_srlv_epi16x(a: __m128i, count: __m128i) -> __m128i {
    #[cfg(target_feature = "avx2")]
    {
        let lo = _mm_srlv_epi32(_mm_cvtepu16_epi32(a), _mm_cvtepu16_epi32(count));
        let hi = _mm_srlv_epi32(_mm_cvtepu16_epi32(_mm_srli_si128(a, 8)), _mm_cvtepu16_epi32(_mm_srli_si128(count, 8)));
        _mm_packus_epi32(lo, hi)
    }
    #[cfg(not(target_feature = "avx2"))]
    {
        let mut a_arr = [0u16; 8];
        let mut c_arr = [0u16; 8];
        _mm_storeu_si128(a_arr.as_mut_ptr() as *mut __m128i, a);
        _mm_storeu_si128(c_arr.as_mut_ptr() as *mut __m128i, count);
        for i in 0..8 {
            // `count` carries garbage (e.g. a wrapped-negative `q`) in lanes the identity branch
            // will select instead of this result, so an out-of-range shift here must saturate to
            // 0 rather than panic — `u16::>>=` panics in debug builds on a shift >= 16.
            a_arr[i] = a_arr[i].checked_shr(c_arr[i] as u32).unwrap_or(0);
        }
        _mm_loadu_si128(a_arr.as_ptr() as *const __m128i)
    }
}

#[inline(always)]
unsafe fn mm_cmplt_epu16(a: __m128i, b: __m128i) -> __m128i {
    let bias = _mm_set1_epi16(0x8000u16 as i16);
    _mm_cmplt_epi16(_mm_xor_si128(a, bias), _mm_xor_si128(b, bias))
}

#[inline(always)]
unsafe fn to_log_encoded_12bit_kernel(p: __m128i) -> __m128i {
    let p = _mm_slli_epi16(p, 4);
    let q = _mm_sub_epi16(mm_bsr_epi16(p), _mm_set1_epi16(9));
    _mm_blendv_epi8(
        _mm_add_epi16(_mm_slli_epi16(q, 9), mm_srlv_epi16x(p, q)),
        p,
        mm_cmplt_epu16(p, _mm_set1_epi16(1024)),
    )
}

#[target_feature(enable = "sse4.1")]
unsafe fn transform_blocks(buf: &mut [u8]) {
    let shuffle_mask_hb = _mm_setr_epi8(2, 3, 7, 0, 4, 5, 9, 10, -1, -1, -1, -1, -1, -1, -1, -1);
    let shuffle_mask_lb = _mm_setr_epi8(1, 2, 6, 7, 11, 4, 8, 9, -1, -1, -1, -1, -1, -1, -1, -1);
    let and_mask_hb = _mm_setr_epi16(0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16);
    let and_mask_lb = _mm_setr_epi16(0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F);

    let enc_and_hb = _mm_setr_epi16(0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0);
    let enc_dst_shuffle_hb = _mm_setr_epi8(-1, 0, 2, -1, 10, -1, 4, 6, 12, 14, -1, 8, -1, -1, -1, -1);
    let enc_and_lb = _mm_setr_epi16(0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF);
    let enc_dst_shuffle_lb = _mm_setr_epi8(6, -1, 0, 2, 8, 10, -1, 4, -1, 12, 14, -1, -1, -1, -1, -1);

    let n_blocks = buf.len() / DECODE_SRC_BLOCK;
    for i in 0..n_blocks {
        let off = i * DECODE_SRC_BLOCK;

        let v0 = _mm_loadu_si128(buf.as_ptr().add(off) as *const __m128i);
        let v1 = _mm_loadu_si128(buf.as_ptr().add(off + 16) as *const __m128i);
        let v2 = _mm_loadu_si128(buf.as_ptr().add(off + 32) as *const __m128i);

        let windows = [v0, _mm_alignr_epi8(v1, v0, 12), _mm_alignr_epi8(v2, v1, 8), _mm_srli_si128(v2, 4)];

        let mut encoded = [core::mem::zeroed::<__m128i>(); 4];
        for (i, w) in windows.into_iter().enumerate() {
            let decoded = decode_kernel(w, shuffle_mask_hb, shuffle_mask_lb, and_mask_hb, and_mask_lb);
            let logged = to_log_encoded_12bit_kernel(decoded);
            encoded[i] = encode_kernel(logged, enc_and_hb, enc_and_lb, enc_dst_shuffle_hb, enc_dst_shuffle_lb);
        }

        _mm_storeu_si128(buf.as_mut_ptr().add(off) as *mut __m128i, _mm_or_si128(encoded[0], _mm_slli_si128(encoded[1], 12)));
        _mm_storeu_si128(buf.as_mut_ptr().add(off + 16) as *mut __m128i, _mm_or_si128(_mm_srli_si128(encoded[1], 4), _mm_slli_si128(encoded[2], 8)));
        _mm_storeu_si128(buf.as_mut_ptr().add(off + 32) as *mut __m128i, _mm_or_si128(_mm_srli_si128(encoded[2], 8), _mm_slli_si128(encoded[3], 4)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_sse41() -> bool {
        std::is_x86_feature_detected!("sse4.1")
    }

    #[test]
    fn decode_matches_scalar_for_one_full_block() {
        if !has_sse41() {
            return;
        }
        let bytes: Vec<u8> = (0u8..=255).cycle().take(DECODE_SRC_BLOCK).collect();
        let mut want = vec![0u16; DECODE_DST_BLOCK];
        scalar::decode(&bytes, &mut want).unwrap();

        let mut got = vec![0u16; DECODE_DST_BLOCK];
        decode(&bytes, &mut got).unwrap();
        assert_eq!(got, want);
    }

    #[test]
    fn decode_rejects_misaligned_source() {
        if !has_sse41() {
            return;
        }
        let storage = vec![0u8; DECODE_SRC_BLOCK + 1];
        let misaligned = &storage[1..];
        let mut dst = vec![0u16; DECODE_DST_BLOCK];
        assert_eq!(decode(misaligned, &mut dst), Err(Error::SrcNotAligned16));
    }

    #[test]
    fn encode_log_inplace_matches_scalar_over_mixed_block_and_tail() {
        if !has_sse41() {
            return;
        }
        let len = DECODE_SRC_BLOCK * 3 + 12;
        let bytes: Vec<u8> = (0u8..=255).cycle().take(len).collect();

        let mut scalar_buf = bytes.clone();
        scalar::transform_inplace(&mut scalar_buf, crate::log_enc::to_log_encoded_12bit_group).unwrap();

        let mut vector_buf = bytes;
        encode_log_inplace(&mut vector_buf).unwrap();

        assert_eq!(vector_buf, scalar_buf);
    }
}
