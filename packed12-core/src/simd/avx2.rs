// packed12
// Copyright (c) 2021 The packed12 Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AVX2 vector kernels (the "V256" back-end, spec.md §4.6).
//!
//! Grounded on `examples/original_source/lib/convert.c`'s `u8_buf_12bit_encoded_to_u16_avx2`,
//! `u16_buf_to_u8_12bit_encoded_avx2`, and `to_log_encoded_12bit_avx2_inline`.
//!
//! The 12-byte group stride does not divide the 32-byte AVX2 lane, so the shuffle/mask control
//! vectors are the [`crate::simd::sse41`] ones duplicated across both 128-bit halves, and each
//! kernel call operates on a 256-bit value assembled from two `__m128i` loads stitched together
//! with `_mm_alignr_epi8` so every decode matches a `vld1q`-style window onto the next 12-byte
//! group (spec.md §4.6 "inter-half byte alignment ... stitches blocks"). A block is eight packed
//! groups: 96 source bytes decode into 64 samples (128 destination bytes); the remainder is
//! handed to [`crate::scalar`].

use core::arch::x86_64::*;

use crate::error::{Error, Result};
use crate::layout::{BYTES_PER_GROUP, SAMPLES_PER_GROUP};
use crate::scalar;

/// Required alignment, in bytes, of both buffer bases.
pub const ALIGN: usize = 32;
const DECODE_SRC_BLOCK: usize = BYTES_PER_GROUP * 8;
const DECODE_DST_BLOCK: usize = SAMPLES_PER_GROUP * 8;
const ENCODE_SRC_BLOCK: usize = SAMPLES_PER_GROUP * 8;
const ENCODE_DST_BLOCK: usize = BYTES_PER_GROUP * 8;

#[inline]
fn is_aligned(ptr: *const u8, align: usize) -> bool {
    (ptr as usize) & (align - 1) == 0
}

/// Un-dispatched AVX2 decode entry point (spec.md §6 "ISA-specific entry points").
pub fn decode(src: &[u8], dst: &mut [u16]) -> Result<()> {
    if src.is_empty() {
        return Ok(());
    }
    if !is_aligned(src.as_ptr(), ALIGN) {
        return Err(Error::SrcNotAligned32);
    }
    if !is_aligned(dst.as_ptr() as *const u8, ALIGN) {
        return Err(Error::DstNotAligned32);
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
        // each at least that long and 32-byte aligned (checked above), and this function is only
        // reachable once the dispatcher's `is_x86_feature_detected!("avx2")` probe has passed, or
        // directly by a caller who has already established AVX2 support.
        unsafe { decode_blocks(&src[..vec_src], &mut dst[..vec_dst]) };
    }
    if tail_src > 0 {
        scalar::decode(&src[vec_src..], &mut dst[vec_dst..])?;
    }
    Ok(())
}

/// Un-dispatched AVX2 encode entry point.
pub fn encode(src: &[u16], dst: &mut [u8]) -> Result<()> {
    if src.is_empty() {
        return Ok(());
    }
    if !is_aligned(src.as_ptr() as *const u8, ALIGN) {
        return Err(Error::SrcNotAligned32);
    }
    if !is_aligned(dst.as_ptr(), ALIGN) {
        return Err(Error::DstNotAligned32);
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
        // SAFETY: see `decode`.
        unsafe { encode_blocks(&src[..vec_src], &mut dst[..vec_dst]) };
    }
    if tail_src > 0 {
        scalar::encode(&src[vec_src..], &mut dst[vec_dst..])?;
    }
    Ok(())
}

/// Un-dispatched AVX2 `encode_log_inplace` entry point (spec.md §4.6 "Log-encode vector kernel").
pub fn encode_log_inplace(buf: &mut [u8]) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    if !is_aligned(buf.as_ptr(), ALIGN) {
        return Err(Error::SrcNotAligned32);
    }
    if buf.len() % BYTES_PER_GROUP != 0 {
        return Err(Error::SrcNotDivisibleBy12);
    }

    let tail = buf.len() % DECODE_SRC_BLOCK;
    let vec_len = buf.len() - tail;

    if vec_len > 0 {
        // SAFETY: `vec_len` is a whole number of 96-byte blocks and `buf` is 32-byte aligned.
        unsafe { transform_blocks(&mut buf[..vec_len]) };
    }
    if tail > 0 {
        scalar::transform_inplace(&mut buf[vec_len..], crate::log_enc::to_log_encoded_12bit_group)?;
    }
    Ok(())
}

/// One AVX2 register's worth of shuffled-and-widened bytes: [`crate::simd::sse41`]'s shuffle masks
/// duplicated across both 128-bit lanes, then zero-extended to 16 bits *within* each lane via
/// `_mm256_unpacklo_epi8` against a zero register — AVX2's per-lane analogue of
/// `_mm_cvtepu8_epi16`, needed because the two lanes hold two independent decode windows and must
/// stay independent (there is no single-instruction cross-lane byte-widen on AVX2).
#[inline(always)]
unsafe fn decode_kernel(p: __m256i, shuffle_hb: __m256i, shuffle_lb: __m256i, and_hb: __m256i, and_lb: __m256i) -> __m256i {
    let zero = _mm256_setzero_si256();

    let mut phb = _mm256_unpacklo_epi8(_mm256_shuffle_epi8(p, shuffle_hb), zero);
    phb = _mm256_and_si256(_mm256_blend_epi16(_mm256_slli_epi16(phb, 8), _mm256_slli_epi16(phb, 4), 0b10101010), and_hb);

    let mut plb = _mm256_unpacklo_epi8(_mm256_shuffle_epi8(p, shuffle_lb), zero);
    plb = _mm256_and_si256(_mm256_blend_epi16(plb, _mm256_srli_epi16(plb, 4), 0b10101010), and_lb);

    _mm256_or_si256(phb, plb)
}

#[target_feature(enable = "avx2")]
unsafe fn decode_blocks(src: &[u8], dst: &mut [u16]) {
    let shuffle_mask_hb = _mm256_setr_epi8(
        2, 3, 7, 0, 4, 5, 9, 10, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 2, 3, 7, 0, 4, 5, 9, 10,
    );
    let shuffle_mask_lb = _mm256_setr_epi8(
        1, 2, 6, 7, 11, 4, 8, 9, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 1, 2, 6, 7, 11, 4, 8, 9,
    );
    let and_mask_hb = _mm256_setr_epi16(
        0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16,
        0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16,
    );
    let and_mask_lb = _mm256_setr_epi16(
        0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F,
    );

    let n_blocks = src.len() / DECODE_SRC_BLOCK;
    for i in 0..n_blocks {
        let src_off = i * DECODE_SRC_BLOCK;
        let dst_off = i * DECODE_DST_BLOCK;

        let v0 = _mm256_loadu_si256(src.as_ptr().add(src_off) as *const __m256i);
        let v00 = _mm256_castsi256_si128(v0);
        let v01 = _mm256_extracti128_si256(v0, 1);
        let p0 = _mm256_insertf128_si256(_mm256_castsi128_si256(v00), _mm_alignr_epi8(v01, v00, 12), 1);
        _mm256_storeu_si256(
            dst.as_mut_ptr().add(dst_off) as *mut __m256i,
            decode_kernel(p0, shuffle_mask_hb, shuffle_mask_lb, and_mask_hb, and_mask_lb),
        );

        let v1 = _mm256_loadu_si256(src.as_ptr().add(src_off + 32) as *const __m256i);
        let v10 = _mm256_castsi256_si128(v1);
        let v11 = _mm256_extracti128_si256(v1, 1);
        let p1 = _mm256_insertf128_si256(_mm256_castsi128_si256(_mm_alignr_epi8(v10, v01, 8)), _mm_srli_si128(v10, 4), 1);
        _mm256_storeu_si256(
            dst.as_mut_ptr().add(dst_off + 16) as *mut __m256i,
            decode_kernel(p1, shuffle_mask_hb, shuffle_mask_lb, and_mask_hb, and_mask_lb),
        );

        let v2 = _mm256_loadu_si256(src.as_ptr().add(src_off + 64) as *const __m256i);
        let v20 = _mm256_castsi256_si128(v2);
        let v21 = _mm256_extracti128_si256(v2, 1);
        let p2 = _mm256_insertf128_si256(_mm256_castsi128_si256(v11), _mm_alignr_epi8(v20, v11, 12), 1);
        _mm256_storeu_si256(
            dst.as_mut_ptr().add(dst_off + 32) as *mut __m256i,
            decode_kernel(p2, shuffle_mask_hb, shuffle_mask_lb, and_mask_hb, and_mask_lb),
        );

        let p3 = _mm256_insertf128_si256(_mm256_castsi128_si256(_mm_alignr_epi8(v21, v20, 8)), _mm_srli_si128(v21, 4), 1);
        _mm256_storeu_si256(
            dst.as_mut_ptr().add(dst_off + 48) as *mut __m256i,
            decode_kernel(p3, shuffle_mask_hb, shuffle_mask_lb, and_mask_hb, and_mask_lb),
        );
    }
}

/// Mirrors [`crate::simd::sse41`]'s `encode_kernel`, then re-stitches the 12-byte-per-8-word
/// result across the 128-bit lane boundary the way the original's
/// `_mm256_epu16_to_12bit_encoded_epu8` does.
#[inline(always)]
unsafe fn encode_kernel(v: __m256i, and_hb: __m256i, and_lb: __m256i, dst_shuffle_hb: __m256i, dst_shuffle_lb: __m256i) -> __m256i {
    let res = _mm256_or_si256(
        _mm256_shuffle_epi8(_mm256_and_si256(_mm256_blend_epi16(v, _mm256_slli_epi16(v, 4), 0b10101010), and_hb), dst_shuffle_hb),
        _mm256_shuffle_epi8(_mm256_and_si256(_mm256_blend_epi16(_mm256_srli_epi16(v, 8), _mm256_srli_epi16(v, 4), 0b10101010), and_lb), dst_shuffle_lb),
    );
    let res_h = _mm256_extracti128_si256(res, 1);
    _mm256_inserti128_si256(
        _mm256_castsi128_si256(_mm_or_si128(_mm256_castsi256_si128(res), _mm_slli_si128(res_h, 12))),
        _mm_srli_si128(res_h, 4),
        1,
    )
}

#[target_feature(enable = "avx2")]
unsafe fn encode_blocks(src: &[u16], dst: &mut [u8]) {
    let and_mask_hb = _mm256_setr_epi16(
        0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0,
    );
    let dst_shuffle_hb = _mm256_setr_epi8(
        -1, 0, 2, -1, 10, -1, 4, 6, 12, 14, -1, 8, -1, -1, -1, -1, -1, 0, 2, -1, 10, -1, 4, 6, 12, 14, -1, 8, -1, -1, -1, -1,
    );
    let and_mask_lb = _mm256_setr_epi16(
        0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF,
    );
    let dst_shuffle_lb = _mm256_setr_epi8(
        6, -1, 0, 2, 8, 10, -1, 4, -1, 12, 14, -1, -1, -1, -1, -1, 6, -1, 0, 2, 8, 10, -1, 4, -1, 12, 14, -1, -1, -1, -1, -1,
    );

    let n_blocks = src.len() / ENCODE_SRC_BLOCK;
    for i in 0..n_blocks {
        let src_off = i * ENCODE_SRC_BLOCK;
        let dst_off = i * ENCODE_DST_BLOCK;

        let load = |o: usize| _mm256_loadu_si256(src.as_ptr().add(src_off + o) as *const __m256i);

        let v0 = encode_kernel(load(0), and_mask_hb, and_mask_lb, dst_shuffle_hb, dst_shuffle_lb);
        let v1 = encode_kernel(load(16), and_mask_hb, and_mask_lb, dst_shuffle_hb, dst_shuffle_lb);
        let v1_lo = _mm256_castsi256_si128(v1);
        _mm256_storeu_si256(
            dst.as_mut_ptr().add(dst_off) as *mut __m256i,
            _mm256_or_si256(v0, _mm256_inserti128_si256(_mm256_setzero_si256(), _mm_slli_si128(v1_lo, 8), 1)),
        );

        let v2 = encode_kernel(load(32), and_mask_hb, and_mask_lb, dst_shuffle_hb, dst_shuffle_lb);
        let v1_hi = _mm256_extracti128_si256(v1, 1);
        let v2_lo = _mm256_castsi256_si128(v2);
        _mm256_storeu_si256(
            dst.as_mut_ptr().add(dst_off + 32) as *mut __m256i,
            _mm256_inserti128_si256(_mm256_castsi128_si256(_mm_alignr_epi8(v1_hi, v1_lo, 8)), v2_lo, 1),
        );

        let v3 = encode_kernel(load(48), and_mask_hb, and_mask_lb, dst_shuffle_hb, dst_shuffle_lb);
        let v2_hi = _mm256_extracti128_si256(v2, 1);
        let v3_lo = _mm256_castsi256_si128(v3);
        let v3_hi = _mm256_extracti128_si256(v3, 1);
        _mm256_storeu_si256(
            dst.as_mut_ptr().add(dst_off + 64) as *mut __m256i,
            _mm256_inserti128_si256(
                _mm256_castsi128_si256(_mm_or_si128(v2_hi, _mm_slli_si128(v3_lo, 8))),
                _mm_or_si128(_mm_srli_si128(v3_lo, 8), _mm_slli_si128(v3_hi, 8)),
                1,
            ),
        );
    }
}

/// `_mm256_bsr_epi16`: credited in the original to the same r/simd nibble-LUT construction as
/// [`crate::simd::sse41::mm_bsr_epi16`], duplicated across both 128-bit halves.
#[inline(always)]
unsafe fn mm256_bsr_epi16(h: __m256i) -> __m256i {
    let lut_lo = _mm256_set_epi8(
        11, 11, 11, 11, 11, 11, 11, 11, 10, 10, 10, 10, 9, 9, 8, 0, 11, 11, 11, 11, 11, 11, 11, 11, 10, 10, 10, 10, 9, 9, 8, 0,
    );
    let lut_hi = _mm256_set_epi8(
        15, 15, 15, 15, 15, 15, 15, 15, 14, 14, 14, 14, 13, 13, 12, 0, 15, 15, 15, 15, 15, 15, 15, 15, 14, 14, 14, 14, 13, 13, 12, 0,
    );
    let nibble_mask = _mm256_set1_epi8(0x0F);
    let adj = _mm256_set1_epi16(0x1F08u16 as i16);

    let h = _mm256_max_epu8(
        _mm256_shuffle_epi8(lut_hi, _mm256_and_si256(_mm256_srli_epi16(h, 4), nibble_mask)),
        _mm256_shuffle_epi8(lut_lo, _mm256_and_si256(nibble_mask, h)),
    );
    _mm256_max_epi8(_mm256_sub_epi8(h, adj), _mm256_srli_epi16(h, 8))
}

/// Per-lane variable right shift of 16-bit values: AVX2 has a 32-bit variable shift
/// (`_mm256_srlv_epi32`), so each half is widened to 32-bit, shifted, and packed back down.
#[inline(always)]
unsafe fn mm256_srlv_epi16x(a: __m256i, count: __m256i) -> __m256i {
    let al = _mm256_srlv_epi32(_mm256_cvtepu16_epi32(_mm256_castsi256_si128(a)), _mm256_cvtepu16_epi32(_mm256_castsi256_si128(count)));
    let ah = _mm256_srlv_epi32(
        _mm256_cvtepu16_epi32(_mm256_extracti128_si256(a, 1)),
        _mm256_cvtepu16_epi32(_mm256_extracti128_si256(count, 1)),
    );
    _mm256_inserti128_si256(
        _mm256_castsi128_si256(_mm_packus_epi32(_mm256_castsi256_si128(al), _mm256_extracti128_si256(al, 1))),
        _mm_packus_epi32(_mm256_castsi256_si128(ah), _mm256_extracti128_si256(ah, 1)),
        1,
    )
}

#[inline(always)]
unsafe fn mm256_cmpgt_epu16(a: __m256i, b: __m256i) -> __m256i {
    let bias = _mm256_set1_epi16(0x8000u16 as i16);
    _mm256_cmpgt_epi16(_mm256_xor_si256(a, bias), _mm256_xor_si256(b, bias))
}

#[inline(always)]
unsafe fn to_log_encoded_12bit_kernel(p: __m256i) -> __m256i {
    let p = _mm256_slli_epi16(p, 4);
    let q = _mm256_sub_epi16(mm256_bsr_epi16(p), _mm256_set1_epi16(9));
    _mm256_blendv_epi8(
        p,
        _mm256_add_epi16(_mm256_slli_epi16(q, 9), mm256_srlv_epi16x(p, q)),
        mm256_cmpgt_epu16(p, _mm256_set1_epi16(1023)),
    )
}

#[target_feature(enable = "avx2")]
unsafe fn transform_blocks(buf: &mut [u8]) {
    let shuffle_mask_hb = _mm256_setr_epi8(
        2, 3, 7, 0, 4, 5, 9, 10, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 2, 3, 7, 0, 4, 5, 9, 10,
    );
    let shuffle_mask_lb = _mm256_setr_epi8(
        1, 2, 6, 7, 11, 4, 8, 9, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 1, 2, 6, 7, 11, 4, 8, 9,
    );
    let and_mask_hb = _mm256_setr_epi16(
        0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16,
        0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16, 0x0F00u16 as i16, 0x0FF0u16 as i16,
    );
    let and_mask_lb = _mm256_setr_epi16(
        0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F,
    );

    let dst_and_hb = _mm256_setr_epi16(
        0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0, 0x00FF, 0x00F0,
    );
    let dst_shuffle_hb = _mm256_setr_epi8(
        -1, 0, 2, -1, 10, -1, 4, 6, 12, 14, -1, 8, -1, -1, -1, -1, -1, 0, 2, -1, 10, -1, 4, 6, 12, 14, -1, 8, -1, -1, -1, -1,
    );
    let dst_and_lb = _mm256_setr_epi16(
        0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF, 0x000F, 0x00FF,
    );
    let dst_shuffle_lb = _mm256_setr_epi8(
        6, -1, 0, 2, 8, 10, -1, 4, -1, 12, 14, -1, -1, -1, -1, -1, 6, -1, 0, 2, 8, 10, -1, 4, -1, 12, 14, -1, -1, -1, -1, -1,
    );

    let n_blocks = buf.len() / DECODE_SRC_BLOCK;
    for i in 0..n_blocks {
        let off = i * DECODE_SRC_BLOCK;

        let v0 = _mm256_loadu_si256(buf.as_ptr().add(off) as *const __m256i);
        let v00 = _mm256_castsi256_si128(v0);
        let v01 = _mm256_extracti128_si256(v0, 1);

        let v1 = _mm256_loadu_si256(buf.as_ptr().add(off + 32) as *const __m256i);
        let v10 = _mm256_castsi256_si128(v1);
        let v11 = _mm256_extracti128_si256(v1, 1);

        let v2 = _mm256_loadu_si256(buf.as_ptr().add(off + 64) as *const __m256i);
        let v20 = _mm256_castsi256_si128(v2);
        let v21 = _mm256_extracti128_si256(v2, 1);

        let windows = [
            _mm256_insertf128_si256(_mm256_castsi128_si256(v00), _mm_alignr_epi8(v01, v00, 12), 1),
            _mm256_insertf128_si256(_mm256_castsi128_si256(_mm_alignr_epi8(v10, v01, 8)), _mm_srli_si128(v10, 4), 1),
            _mm256_insertf128_si256(_mm256_castsi128_si256(v11), _mm_alignr_epi8(v20, v11, 12), 1),
            _mm256_insertf128_si256(_mm256_castsi128_si256(_mm_alignr_epi8(v21, v20, 8)), _mm_srli_si128(v21, 4), 1),
        ];

        let mut res = [core::mem::zeroed::<__m256i>(); 4];
        for (idx, w) in windows.into_iter().enumerate() {
            let decoded = decode_kernel(w, shuffle_mask_hb, shuffle_mask_lb, and_mask_hb, and_mask_lb);
            let logged = to_log_encoded_12bit_kernel(decoded);
            res[idx] = encode_kernel(logged, dst_and_hb, dst_and_lb, dst_shuffle_hb, dst_shuffle_lb);
        }

        let v1_lo_res = _mm256_castsi256_si128(res[1]);
        _mm256_storeu_si256(
            buf.as_mut_ptr().add(off) as *mut __m256i,
            _mm256_or_si256(res[0], _mm256_inserti128_si256(_mm256_setzero_si256(), _mm_slli_si128(v1_lo_res, 8), 1)),
        );

        let v1_hi_res = _mm256_extracti128_si256(res[1], 1);
        let v2_lo_res = _mm256_castsi256_si128(res[2]);
        _mm256_storeu_si256(
            buf.as_mut_ptr().add(off + 32) as *mut __m256i,
            _mm256_inserti128_si256(_mm256_castsi128_si256(_mm_alignr_epi8(v1_hi_res, v1_lo_res, 8)), v2_lo_res, 1),
        );

        let v2_hi_res = _mm256_extracti128_si256(res[2], 1);
        let v3_lo_res = _mm256_castsi256_si128(res[3]);
        let v3_hi_res = _mm256_extracti128_si256(res[3], 1);
        _mm256_storeu_si256(
            buf.as_mut_ptr().add(off + 64) as *mut __m256i,
            _mm256_inserti128_si256(
                _mm256_castsi128_si256(_mm_or_si128(v2_hi_res, _mm_slli_si128(v3_lo_res, 8))),
                _mm_or_si128(_mm_srli_si128(v3_lo_res, 8), _mm_slli_si128(v3_hi_res, 8)),
                1,
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_avx2() -> bool {
        std::is_x86_feature_detected!("avx2")
    }

    #[test]
    fn decode_matches_scalar_for_one_full_block() {
        if !has_avx2() {
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
        if !has_avx2() {
            return;
        }
        let storage = vec![0u8; DECODE_SRC_BLOCK + 1];
        let misaligned = &storage[1..];
        let mut dst = vec![0u16; DECODE_DST_BLOCK];
        assert_eq!(decode(misaligned, &mut dst), Err(Error::SrcNotAligned32));
    }

    #[test]
    fn encode_log_inplace_matches_scalar_over_mixed_block_and_tail() {
        if !has_avx2() {
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

    #[test]
    fn encode_matches_scalar_for_one_full_block() {
        if !has_avx2() {
            return;
        }
        let words: Vec<u16> = (0u16..4096).cycle().take(ENCODE_SRC_BLOCK).collect();
        let mut want = vec![0u8; ENCODE_DST_BLOCK];
        scalar::encode(&words, &mut want).unwrap();

        let mut got = vec![0u8; ENCODE_DST_BLOCK];
        encode(&words, &mut got).unwrap();
        assert_eq!(got, want);
    }
}
