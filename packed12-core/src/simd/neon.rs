// packed12
// Copyright (c) 2021 The packed12 Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! NEON vector kernels (the "V128-A" back-end, spec.md §4.6).
//!
//! Grounded on `examples/original_source/lib/convert.c`'s `u8_buf_12bit_encoded_to_u16_neon`,
//! `u16_buf_to_u8_12bit_encoded_neon`, and `to_log_encoded_12bit_neon_inline`: same block/tail
//! structure as [`crate::simd::sse41`], but NEON's `vclzq_u16` gives a direct 16-bit leading-zero
//! count and `vshlq_u16` accepts a per-lane (possibly negative) shift amount, so the bit-scan LUT
//! and scalarised variable-shift fallback that SSE4.1 needs aren't required here.
//!
//! A block is four packed groups, same layout as the SSE4.1 back-end: 48 source bytes decode into
//! 32 samples (64 destination bytes); the remainder is handed to [`crate::scalar`].

use core::arch::aarch64::*;

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

/// Un-dispatched NEON decode entry point (spec.md §6 "ISA-specific entry points").
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
        // each at least that long and 16-byte aligned (checked above). NEON is part of the
        // aarch64 baseline, so no runtime feature probe is needed to call this.
        unsafe { decode_blocks(&src[..vec_src], &mut dst[..vec_dst]) };
    }
    if tail_src > 0 {
        scalar::decode(&src[vec_src..], &mut dst[vec_dst..])?;
    }
    Ok(())
}

/// Un-dispatched NEON encode entry point.
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
        // SAFETY: see `decode`.
        unsafe { encode_blocks(&src[..vec_src], &mut dst[..vec_dst]) };
    }
    if tail_src > 0 {
        scalar::encode(&src[vec_src..], &mut dst[vec_dst..])?;
    }
    Ok(())
}

/// Un-dispatched NEON `encode_log_inplace` entry point.
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

#[inline(always)]
unsafe fn decode_kernel(p: uint8x16_t, shuffle_hb: uint8x16_t, shuffle_lb: uint8x16_t, shift_8_4: int16x8_t, shift_0_4: int16x8_t, and_hb: uint16x8_t) -> uint16x8_t {
    let hb = vshlq_u16(vmovl_u8(vget_low_u8(vqtbl1q_u8(p, shuffle_hb))), shift_8_4);
    let lb = vshlq_u16(vmovl_u8(vget_low_u8(vqtbl1q_u8(p, shuffle_lb))), shift_0_4);
    vbslq_u16(and_hb, hb, lb)
}

#[target_feature(enable = "neon")]
unsafe fn decode_blocks(src: &[u8], dst: &mut [u16]) {
    let shuffle_mask_hb = [2u8, 3, 7, 0, 4, 5, 9, 10, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
    let shuffle_mask_lb = [1u8, 2, 6, 7, 11, 4, 8, 9, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
    let and_mask_hb: [u16; 8] = [0x0F00, 0x0FF0, 0x0F00, 0x0FF0, 0x0F00, 0x0FF0, 0x0F00, 0x0FF0];
    let shift_8_4: [i16; 8] = [8, 4, 8, 4, 8, 4, 8, 4];
    let shift_0_4: [i16; 8] = [0, -4, 0, -4, 0, -4, 0, -4];

    let shuffle_hb = vld1q_u8(shuffle_mask_hb.as_ptr());
    let shuffle_lb = vld1q_u8(shuffle_mask_lb.as_ptr());
    let and_hb = vld1q_u16(and_mask_hb.as_ptr());
    let sh84 = vld1q_s16(shift_8_4.as_ptr());
    let sh04 = vld1q_s16(shift_0_4.as_ptr());
    let zero = vdupq_n_u8(0);

    let n_blocks = src.len() / DECODE_SRC_BLOCK;
    for i in 0..n_blocks {
        let src_off = i * DECODE_SRC_BLOCK;
        let dst_off = i * DECODE_DST_BLOCK;

        let v0 = vld1q_u8(src.as_ptr().add(src_off));
        vst1q_u16(dst.as_mut_ptr().add(dst_off), decode_kernel(v0, shuffle_hb, shuffle_lb, sh84, sh04, and_hb));

        let v1 = vld1q_u8(src.as_ptr().add(src_off + 16));
        vst1q_u16(dst.as_mut_ptr().add(dst_off + 8), decode_kernel(vextq_u8(v0, v1, 12), shuffle_hb, shuffle_lb, sh84, sh04, and_hb));

        let v2 = vld1q_u8(src.as_ptr().add(src_off + 32));
        vst1q_u16(dst.as_mut_ptr().add(dst_off + 16), decode_kernel(vextq_u8(v1, v2, 8), shuffle_hb, shuffle_lb, sh84, sh04, and_hb));

        vst1q_u16(dst.as_mut_ptr().add(dst_off + 24), decode_kernel(vextq_u8(v2, zero, 4), shuffle_hb, shuffle_lb, sh84, sh04, and_hb));
    }
}

#[inline(always)]
unsafe fn encode_kernel(v: uint16x8_t, and_hb: uint8x16_t, shiftr_8_4: int16x8_t, shiftl_0_4: int16x8_t, dst_shuffle_hb: uint8x16_t, dst_shuffle_lb: uint8x16_t) -> uint8x16_t {
    let hi = vqtbl1q_u8(vreinterpretq_u8_u16(vshlq_u16(v, shiftl_0_4)), dst_shuffle_hb);
    let lo = vqtbl1q_u8(vreinterpretq_u8_u16(vshlq_u16(v, shiftr_8_4)), dst_shuffle_lb);
    vbslq_u8(and_hb, hi, lo)
}

#[target_feature(enable = "neon")]
unsafe fn encode_blocks(src: &[u16], dst: &mut [u8]) {
    let shuffle_mask_hb: [u8; 16] = [0xFF, 0, 2, 0xFF, 10, 0xFF, 4, 6, 12, 14, 0xFF, 8, 0xFF, 0xFF, 0xFF, 0xFF];
    let shuffle_mask_lb: [u8; 16] = [6, 0xFF, 0, 2, 8, 10, 0xFF, 4, 0xFF, 12, 14, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
    let and_mask_hb: [u8; 16] = [0x00, 0xFF, 0xF0, 0x00, 0xF0, 0x00, 0xFF, 0xF0, 0xFF, 0xF0, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00];
    let shift_8_4: [i16; 8] = [-8, -4, -8, -4, -8, -4, -8, -4];
    let shift_0_4: [i16; 8] = [0, 4, 0, 4, 0, 4, 0, 4];

    let shuffle_hb = vld1q_u8(shuffle_mask_hb.as_ptr());
    let shuffle_lb = vld1q_u8(shuffle_mask_lb.as_ptr());
    let and_hb = vld1q_u8(and_mask_hb.as_ptr());
    let shiftr_8_4 = vld1q_s16(shift_8_4.as_ptr());
    let shiftl_0_4 = vld1q_s16(shift_0_4.as_ptr());
    let zero = vdupq_n_u8(0);

    let n_blocks = src.len() / ENCODE_SRC_BLOCK;
    for i in 0..n_blocks {
        let src_off = i * ENCODE_SRC_BLOCK;
        let dst_off = i * ENCODE_DST_BLOCK;

        let load = |o: usize| vld1q_u16(src.as_ptr().add(src_off + o));
        let v0 = encode_kernel(load(0), and_hb, shiftr_8_4, shiftl_0_4, shuffle_hb, shuffle_lb);
        let v1 = encode_kernel(load(8), and_hb, shiftr_8_4, shiftl_0_4, shuffle_hb, shuffle_lb);
        vst1q_u8(dst.as_mut_ptr().add(dst_off), vorrq_u8(v0, vextq_u8(zero, v1, 4)));

        let v2 = encode_kernel(load(16), and_hb, shiftr_8_4, shiftl_0_4, shuffle_hb, shuffle_lb);
        vst1q_u8(dst.as_mut_ptr().add(dst_off + 16), vorrq_u8(vextq_u8(v1, zero, 4), vextq_u8(zero, v2, 8)));

        let v3 = encode_kernel(load(24), and_hb, shiftr_8_4, shiftl_0_4, shuffle_hb, shuffle_lb);
        vst1q_u8(dst.as_mut_ptr().add(dst_off + 32), vorrq_u8(vextq_u8(v2, zero, 8), vextq_u8(zero, v3, 12)));
    }
}

/// `vbsrq_u16`: per-lane floor(log2) of a 16-bit value via NEON's direct leading-zero-count.
#[inline(always)]
unsafe fn vbsrq_u16(a: uint16x8_t) -> uint16x8_t {
    vsubq_u16(vdupq_n_u16(15), vclzq_u16(a))
}

#[inline(always)]
unsafe fn to_log_encoded_12bit_kernel(p: uint16x8_t) -> uint16x8_t {
    let p = vshlq_n_u16(p, 4);
    let q = vsubq_u16(vbsrq_u16(p), vdupq_n_u16(9));
    vbslq_u16(
        vcgtq_u16(p, vdupq_n_u16(1023)),
        vaddq_u16(vshlq_n_u16(q, 9), vshlq_u16(p, vnegq_s16(vreinterpretq_s16_u16(q)))),
        p,
    )
}

#[target_feature(enable = "neon")]
unsafe fn transform_blocks(buf: &mut [u8]) {
    let shuffle_mask_hb = [2u8, 3, 7, 0, 4, 5, 9, 10, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
    let shuffle_mask_lb = [1u8, 2, 6, 7, 11, 4, 8, 9, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
    let and_mask_hb_dec: [u16; 8] = [0x0F00, 0x0FF0, 0x0F00, 0x0FF0, 0x0F00, 0x0FF0, 0x0F00, 0x0FF0];
    let dec_shift_8_4: [i16; 8] = [8, 4, 8, 4, 8, 4, 8, 4];
    let dec_shift_0_4: [i16; 8] = [0, -4, 0, -4, 0, -4, 0, -4];

    let enc_shuffle_hb: [u8; 16] = [0xFF, 0, 2, 0xFF, 10, 0xFF, 4, 6, 12, 14, 0xFF, 8, 0xFF, 0xFF, 0xFF, 0xFF];
    let enc_shuffle_lb: [u8; 16] = [6, 0xFF, 0, 2, 8, 10, 0xFF, 4, 0xFF, 12, 14, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
    let enc_and_hb: [u8; 16] = [0x00, 0xFF, 0xF0, 0x00, 0xF0, 0x00, 0xFF, 0xF0, 0xFF, 0xF0, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00];
    let enc_shift_8_4: [i16; 8] = [-8, -4, -8, -4, -8, -4, -8, -4];
    let enc_shift_0_4: [i16; 8] = [0, 4, 0, 4, 0, 4, 0, 4];

    let dec_shuffle_hb = vld1q_u8(shuffle_mask_hb.as_ptr());
    let dec_shuffle_lb = vld1q_u8(shuffle_mask_lb.as_ptr());
    let dec_and_hb = vld1q_u16(and_mask_hb_dec.as_ptr());
    let dsh84 = vld1q_s16(dec_shift_8_4.as_ptr());
    let dsh04 = vld1q_s16(dec_shift_0_4.as_ptr());

    let e_shuffle_hb = vld1q_u8(enc_shuffle_hb.as_ptr());
    let e_shuffle_lb = vld1q_u8(enc_shuffle_lb.as_ptr());
    let e_and_hb = vld1q_u8(enc_and_hb.as_ptr());
    let esh84 = vld1q_s16(enc_shift_8_4.as_ptr());
    let esh04 = vld1q_s16(enc_shift_0_4.as_ptr());

    let zero = vdupq_n_u8(0);

    let n_blocks = buf.len() / DECODE_SRC_BLOCK;
    for i in 0..n_blocks {
        let off = i * DECODE_SRC_BLOCK;

        let v0 = vld1q_u8(buf.as_ptr().add(off));
        let v1 = vld1q_u8(buf.as_ptr().add(off + 16));
        let v2 = vld1q_u8(buf.as_ptr().add(off + 32));

        let windows = [v0, vextq_u8(v0, v1, 12), vextq_u8(v1, v2, 8), vextq_u8(v2, zero, 4)];

        let mut encoded = [core::mem::zeroed::<uint8x16_t>(); 4];
        for (idx, w) in windows.into_iter().enumerate() {
            let decoded = decode_kernel(w, dec_shuffle_hb, dec_shuffle_lb, dsh84, dsh04, dec_and_hb);
            let logged = to_log_encoded_12bit_kernel(decoded);
            encoded[idx] = encode_kernel(logged, e_and_hb, esh84, esh04, e_shuffle_hb, e_shuffle_lb);
        }

        vst1q_u8(buf.as_mut_ptr().add(off), vorrq_u8(encoded[0], vextq_u8(zero, encoded[1], 4)));
        vst1q_u8(buf.as_mut_ptr().add(off + 16), vorrq_u8(vextq_u8(encoded[1], zero, 4), vextq_u8(zero, encoded[2], 8)));
        vst1q_u8(buf.as_mut_ptr().add(off + 32), vorrq_u8(vextq_u8(encoded[2], zero, 8), vextq_u8(zero, encoded[3], 12)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_matches_scalar_for_one_full_block() {
        let bytes: Vec<u8> = (0u8..=255).cycle().take(DECODE_SRC_BLOCK).collect();
        let mut want = vec![0u16; DECODE_DST_BLOCK];
        scalar::decode(&bytes, &mut want).unwrap();

        let mut got = vec![0u16; DECODE_DST_BLOCK];
        decode(&bytes, &mut got).unwrap();
        assert_eq!(got, want);
    }

    #[test]
    fn decode_rejects_misaligned_source() {
        let storage = vec![0u8; DECODE_SRC_BLOCK + 1];
        let misaligned = &storage[1..];
        let mut dst = vec![0u16; DECODE_DST_BLOCK];
        assert_eq!(decode(misaligned, &mut dst), Err(Error::SrcNotAligned16));
    }

    #[test]
    fn encode_log_inplace_matches_scalar_over_mixed_block_and_tail() {
        let len = DECODE_SRC_BLOCK * 3 + 12;
        let bytes: Vec<u8> = (0u8..=255).cycle().take(len).collect();

        let mut scalar_buf = bytes.clone();
        scalar::transform_inplace(&mut scalar_buf, crate::log_enc::to_log_encoded_12bit_group).unwrap();

        let mut vector_buf = bytes;
        encode_log_inplace(&mut vector_buf).unwrap();

        assert_eq!(vector_buf, scalar_buf);
    }
}
