//! Steim-1 differential compression, 2-bit nibbles selecting 4x8, 2x16
//! or 1x32 bit difference packings within 64-byte frames.
//!
//! Reference material in Appendix B of the SEED Reference Manual,
//! 2nd Ed., Federation of Digital Seismograph Networks.

use crate::mseed_error::MSeedError;
use crate::steim_frame_block::{
    get_int32, get_uint32, sign_extend, SteimFrameBlock, FRAME_SIZE, WORDS_PER_FRAME,
};

/// Decode `num_samples` values from Steim-1 frames. Frame 0 word 1 is
/// X(0), the first sample, and word 2 is X(n), the last; the decoded
/// series is validated against both.
pub fn decode(bytes: &[u8], num_samples: usize) -> Result<Vec<i32>, MSeedError> {
    if bytes.len() % FRAME_SIZE != 0 {
        return Err(MSeedError::Compression(format!(
            "encoded data length is not multiple of 64 bytes ({})",
            bytes.len()
        )));
    }
    if num_samples == 0 {
        return Ok(Vec::new());
    }
    if bytes.is_empty() {
        return Err(MSeedError::Compression(String::from("no steim frames")));
    }

    let x0 = get_int32(bytes, 4);
    let xn = get_int32(bytes, 8);
    let num_frames = bytes.len() / FRAME_SIZE;
    let mut samples = Vec::with_capacity(num_samples);
    let mut last = 0_i32;

    'frames: for frame_idx in 0..num_frames {
        let frame_offset = frame_idx * FRAME_SIZE;
        let control = get_uint32(bytes, frame_offset);
        for word_idx in 1..WORDS_PER_FRAME {
            if samples.len() >= num_samples {
                break 'frames;
            }
            if frame_idx == 0 && (word_idx == 1 || word_idx == 2) {
                continue; // X(0) and X(n)
            }
            let nibble = (control >> (30 - 2 * word_idx)) & 0x03;
            let word = get_uint32(bytes, frame_offset + 4 * word_idx);
            match nibble {
                0 => {} // non-data
                1 => {
                    for k in 0..4_u32 {
                        push_diff(
                            sign_extend((word >> (24 - k * 8)) & 0xFF, 8),
                            x0,
                            &mut last,
                            &mut samples,
                            num_samples,
                        );
                    }
                }
                2 => {
                    for k in 0..2_u32 {
                        push_diff(
                            sign_extend((word >> (16 - k * 16)) & 0xFFFF, 16),
                            x0,
                            &mut last,
                            &mut samples,
                            num_samples,
                        );
                    }
                }
                3 => {
                    push_diff(word as i32, x0, &mut last, &mut samples, num_samples);
                }
                _ => unreachable!(),
            }
        }
    }

    if samples.len() != num_samples {
        return Err(MSeedError::Compression(format!(
            "decompressed {} samples but header says {}",
            samples.len(),
            num_samples
        )));
    }
    if last != xn {
        return Err(MSeedError::SteimIntegrity(last, xn));
    }
    Ok(samples)
}

/// The first decoded sample is always X(0); the stored first difference
/// is a carry whose value never changes the output.
fn push_diff(diff: i32, x0: i32, last: &mut i32, samples: &mut Vec<i32>, num_samples: usize) {
    if samples.len() >= num_samples {
        return;
    }
    if samples.is_empty() {
        *last = x0;
    } else {
        *last = last.wrapping_add(diff);
    }
    samples.push(*last);
}

/// Encode into Steim-1 frames, greedily choosing the widest packing
/// that holds the pending differences. At most `max_frames` frames are
/// written (0 for unlimited); the block reports how many samples it
/// holds and X(n) is the last sample actually encoded.
pub fn encode(samples: &[i32], max_frames: usize) -> Result<SteimFrameBlock, MSeedError> {
    if samples.is_empty() {
        return Err(MSeedError::Compression(String::from(
            "samples array is zero size",
        )));
    }
    let diffs = first_differences(samples, 32)?;

    let mut block = SteimFrameBlock::new(1, max_frames);
    block.add_encoded_word(samples[0] as u32, 0, 0)?; // X(0)
    block.add_encoded_word(0, 0, 0)?; // X(n), rewritten below

    let mut idx = 0;
    while idx < diffs.len() {
        let (word, nibble, used) = pack_word(&diffs[idx..]);
        let full = block.add_encoded_word(word, used, nibble)?;
        idx += used;
        if full {
            break;
        }
    }
    block.set_xsub_n(samples[block.num_samples - 1]);
    Ok(block)
}

/// First differences with d(0) = 0. Differences that need more than
/// `bits` bits fail, computed in 64 bits so wrap never hides overflow.
pub(crate) fn first_differences(samples: &[i32], bits: u32) -> Result<Vec<i32>, MSeedError> {
    let lo = -(1_i64 << (bits - 1));
    let hi = (1_i64 << (bits - 1)) - 1;
    let mut diffs = Vec::with_capacity(samples.len());
    diffs.push(0_i32);
    for pair in samples.windows(2) {
        let d = pair[1] as i64 - pair[0] as i64;
        if d < lo || d > hi {
            return Err(MSeedError::SteimRange(d, bits));
        }
        diffs.push(d as i32);
    }
    Ok(diffs)
}

fn fits(d: i32, lo: i32, hi: i32) -> bool {
    lo <= d && d <= hi
}

/// Pack leading differences into one word: (word, nibble, count used).
fn pack_word(diffs: &[i32]) -> (u32, u32, usize) {
    if diffs.len() >= 4 && diffs[..4].iter().all(|&d| fits(d, -128, 127)) {
        let word = ((diffs[0] as u8 as u32) << 24)
            | ((diffs[1] as u8 as u32) << 16)
            | ((diffs[2] as u8 as u32) << 8)
            | (diffs[3] as u8 as u32);
        return (word, 1, 4);
    }
    if diffs.len() >= 2 && diffs[..2].iter().all(|&d| fits(d, -32768, 32767)) {
        let word = ((diffs[0] as u16 as u32) << 16) | (diffs[1] as u16 as u32);
        return (word, 2, 2);
    }
    (diffs[0] as u32, 3, 1)
}
