//! Steim-2 differential compression. The frame layout matches Steim-1
//! but the 2-bit nibble multiplexes with a 2-bit dnib in the data word
//! to select among 30, 15, 10, 8, 6, 5 and 4-bit difference packings.
//!
//! Reference material in Appendix B of the SEED Reference Manual,
//! 2nd Ed., Federation of Digital Seismograph Networks.

use crate::mseed_error::MSeedError;
use crate::steim_frame_block::{
    get_int32, get_uint32, sign_extend, SteimFrameBlock, FRAME_SIZE, WORDS_PER_FRAME,
};

/// Decode `num_samples` values from Steim-2 frames, validating the
/// decoded count and the X(n) reverse integration constant.
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
        if (control >> 30) & 0x03 != 0 {
            return Err(MSeedError::Compression(format!(
                "control word must start with nibble 00, but was {:02b}",
                (control >> 30) & 0x03
            )));
        }
        for word_idx in 1..WORDS_PER_FRAME {
            if samples.len() >= num_samples {
                break 'frames;
            }
            if frame_idx == 0 && (word_idx == 1 || word_idx == 2) {
                continue; // X(0) and X(n)
            }
            let nibble = (control >> (30 - 2 * word_idx)) & 0x03;
            let word = get_uint32(bytes, frame_offset + 4 * word_idx);
            let (count, bits) = match nibble {
                0 => continue, // non-data
                1 => (4, 8),
                2 => match (word >> 30) & 0x03 {
                    1 => (1, 30),
                    2 => (2, 15),
                    3 => (3, 10),
                    dnib => {
                        return Err(MSeedError::Compression(format!(
                            "steim2 nibble 10 with invalid dnib {:02b}",
                            dnib
                        )))
                    }
                },
                3 => match (word >> 30) & 0x03 {
                    0 => (5, 6),
                    1 => (6, 5),
                    2 => (7, 4),
                    dnib => {
                        return Err(MSeedError::Compression(format!(
                            "steim2 nibble 11 with invalid dnib {:02b}",
                            dnib
                        )))
                    }
                },
                _ => unreachable!(),
            };
            for k in 0..count {
                if samples.len() >= num_samples {
                    break;
                }
                let shift = (count - 1 - k) * bits;
                let diff = sign_extend((word >> shift) & ((1 << bits) - 1), bits);
                if samples.is_empty() {
                    last = x0;
                } else {
                    last = last.wrapping_add(diff);
                }
                samples.push(last);
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

/// Encode into Steim-2 frames, greedily choosing the packing that holds
/// the most pending differences. At most `max_frames` frames are
/// written (0 for unlimited); X(n) is the last sample actually encoded.
/// Differences wider than 30 bits cannot be represented and fail.
pub fn encode(samples: &[i32], max_frames: usize) -> Result<SteimFrameBlock, MSeedError> {
    if samples.is_empty() {
        return Err(MSeedError::Compression(String::from(
            "samples array is zero size",
        )));
    }
    let diffs = crate::steim1::first_differences(samples, 30)?;

    let mut block = SteimFrameBlock::new(2, max_frames);
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

fn all_fit(diffs: &[i32], n: usize, lo: i32, hi: i32) -> bool {
    diffs.len() >= n && diffs[..n].iter().all(|&d| lo <= d && d <= hi)
}

fn pack_bits(diffs: &[i32], n: usize, bits: u32, dnib: u32) -> u32 {
    let mut word = dnib << 30;
    let mask = (1_u32 << bits) - 1;
    for (i, &d) in diffs[..n].iter().enumerate() {
        word |= ((d as u32) & mask) << ((n - 1 - i) as u32 * bits);
    }
    word
}

/// Pack leading differences into one word: (word, nibble, count used).
fn pack_word(diffs: &[i32]) -> (u32, u32, usize) {
    if all_fit(diffs, 7, -8, 7) {
        return (pack_bits(diffs, 7, 4, 0b10), 3, 7);
    }
    if all_fit(diffs, 6, -16, 15) {
        return (pack_bits(diffs, 6, 5, 0b01), 3, 6);
    }
    if all_fit(diffs, 5, -32, 31) {
        return (pack_bits(diffs, 5, 6, 0b00), 3, 5);
    }
    if all_fit(diffs, 4, -128, 127) {
        let word = ((diffs[0] as u8 as u32) << 24)
            | ((diffs[1] as u8 as u32) << 16)
            | ((diffs[2] as u8 as u32) << 8)
            | (diffs[3] as u8 as u32);
        return (word, 1, 4);
    }
    if all_fit(diffs, 3, -512, 511) {
        return (pack_bits(diffs, 3, 10, 0b11), 2, 3);
    }
    if all_fit(diffs, 2, -16384, 16383) {
        return (pack_bits(diffs, 2, 15, 0b10), 2, 2);
    }
    ((0b01 << 30) | ((diffs[0] as u32) & 0x3FFF_FFFF), 2, 1)
}
