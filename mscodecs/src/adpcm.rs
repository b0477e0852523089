//! The IMA ADPCM audio decoder.
//!
//! Each input byte carries two 4-bit codes, high nibble first. A code is
//! sign-magnitude: bit 3 is the sign, bits 0..2 scale the current step size.
//! Every code yields one signed 16-bit PCM sample, so `n` input bytes decode
//! to exactly `2 * n` samples.

use alloc::vec::Vec;
use byteorder::{ByteOrder, LittleEndian};
use snafu::Snafu;

/// The 89-entry IMA step-size table.
const STEP_SIZES: [i32; 89] = [
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17, 19, 21, 23, 25, 28, 31, 34, 37, 41, 45, 50, 55, 60, 66,
    73, 80, 88, 97, 107, 118, 130, 143, 157, 173, 190, 209, 230, 253, 279, 307, 337, 371, 408,
    449, 494, 544, 598, 658, 724, 796, 876, 963, 1060, 1166, 1282, 1411, 1552, 1707, 1878, 2066,
    2272, 2499, 2749, 3024, 3327, 3660, 4026, 4428, 4871, 5358, 5894, 6484, 7132, 7845, 8630,
    9493, 10442, 11487, 12635, 13899, 15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794,
    32767,
];

/// Step-index adjustment per magnitude value (`code & 7`).
const STEP_CHANGES: [i32; 8] = [-1, -1, -1, -1, 2, 4, 6, 8];

#[derive(Debug, Snafu)]
pub enum DecodeError {
    /// The sample buffer could not be allocated.
    #[snafu(display("failed to allocate the {samples}-sample output buffer"))]
    AllocationFailure { samples: usize },
}

/// Adaptive predictor state.
///
/// Reset at the start of every [`decode`] call; exposed so callers that split
/// a stream into nibbles themselves can drive the decoder code by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdpcmState {
    predictor: i32,
    step_index: usize,
}

impl AdpcmState {
    pub const fn new() -> Self {
        Self {
            predictor: 0,
            step_index: 0,
        }
    }

    /// Decodes one 4-bit code into the next PCM sample.
    ///
    /// Only the low four bits of `code` are used.
    pub fn decode_code(&mut self, code: u8) -> i16 {
        let step = STEP_SIZES[self.step_index];
        let magnitude = ((code as i32 & 0x7) << 1) | 1;
        let mut diff = (step * magnitude) >> 3;
        if code & 0x8 != 0 {
            diff = -diff;
        }

        self.predictor = (self.predictor + diff).clamp(i16::MIN as i32, i16::MAX as i32);
        self.step_index = (self.step_index as i32 + STEP_CHANGES[(code & 0x7) as usize])
            .clamp(0, STEP_SIZES.len() as i32 - 1) as usize;

        self.predictor as i16
    }
}

impl Default for AdpcmState {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes a compressed stream into 16-bit PCM samples.
///
/// Predictor state starts fresh for every call. Chunked sources must be
/// decoded chunk by chunk, not concatenated, to reproduce the engine's
/// output.
pub fn decode(src: &[u8]) -> Result<Vec<i16>, DecodeError> {
    let sample_count = src.len() * 2;
    let mut samples = Vec::new();
    samples
        .try_reserve_exact(sample_count)
        .map_err(|_| DecodeError::AllocationFailure {
            samples: sample_count,
        })?;

    let mut state = AdpcmState::new();
    for &byte in src {
        samples.push(state.decode_code(byte >> 4));
        samples.push(state.decode_code(byte & 0xf));
    }
    Ok(samples)
}

/// Decodes a compressed stream straight to little-endian PCM bytes.
///
/// This is the layout the engine's sound chunks are consumed in: two bytes
/// per sample, least significant first.
pub fn decode_to_le_bytes(src: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let samples = decode(src)?;
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(samples.len() * 2)
        .map_err(|_| DecodeError::AllocationFailure {
            samples: samples.len(),
        })?;
    bytes.resize(samples.len() * 2, 0);
    LittleEndian::write_i16_into(&samples, &mut bytes);
    Ok(bytes)
}
