//! Scaling-matrix decoding, with the default/fallback chains of ISO 14496-10 table 7-2.

use mediameta_common::parse::BitReader;
use mediameta_common::Result;

use crate::error::SpsError;
use crate::sps::ChromaFormat;

/// The default intra 4x4 scaling matrix (table 7-3).
pub const DEFAULT_4X4_INTRA: [u8; 16] = [
    6, 13, 13, 20, 20, 20, 28, 28, 28, 28, 32, 32, 32, 37, 37, 42,
];

/// The default inter 4x4 scaling matrix (table 7-3).
pub const DEFAULT_4X4_INTER: [u8; 16] = [
    10, 14, 14, 20, 20, 20, 24, 24, 24, 24, 27, 27, 27, 30, 30, 34,
];

/// The default intra 8x8 scaling matrix (table 7-4).
pub const DEFAULT_8X8_INTRA: [u8; 64] = [
    6, 10, 10, 13, 11, 13, 16, 16, 16, 16, 18, 18, 18, 18, 18, 23, 23, 23, 23, 23, 23, 25, 25, 25,
    25, 25, 25, 25, 27, 27, 27, 27, 27, 27, 27, 27, 29, 29, 29, 29, 29, 29, 29, 31, 31, 31, 31, 31,
    31, 33, 33, 33, 33, 33, 36, 36, 36, 36, 38, 38, 38, 40, 40, 42,
];

/// The default inter 8x8 scaling matrix (table 7-4).
pub const DEFAULT_8X8_INTER: [u8; 64] = [
    9, 13, 13, 15, 13, 15, 17, 17, 17, 17, 19, 19, 19, 19, 19, 21, 21, 21, 21, 21, 21, 22, 22, 22,
    22, 22, 22, 22, 24, 24, 24, 24, 24, 24, 24, 24, 25, 25, 25, 25, 25, 25, 25, 27, 27, 27, 27, 27,
    27, 28, 28, 28, 28, 28, 30, 30, 30, 30, 32, 32, 32, 33, 33, 35,
];

/// Decoded scaling matrices for one sequence parameter set.
///
/// The 4x4 slots are ordered intra Y/Cb/Cr then inter Y/Cb/Cr; the 8x8 slots alternate intra/inter, with only the
/// first two meaningful unless the chroma format is 4:4:4.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScalingMatrices {
    /// The six 4x4 matrices.
    pub four_by_four: [[u8; 16]; 6],

    /// The 8x8 matrices; slots past [`eight_by_eight_count`](Self::eight_by_eight_count) hold the flat default.
    pub eight_by_eight: [[u8; 64]; 6],
}

impl ScalingMatrices {
    /// The number of meaningful 8x8 slots for a chroma format.
    pub fn eight_by_eight_count(chroma_format: ChromaFormat) -> usize {
        if chroma_format == ChromaFormat::Yuv444 {
            6
        } else {
            2
        }
    }
}

impl Default for ScalingMatrices {
    /// The flat matrices used when no scaling lists are transmitted (equations 7-8/7-9).
    fn default() -> Self {
        Self { four_by_four: [[16; 16]; 6], eight_by_eight: [[16; 64]; 6] }
    }
}

/// Decode the `seq_scaling_list_present_flag` block of a sequence parameter set.
pub(crate) fn decode(reader: &mut BitReader<'_>, chroma_format: ChromaFormat) -> Result<ScalingMatrices, SpsError> {
    let mut matrices = ScalingMatrices::default();

    for idx in 0..6 {
        if reader.bit()? {
            decode_list(reader, &mut matrices.four_by_four[idx], default_4x4(idx))?;
        } else {
            fallback_4x4(&mut matrices.four_by_four, idx);
        }
    }

    for idx in 0..ScalingMatrices::eight_by_eight_count(chroma_format) {
        if reader.bit()? {
            decode_list(reader, &mut matrices.eight_by_eight[idx], default_8x8(idx))?;
        } else {
            fallback_8x8(&mut matrices.eight_by_eight, idx);
        }
    }

    Ok(matrices)
}

/// The delta-scale decode of clause 7.3.2.1.1.1.
///
/// A zero `next_scale` on the first entry selects the default matrix for the whole list; a zero later in the list
/// freezes `last_scale` for the remaining entries.
fn decode_list(reader: &mut BitReader<'_>, list: &mut [u8], default: &[u8]) -> Result<(), SpsError> {
    let mut last_scale: i32 = 8;
    let mut next_scale: i32 = 8;

    for idx in 0..list.len() {
        if next_scale != 0 {
            let delta_scale = reader.signed_exp_golomb()?;
            ensure_attach!(
                (-128..=127).contains(&delta_scale),
                SpsError::InvalidScalingMatrixDeltaScale,
            );
            next_scale = (last_scale + delta_scale as i32) & 0xff;
            if idx == 0 && next_scale == 0 {
                list.copy_from_slice(default);
                return Ok(());
            }
        }
        list[idx] = if next_scale == 0 { last_scale as u8 } else { next_scale as u8 };
        last_scale = list[idx] as i32;
    }

    Ok(())
}

fn default_4x4(idx: usize) -> &'static [u8] {
    if idx < 3 {
        &DEFAULT_4X4_INTRA
    } else {
        &DEFAULT_4X4_INTER
    }
}

fn default_8x8(idx: usize) -> &'static [u8] {
    if idx % 2 == 0 {
        &DEFAULT_8X8_INTRA
    } else {
        &DEFAULT_8X8_INTER
    }
}

/// Fallback rule A for an absent 4x4 list: the chain head takes the default, later slots copy their predecessor.
fn fallback_4x4(lists: &mut [[u8; 16]; 6], idx: usize) {
    lists[idx] = match idx {
        0 => DEFAULT_4X4_INTRA,
        3 => DEFAULT_4X4_INTER,
        _ => lists[idx - 1],
    };
}

/// Fallback rule A for an absent 8x8 list: intra/inter chain heads take the defaults, later slots copy the slot two
/// back (the previous list of the same intra/inter kind).
fn fallback_8x8(lists: &mut [[u8; 64]; 6], idx: usize) {
    lists[idx] = match idx {
        0 => DEFAULT_8X8_INTRA,
        1 => DEFAULT_8X8_INTER,
        _ => lists[idx - 2],
    };
}
