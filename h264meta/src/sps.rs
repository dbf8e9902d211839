//! Sequence parameter set decoding.

use derive_more::Display;
use mediameta_common::parse::{BitReader, ReadError};
use mediameta_common::{Diagnostics, Result};

use crate::error::SpsError;
use crate::nal::{strip_emulation_prevention, NalHeader, NAL_UNIT_TYPE_SPS};
use crate::profile::{has_chroma_format_syntax, ConstraintFlags, Profile};
use crate::scaling::{self, ScalingMatrices};

//
// public types
//

/// A decoded H.264 sequence parameter set.
///
/// All crop offsets are in pixels, already scaled by the chroma/field crop unit; [`width`](Self::width) and
/// [`height`](Self::height) give the cropped picture size.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sps {
    /// The raw `profile_idc` byte; see [`profile`](Self::profile) for the named lookup.
    pub profile_idc: u8,

    /// The constraint-flag byte following `profile_idc`.
    pub constraint_flags: ConstraintFlags,

    /// The raw `level_idc` byte (level 4.0 is 40).
    pub level_idc: u8,

    /// `seq_parameter_set_id`, at most 31.
    pub seq_parameter_set_id: u8,

    /// The chroma subsampling format.
    pub chroma_format: ChromaFormat,

    /// Whether the three colour planes of a 4:4:4 sequence are coded separately.
    pub separate_colour_plane: bool,

    /// The luma bit depth (8 unless the profile carries the chroma-format syntax).
    pub bit_depth_luma: u8,

    /// The chroma bit depth; always equal to [`bit_depth_luma`](Self::bit_depth_luma).
    pub bit_depth_chroma: u8,

    /// `qpprime_y_zero_transform_bypass_flag`.
    pub transform_bypass: bool,

    /// The scaling matrices, present only when explicitly signalled.
    pub scaling_matrices: Option<Box<ScalingMatrices>>,

    /// The frame-number wrap period, `1 << (log2_max_frame_num_minus4 + 4)`.
    pub max_frame_num: u32,

    /// The picture order count parameters.
    pub pic_order_cnt: PicOrderCnt,

    /// The maximum number of reference frames, at most 16.
    pub max_num_ref_frames: u8,

    /// `gaps_in_frame_num_value_allowed_flag`.
    pub gaps_in_frame_num_allowed: bool,

    /// The picture width in macroblocks, before cropping.
    pub mb_width: u32,

    /// The picture height in macroblocks, before cropping; already doubled for field coding.
    pub mb_height: u32,

    /// Whether the sequence contains only frame macroblocks.
    pub frame_mbs_only: bool,

    /// `mb_adaptive_frame_field_flag`; only read when [`frame_mbs_only`](Self::frame_mbs_only) is unset.
    pub mb_adaptive_frame_field: bool,

    /// `direct_8x8_inference_flag`.
    pub direct_8x8_inference: bool,

    /// The frame crop offsets, in pixels.
    pub crop: CropOffsets,

    /// The sample aspect ratio, if signalled; `0:0` inside [`Some`] means "unspecified" (indicator zero).
    pub sample_aspect_ratio: Option<SampleAspectRatio>,

    /// The signalled video format (component/PAL/NTSC/...), defaulting to 5 ("unspecified").
    pub video_format: u8,

    /// Whether sample values use the full range rather than the studio swing.
    pub video_full_range: bool,

    /// The colour primaries code point, defaulting to 2 ("unspecified").
    pub colour_primaries: u8,

    /// The transfer characteristics code point, defaulting to 2 ("unspecified").
    pub transfer_characteristics: u8,

    /// The matrix coefficients code point, defaulting to 2 ("unspecified").
    pub matrix_coefficients: u8,

    /// The chroma sample locations for the top and bottom fields, if signalled.
    pub chroma_sample_location: Option<(u8, u8)>,

    /// The frame timing, if signalled.
    pub frame_rate: Option<FrameRate>,
}

/// The chroma subsampling format of a sequence.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq)]
pub enum ChromaFormat {
    /// Luma only.
    #[display(fmt = "monochrome")]
    Monochrome,

    /// 4:2:0 subsampling.
    #[default]
    #[display(fmt = "4:2:0")]
    Yuv420,

    /// 4:2:2 subsampling.
    #[display(fmt = "4:2:2")]
    Yuv422,

    /// No subsampling.
    #[display(fmt = "4:4:4")]
    Yuv444,
}

/// The picture order count parameters of a sequence, by `pic_order_cnt_type`.
#[derive(Clone, Debug, PartialEq)]
pub enum PicOrderCnt {
    /// Type 0: order counts are coded directly, modulo a wrap period.
    Type0 {
        /// The wrap period, `1 << (log2_max_pic_order_cnt_lsb_minus4 + 4)`.
        max_pic_order_cnt_lsb: u32,
    },

    /// Type 1: order counts are predicted from frame numbers through a per-cycle offset table.
    Type1 {
        /// `delta_pic_order_always_zero_flag`.
        delta_always_zero: bool,

        /// The offset applied to non-reference pictures.
        offset_for_non_ref_pic: i32,

        /// The offset between the top and bottom fields of a frame.
        offset_for_top_to_bottom_field: i32,

        /// The per-cycle reference frame offsets, sized exactly to the declared count (at most 255).
        offsets_for_ref_frames: Vec<i32>,
    },

    /// Type 2: order counts follow decoding order.
    Type2,
}

/// Frame crop offsets, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CropOffsets {
    /// Pixels cropped from the left edge.
    pub left: u32,
    /// Pixels cropped from the right edge.
    pub right: u32,
    /// Pixels cropped from the top edge.
    pub top: u32,
    /// Pixels cropped from the bottom edge.
    pub bottom: u32,
}

/// A sample aspect ratio.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq)]
#[display(fmt = "{numerator}:{denominator}")]
pub struct SampleAspectRatio {
    /// The horizontal term.
    pub numerator: u16,
    /// The vertical term.
    pub denominator: u16,
}

/// The frame timing signalled in a sequence's usability information.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRate {
    /// Clock ticks per field; a frame is two field periods.
    pub num_units_in_tick: u32,

    /// Clock ticks per second.
    pub time_scale: u32,

    /// Whether the stream promises a fixed frame rate.
    pub fixed_frame_rate: bool,
}

//
// private types
//

/// Sample aspect ratios by `aspect_ratio_idc` (table E-1); indicator 255 signals an explicit ratio.
const ASPECT_RATIOS: [(u16, u16); 17] = [
    (0, 0),
    (1, 1),
    (12, 11),
    (10, 11),
    (16, 11),
    (40, 33),
    (24, 11),
    (20, 11),
    (32, 11),
    (80, 33),
    (18, 11),
    (15, 11),
    (64, 33),
    (160, 99),
    (4, 3),
    (3, 2),
    (2, 1),
];

const EXTENDED_SAR: u32 = 255;

//
// public functions
//

/// Decode one SPS NAL unit.
///
/// The input starts at the NAL header byte, with the Annex-B start code already stripped but emulation-prevention
/// bytes still present; the caller's buffer is not mutated. Any failure is appended to `diagnostics` before being
/// returned.
pub fn parse_sps(nal: &[u8], diagnostics: &mut Diagnostics) -> Result<Sps, SpsError> {
    decode_sps(nal).map_err(|report| {
        diagnostics.log_error("sps", format!("{report:?}"));
        report
    })
}

//
// Sps impls
//

impl Sps {
    /// The cropped picture width, in pixels.
    pub fn width(&self) -> u32 {
        self.mb_width * 16 - self.crop.left - self.crop.right
    }

    /// The cropped picture height, in pixels.
    pub fn height(&self) -> u32 {
        self.mb_height * 16 - self.crop.top - self.crop.bottom
    }

    /// The named profile for this sequence's `profile_idc` / constraint-flag pair, if any.
    pub fn profile(&self) -> Option<Profile> {
        Profile::identify(self.profile_idc, self.constraint_flags)
    }

    /// Frames per second, if timing info was signalled.
    pub fn frames_per_second(&self) -> Option<f64> {
        let frame_rate = self.frame_rate?;
        Some(frame_rate.time_scale as f64 / (2.0 * frame_rate.num_units_in_tick as f64))
    }
}

impl Default for PicOrderCnt {
    fn default() -> Self {
        Self::Type2
    }
}

//
// private functions
//

fn decode_sps(nal: &[u8]) -> Result<Sps, SpsError> {
    ensure_attach!(nal.len() >= 4, SpsError::TruncatedNal);

    let header = NalHeader::parse(nal[0])?;
    ensure_attach!(header.ref_idc != 0, SpsError::InvalidRefId);
    ensure_attach!(header.unit_type == NAL_UNIT_TYPE_SPS, SpsError::InvalidUnitType);

    let mut sps = Sps {
        profile_idc: nal[1],
        constraint_flags: ConstraintFlags::from_bits_truncate(nal[2]),
        level_idc: nal[3],
        chroma_format: ChromaFormat::Yuv420,
        bit_depth_luma: 8,
        bit_depth_chroma: 8,
        video_format: 5,
        colour_primaries: 2,
        transfer_characteristics: 2,
        matrix_coefficients: 2,
        ..Default::default()
    };

    // Everything past the profile/constraint/level bytes is Exp-Golomb coded and must be desanitized first.
    let rbsp = strip_emulation_prevention(&nal[4..]);
    let mut reader = BitReader::new(&rbsp);

    let seq_parameter_set_id = reader.unsigned_exp_golomb()?;
    ensure_attach!(seq_parameter_set_id <= 31, SpsError::InvalidSeqParameterSetId);
    sps.seq_parameter_set_id = seq_parameter_set_id as u8;

    if has_chroma_format_syntax(sps.profile_idc) {
        let chroma_format_idc = reader.unsigned_exp_golomb()?;
        sps.chroma_format = match chroma_format_idc {
            0 => ChromaFormat::Monochrome,
            1 => ChromaFormat::Yuv420,
            2 => ChromaFormat::Yuv422,
            3 => ChromaFormat::Yuv444,
            _ => bail_attach!(SpsError::InvalidChromaFormat, "chroma_format_idc"),
        };
        if sps.chroma_format == ChromaFormat::Yuv444 {
            sps.separate_colour_plane = reader.bit()?;
        }

        let bit_depth_luma_minus8 = reader.unsigned_exp_golomb()?;
        let bit_depth_chroma_minus8 = reader.unsigned_exp_golomb()?;
        ensure_attach!(bit_depth_luma_minus8 <= 6, SpsError::InvalidBitDepth, "bit_depth_luma_minus8");
        ensure_attach!(
            bit_depth_chroma_minus8 <= 6,
            SpsError::InvalidBitDepth,
            "bit_depth_chroma_minus8",
        );
        ensure_attach!(
            bit_depth_luma_minus8 == bit_depth_chroma_minus8,
            SpsError::ConflictingBitDepth,
        );
        sps.bit_depth_luma = bit_depth_luma_minus8 as u8 + 8;
        sps.bit_depth_chroma = bit_depth_chroma_minus8 as u8 + 8;

        sps.transform_bypass = reader.bit()?;

        if reader.bit()? {
            sps.scaling_matrices = Some(Box::new(scaling::decode(&mut reader, sps.chroma_format)?));
        }
    }

    let log2_max_frame_num_minus4 = reader.unsigned_exp_golomb()?;
    ensure_attach!(log2_max_frame_num_minus4 <= 12, SpsError::InvalidLog2MaxFrameNum);
    sps.max_frame_num = 1 << (log2_max_frame_num_minus4 + 4);

    sps.pic_order_cnt = match reader.unsigned_exp_golomb()? {
        0 => {
            let log2_max_pic_order_cnt_lsb_minus4 = reader.unsigned_exp_golomb()?;
            ensure_attach!(
                log2_max_pic_order_cnt_lsb_minus4 <= 12,
                SpsError::InvalidLog2MaxPicOrderCntLsb,
            );
            PicOrderCnt::Type0 { max_pic_order_cnt_lsb: 1 << (log2_max_pic_order_cnt_lsb_minus4 + 4) }
        }
        1 => {
            let delta_always_zero = reader.bit()?;
            let offset_for_non_ref_pic = se32(&mut reader)?;
            let offset_for_top_to_bottom_field = se32(&mut reader)?;

            let cycle_len = reader.unsigned_exp_golomb()?;
            ensure_attach!(cycle_len <= 255, SpsError::InvalidPicOrderCntCycleLength);
            let mut offsets_for_ref_frames = Vec::with_capacity(cycle_len as usize);
            for _ in 0..cycle_len {
                offsets_for_ref_frames.push(se32(&mut reader)?);
            }

            PicOrderCnt::Type1 {
                delta_always_zero,
                offset_for_non_ref_pic,
                offset_for_top_to_bottom_field,
                offsets_for_ref_frames,
            }
        }
        2 => PicOrderCnt::Type2,
        _ => bail_attach!(SpsError::InvalidPicOrderCntType),
    };

    let max_num_ref_frames = reader.unsigned_exp_golomb()?;
    ensure_attach!(max_num_ref_frames <= 16, SpsError::InvalidMaxNumRefFrames);
    sps.max_num_ref_frames = max_num_ref_frames as u8;

    sps.gaps_in_frame_num_allowed = reader.bit()?;

    let pic_width_in_mbs = reader.unsigned_exp_golomb()? + 1;
    let pic_height_in_map_units = reader.unsigned_exp_golomb()? + 1;
    ensure_attach!(pic_width_in_mbs < 65535, SpsError::InvalidPictureSize, "pic_width_in_mbs");
    ensure_attach!(
        pic_height_in_map_units < 65535,
        SpsError::InvalidPictureSize,
        "pic_height_in_map_units",
    );
    sps.mb_width = pic_width_in_mbs as u32;

    sps.frame_mbs_only = reader.bit()?;
    sps.mb_height = pic_height_in_map_units as u32 * (2 - sps.frame_mbs_only as u32);
    if !sps.frame_mbs_only {
        sps.mb_adaptive_frame_field = reader.bit()?;
    }

    sps.direct_8x8_inference = reader.bit()?;

    if reader.bit()? {
        sps.crop = decode_crop(&mut reader, &sps)?;
    }

    if reader.bit()? {
        decode_vui(&mut reader, &mut sps)?;
    }

    log::debug!(
        "sps {id}: {profile:?} level {level} {width}x{height}",
        id = sps.seq_parameter_set_id,
        profile = sps.profile(),
        level = sps.level_idc,
        width = sps.width(),
        height = sps.height(),
    );

    Ok(sps)
}

/// Decode the four frame crop offsets, scaling them from crop units to pixels.
fn decode_crop(reader: &mut BitReader<'_>, sps: &Sps) -> Result<CropOffsets, SpsError> {
    // Crop units are one luma sample for monochrome and separate-colour-plane sequences, one chroma sample
    // otherwise, with the vertical unit doubled for field coding (table 6-1).
    let (sub_width_c, sub_height_c) = match sps.chroma_format {
        _ if sps.separate_colour_plane => (1, 1),
        ChromaFormat::Monochrome => (1, 1),
        ChromaFormat::Yuv420 => (2, 2),
        ChromaFormat::Yuv422 => (2, 1),
        ChromaFormat::Yuv444 => (1, 1),
    };
    let crop_unit_x = sub_width_c as u64;
    let crop_unit_y = sub_height_c as u64 * (2 - sps.frame_mbs_only as u64);

    let left = reader.unsigned_exp_golomb()?.saturating_mul(crop_unit_x);
    let right = reader.unsigned_exp_golomb()?.saturating_mul(crop_unit_x);
    let top = reader.unsigned_exp_golomb()?.saturating_mul(crop_unit_y);
    let bottom = reader.unsigned_exp_golomb()?.saturating_mul(crop_unit_y);

    ensure_attach!(
        left.saturating_add(right) <= sps.mb_width as u64 * 16,
        SpsError::InvalidCrop,
        "horizontal crop",
    );
    ensure_attach!(
        top.saturating_add(bottom) <= sps.mb_height as u64 * 16,
        SpsError::InvalidCrop,
        "vertical crop",
    );

    Ok(CropOffsets { left: left as u32, right: right as u32, top: top as u32, bottom: bottom as u32 })
}

/// Decode the usability information. HRD and bitstream-restriction parameters are intentionally not decoded.
fn decode_vui(reader: &mut BitReader<'_>, sps: &mut Sps) -> Result<(), SpsError> {
    if reader.bit()? {
        let aspect_ratio_idc = reader.bits(8)?;
        sps.sample_aspect_ratio = if aspect_ratio_idc == EXTENDED_SAR {
            Some(SampleAspectRatio {
                numerator: reader.bits(16)? as u16,
                denominator: reader.bits(16)? as u16,
            })
        } else {
            let Some(&(numerator, denominator)) = ASPECT_RATIOS.get(aspect_ratio_idc as usize) else {
                bail_attach!(SpsError::InvalidAspectRatio, "aspect_ratio_idc");
            };
            Some(SampleAspectRatio { numerator, denominator })
        };
    }

    if reader.bit()? {
        let _overscan_appropriate = reader.bit()?;
    }

    if reader.bit()? {
        sps.video_format = reader.bits(3)? as u8;
        sps.video_full_range = reader.bit()?;
        if reader.bit()? {
            sps.colour_primaries = reader.bits(8)? as u8;
            sps.transfer_characteristics = reader.bits(8)? as u8;
            sps.matrix_coefficients = reader.bits(8)? as u8;
        }
    }

    if reader.bit()? {
        let top_field = reader.unsigned_exp_golomb()?;
        let bottom_field = reader.unsigned_exp_golomb()?;
        ensure_attach!(
            top_field <= 5 && bottom_field <= 5,
            SpsError::InvalidChromaSampleLocation,
        );
        sps.chroma_sample_location = Some((top_field as u8, bottom_field as u8));
    }

    if reader.bit()? {
        let num_units_in_tick = reader.bits(32)?;
        ensure_attach!(num_units_in_tick != 0, SpsError::InvalidTimingInfo, "num_units_in_tick");
        let time_scale = reader.bits(32)?;
        ensure_attach!(time_scale != 0, SpsError::InvalidTimingInfo, "time_scale");
        let fixed_frame_rate = reader.bit()?;
        sps.frame_rate = Some(FrameRate { num_units_in_tick, time_scale, fixed_frame_rate });
    }

    Ok(())
}

fn se32(reader: &mut BitReader<'_>) -> Result<i32, SpsError> {
    let value = reader.signed_exp_golomb()?;
    i32::try_from(value).map_err(|_| SpsError::Read(ReadError::Overflow).into())
}
