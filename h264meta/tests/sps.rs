//! End-to-end SPS decoding tests over bitstreams built by a matching bit-writer.

use assert_matches::assert_matches;

use h264meta::{
    parse_sps, ChromaFormat, PicOrderCnt, Profile, SpsError, DEFAULT_4X4_INTER, DEFAULT_4X4_INTRA,
    DEFAULT_8X8_INTRA,
};
use mediameta_common::parse::ReadError;
use mediameta_common::Diagnostics;

const BASELINE: u8 = 66;
const HIGH: u8 = 100;
const CONSTRAINT_SET1: u8 = 0x40;
const LEVEL_4_0: u8 = 40;

/// Builds the Exp-Golomb payload of an SPS, bit by bit, using the same integer mappings the decoder applies.
#[derive(Default)]
struct SpsWriter {
    bits: Vec<u8>,
}

impl SpsWriter {
    fn bit(&mut self, bit: bool) -> &mut Self {
        self.bits.push(bit as u8);
        self
    }

    fn bits(&mut self, value: u32, count: u32) -> &mut Self {
        for bit_idx in (0..count).rev() {
            self.bits.push((value >> bit_idx & 1) as u8);
        }
        self
    }

    fn ue(&mut self, value: u64) -> &mut Self {
        let code = value + 1;
        let len = 64 - code.leading_zeros();
        for _ in 0..len - 1 {
            self.bits.push(0);
        }
        for bit_idx in (0..len).rev() {
            self.bits.push((code >> bit_idx & 1) as u8);
        }
        self
    }

    fn se(&mut self, value: i64) -> &mut Self {
        let code = if value > 0 {
            2 * value as u64
        } else {
            value.unsigned_abs() * 2 - u64::from(value != 0)
        };
        self.ue(code)
    }

    fn into_nal(self, profile_idc: u8, constraint_flags: u8, level_idc: u8) -> Vec<u8> {
        let mut rbsp = vec![0u8; self.bits.len().div_ceil(8)];
        for (idx, bit) in self.bits.iter().enumerate() {
            rbsp[idx / 8] |= bit << (7 - idx % 8);
        }

        let mut nal = vec![0x67, profile_idc, constraint_flags, level_idc];
        // Escape the payload exactly as an encoder would.
        let mut zero_run = 0;
        for &byte in &rbsp {
            if zero_run >= 2 && byte <= 0x03 {
                nal.push(0x03);
                zero_run = 0;
            }
            nal.push(byte);
            zero_run = if byte == 0 { zero_run + 1 } else { 0 };
        }
        nal
    }
}

/// A progressive 1920x1088 sequence cropped to 1080, up to and excluding the VUI presence flag.
fn write_baseline_1080p(writer: &mut SpsWriter) {
    writer.ue(0); // seq_parameter_set_id
    writer.ue(4); // log2_max_frame_num_minus4
    writer.ue(0); // pic_order_cnt_type
    writer.ue(4); // log2_max_pic_order_cnt_lsb_minus4
    writer.ue(4); // max_num_ref_frames
    writer.bit(false); // gaps_in_frame_num_value_allowed_flag
    writer.ue(119); // pic_width_in_mbs_minus1
    writer.ue(67); // pic_height_in_map_units_minus1
    writer.bit(true); // frame_mbs_only_flag
    writer.bit(true); // direct_8x8_inference_flag
    writer.bit(true); // frame_cropping_flag
    writer.ue(0).ue(0).ue(0).ue(4); // crop offsets; bottom is 4 * 2 = 8 pixels
}

fn decode(nal: &[u8]) -> Result<h264meta::Sps, SpsError> {
    let mut diagnostics = Diagnostics::new();
    parse_sps(nal, &mut diagnostics).map_err(|report| report.into_inner())
}

#[test]
fn baseline_1080p() {
    let mut writer = SpsWriter::default();
    write_baseline_1080p(&mut writer);
    writer.bit(false); // vui_parameters_present_flag
    let sps = decode(&writer.into_nal(BASELINE, 0, LEVEL_4_0)).unwrap();

    assert_eq!(sps.profile(), Some(Profile::Baseline));
    assert_eq!(sps.level_idc, LEVEL_4_0);
    assert_eq!(sps.seq_parameter_set_id, 0);
    assert_eq!((sps.width(), sps.height()), (1920, 1080));
    assert_eq!(sps.crop.bottom, 8);
    assert_eq!(sps.chroma_format, ChromaFormat::Yuv420);
    assert_eq!((sps.bit_depth_luma, sps.bit_depth_chroma), (8, 8));
    assert_eq!(sps.scaling_matrices, None);
    assert_eq!(sps.max_frame_num, 256);
    assert_matches!(sps.pic_order_cnt, PicOrderCnt::Type0 { max_pic_order_cnt_lsb: 256 });
    assert_eq!(sps.max_num_ref_frames, 4);
    assert!(sps.frame_mbs_only);
    assert!(sps.direct_8x8_inference);
    assert_eq!(sps.frame_rate, None);
}

#[test]
fn constraint_set1_flips_baseline_to_constrained() {
    let build = |constraint_flags| {
        let mut writer = SpsWriter::default();
        write_baseline_1080p(&mut writer);
        writer.bit(false);
        decode(&writer.into_nal(BASELINE, constraint_flags, LEVEL_4_0)).unwrap()
    };

    let plain = build(0);
    let constrained = build(CONSTRAINT_SET1);
    assert_eq!(plain.profile(), Some(Profile::Baseline));
    assert_eq!(constrained.profile(), Some(Profile::ConstrainedBaseline));
    assert_eq!(plain.level_idc, constrained.level_idc);
    assert_eq!((plain.width(), plain.height()), (constrained.width(), constrained.height()));
}

/// The chroma-format block of a High-profile SPS, with no scaling matrices.
fn write_high_prefix(writer: &mut SpsWriter) {
    writer.ue(0); // seq_parameter_set_id
    writer.ue(1); // chroma_format_idc
    writer.ue(0).ue(0); // bit depths
    writer.bit(false); // qpprime_y_zero_transform_bypass_flag
    writer.bit(false); // seq_scaling_matrix_present_flag
}

#[test]
fn high_profile_vui() {
    let mut writer = SpsWriter::default();
    write_high_prefix(&mut writer);
    writer.ue(0); // log2_max_frame_num_minus4
    writer.ue(2); // pic_order_cnt_type
    writer.ue(2); // max_num_ref_frames
    writer.bit(false); // gaps
    writer.ue(79).ue(44); // 1280x720
    writer.bit(true); // frame_mbs_only_flag
    writer.bit(true); // direct_8x8_inference_flag
    writer.bit(false); // frame_cropping_flag
    writer.bit(true); // vui_parameters_present_flag

    writer.bit(true); // aspect_ratio_info_present_flag
    writer.bits(255, 8); // extended SAR
    writer.bits(16, 16).bits(9, 16);
    writer.bit(false); // overscan_info_present_flag
    writer.bit(true); // video_signal_type_present_flag
    writer.bits(5, 3); // video_format
    writer.bit(true); // video_full_range_flag
    writer.bit(true); // colour_description_present_flag
    writer.bits(1, 8).bits(1, 8).bits(1, 8); // BT.709
    writer.bit(true); // chroma_loc_info_present_flag
    writer.ue(0).ue(1);
    writer.bit(true); // timing_info_present_flag
    writer.bits(1001, 32).bits(60000, 32);
    writer.bit(true); // fixed_frame_rate_flag

    let sps = decode(&writer.into_nal(HIGH, 0, 31)).unwrap();
    assert_eq!(sps.profile(), Some(Profile::High));
    assert_eq!((sps.width(), sps.height()), (1280, 720));
    assert_matches!(sps.pic_order_cnt, PicOrderCnt::Type2);

    let sar = sps.sample_aspect_ratio.unwrap();
    assert_eq!((sar.numerator, sar.denominator), (16, 9));
    assert_eq!(sps.video_format, 5);
    assert!(sps.video_full_range);
    assert_eq!(
        (sps.colour_primaries, sps.transfer_characteristics, sps.matrix_coefficients),
        (1, 1, 1)
    );
    assert_eq!(sps.chroma_sample_location, Some((0, 1)));

    let frame_rate = sps.frame_rate.unwrap();
    assert_eq!((frame_rate.num_units_in_tick, frame_rate.time_scale), (1001, 60000));
    assert!(frame_rate.fixed_frame_rate);
    let fps = sps.frames_per_second().unwrap();
    assert!((fps - 29.97).abs() < 0.005, "fps = {fps}");
}

#[test]
fn absent_scaling_lists_decode_to_the_fallback_chain() {
    let mut writer = SpsWriter::default();
    writer.ue(0); // seq_parameter_set_id
    writer.ue(1); // chroma_format_idc
    writer.ue(0).ue(0); // bit depths
    writer.bit(false); // transform bypass
    writer.bit(true); // seq_scaling_matrix_present_flag
    for _ in 0..8 {
        writer.bit(false); // every seq_scaling_list_present_flag
    }
    writer.ue(0); // log2_max_frame_num_minus4
    writer.ue(2); // pic_order_cnt_type
    writer.ue(1); // max_num_ref_frames
    writer.bit(false); // gaps
    writer.ue(0).ue(0); // 16x16
    writer.bit(true).bit(true); // frame_mbs_only, direct_8x8
    writer.bit(false).bit(false); // no crop, no vui

    let sps = decode(&writer.into_nal(HIGH, 0, 10)).unwrap();
    let matrices = sps.scaling_matrices.expect("matrices are signalled");
    assert_eq!(matrices.four_by_four[0], DEFAULT_4X4_INTRA);
    assert_eq!(matrices.four_by_four[2], DEFAULT_4X4_INTRA);
    assert_eq!(matrices.four_by_four[3], DEFAULT_4X4_INTER);
    assert_eq!(matrices.eight_by_eight[0], DEFAULT_8X8_INTRA);
}

#[test]
fn pic_order_cnt_type1_offsets() {
    let mut writer = SpsWriter::default();
    writer.ue(0); // seq_parameter_set_id
    writer.ue(0); // log2_max_frame_num_minus4
    writer.ue(1); // pic_order_cnt_type
    writer.bit(false); // delta_pic_order_always_zero_flag
    writer.se(-3).se(2);
    writer.ue(3); // num_ref_frames_in_pic_order_cnt_cycle
    writer.se(1).se(-2).se(5);
    writer.ue(1); // max_num_ref_frames
    writer.bit(false); // gaps
    writer.ue(0).ue(0); // 16x16
    writer.bit(true).bit(true); // frame_mbs_only, direct_8x8
    writer.bit(false).bit(false); // no crop, no vui

    let sps = decode(&writer.into_nal(BASELINE, 0, 10)).unwrap();
    assert_matches!(sps.pic_order_cnt, PicOrderCnt::Type1 {
        delta_always_zero: false,
        offset_for_non_ref_pic: -3,
        offset_for_top_to_bottom_field: 2,
        ref offsets_for_ref_frames,
    } => {
        assert_eq!(offsets_for_ref_frames, &[1, -2, 5]);
    });
}

#[test]
fn interlaced_height_is_doubled() {
    let mut writer = SpsWriter::default();
    writer.ue(0); // seq_parameter_set_id
    writer.ue(0); // log2_max_frame_num_minus4
    writer.ue(2); // pic_order_cnt_type
    writer.ue(1); // max_num_ref_frames
    writer.bit(false); // gaps
    writer.ue(44); // 720 pixels wide
    writer.ue(17); // 18 map units; 36 macroblock rows as fields
    writer.bit(false); // frame_mbs_only_flag
    writer.bit(true); // mb_adaptive_frame_field_flag
    writer.bit(true); // direct_8x8_inference_flag
    writer.bit(false).bit(false); // no crop, no vui

    let sps = decode(&writer.into_nal(BASELINE, 0, 21)).unwrap();
    assert!(!sps.frame_mbs_only);
    assert!(sps.mb_adaptive_frame_field);
    assert_eq!((sps.width(), sps.height()), (720, 576));
}

#[test]
fn monochrome_crop_unit_is_one_sample() {
    let mut writer = SpsWriter::default();
    writer.ue(0); // seq_parameter_set_id
    writer.ue(0); // chroma_format_idc: monochrome
    writer.ue(0).ue(0); // bit depths
    writer.bit(false).bit(false); // transform bypass, scaling matrices
    writer.ue(0); // log2_max_frame_num_minus4
    writer.ue(2); // pic_order_cnt_type
    writer.ue(1); // max_num_ref_frames
    writer.bit(false); // gaps
    writer.ue(1).ue(0); // 32x16
    writer.bit(true).bit(true); // frame_mbs_only, direct_8x8
    writer.bit(true); // frame_cropping_flag
    writer.ue(1).ue(1).ue(0).ue(0); // one sample off each side
    writer.bit(false); // no vui

    let sps = decode(&writer.into_nal(HIGH, 0, 10)).unwrap();
    assert_eq!(sps.chroma_format, ChromaFormat::Monochrome);
    assert_eq!((sps.crop.left, sps.crop.right), (1, 1));
    assert_eq!(sps.width(), 30);
}

#[test]
fn emulation_prevention_bytes_are_stripped() {
    let build = || {
        let mut writer = SpsWriter::default();
        writer.ue(0); // seq_parameter_set_id
        writer.ue(0); // log2_max_frame_num_minus4
        writer.ue(1); // pic_order_cnt_type
        writer.bit(false); // delta_pic_order_always_zero_flag
        // A 25-bit zero run, guaranteeing an escaped 00 00 pair in the packed payload.
        writer.se(1 << 24).se(0);
        writer.ue(0); // num_ref_frames_in_pic_order_cnt_cycle
        writer.ue(1); // max_num_ref_frames
        writer.bit(false); // gaps
        writer.ue(0).ue(0); // 16x16
        writer.bit(true).bit(true); // frame_mbs_only, direct_8x8
        writer.bit(false).bit(false); // no crop, no vui
        writer
    };

    let nal = build().into_nal(BASELINE, 0, 10);
    assert!(
        nal.windows(3).any(|window| window == [0x00, 0x00, 0x03]),
        "fixture must exercise the desanitizer"
    );

    let sps = decode(&nal).unwrap();
    assert_matches!(sps.pic_order_cnt, PicOrderCnt::Type1 { offset_for_non_ref_pic, .. } => {
        assert_eq!(offset_for_non_ref_pic, 1 << 24);
    });
}

#[test]
fn nal_header_validation() {
    assert_matches!(decode(&[0x67, BASELINE, 0]), Err(SpsError::TruncatedNal));
    assert_matches!(decode(&[0xe7, BASELINE, 0, 10, 0xff]), Err(SpsError::ForbiddenZeroBit));
    assert_matches!(decode(&[0x07, BASELINE, 0, 10, 0xff]), Err(SpsError::InvalidRefId));
    assert_matches!(decode(&[0x61, BASELINE, 0, 10, 0xff]), Err(SpsError::InvalidUnitType));
}

#[test]
fn invalid_seq_parameter_set_id() {
    let mut writer = SpsWriter::default();
    writer.ue(32);
    let nal = writer.into_nal(BASELINE, 0, 10);
    assert_matches!(decode(&nal), Err(SpsError::InvalidSeqParameterSetId));
}

#[test]
fn conflicting_bit_depths() {
    let mut writer = SpsWriter::default();
    writer.ue(0); // seq_parameter_set_id
    writer.ue(1); // chroma_format_idc
    writer.ue(0).ue(1); // luma 8, chroma 9
    writer.bit(false).bit(false);
    let nal = writer.into_nal(HIGH, 0, 10);
    assert_matches!(decode(&nal), Err(SpsError::ConflictingBitDepth));
}

#[test]
fn invalid_pic_order_cnt_type() {
    let mut writer = SpsWriter::default();
    writer.ue(0); // seq_parameter_set_id
    writer.ue(0); // log2_max_frame_num_minus4
    writer.ue(3); // pic_order_cnt_type
    let nal = writer.into_nal(BASELINE, 0, 10);
    assert_matches!(decode(&nal), Err(SpsError::InvalidPicOrderCntType));
}

#[test]
fn crop_larger_than_picture() {
    let mut writer = SpsWriter::default();
    writer.ue(0); // seq_parameter_set_id
    writer.ue(0); // log2_max_frame_num_minus4
    writer.ue(2); // pic_order_cnt_type
    writer.ue(1); // max_num_ref_frames
    writer.bit(false); // gaps
    writer.ue(0).ue(0); // 16x16
    writer.bit(true).bit(true); // frame_mbs_only, direct_8x8
    writer.bit(true); // frame_cropping_flag
    writer.ue(5).ue(4).ue(0).ue(0); // 18 > 16 pixels horizontally
    writer.bit(false); // no vui

    let nal = writer.into_nal(BASELINE, 0, 10);
    assert_matches!(decode(&nal), Err(SpsError::InvalidCrop));
}

#[test]
fn truncated_bitstream_reports_out_of_range() {
    let mut writer = SpsWriter::default();
    write_baseline_1080p(&mut writer);
    writer.bit(false);
    let mut nal = writer.into_nal(BASELINE, 0, LEVEL_4_0);
    nal.truncate(6);
    assert_matches!(decode(&nal), Err(SpsError::Read(ReadError::OutOfRange)));
}

#[test]
fn failures_are_reported_to_the_diagnostics_sink() {
    let mut diagnostics = Diagnostics::new();
    let result = parse_sps(&[0x67, BASELINE, 0, 10], &mut diagnostics);
    assert!(result.is_err());
    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(diagnostics.entries()[0].tag, "sps");
}
