//! Error types returned by the SPS decoder.

use mediameta_common::error::{ReportStack, ReportableError};
use mediameta_common::parse::ReadError;

/// Error type returned by the SPS decoder.
///
/// While the API of this error type is currently considered unstable, it is more stably guaranteed to implement
/// [`Display`](std::fmt::Display) + [`Debug`](std::fmt::Debug).
#[allow(missing_docs)]
#[derive(Clone, Debug, thiserror::Error)]
pub enum SpsError {
    /// The NAL unit is shorter than the smallest possible sequence parameter set.
    #[error("truncated NAL unit")]
    TruncatedNal,

    /// The forbidden zero bit of the NAL header is set.
    #[error("forbidden zero bit set")]
    ForbiddenZeroBit,

    /// The NAL reference ID is zero, which is disallowed for a sequence parameter set.
    #[error("invalid NAL reference ID")]
    InvalidRefId,

    /// The NAL unit type is not a sequence parameter set.
    #[error("invalid NAL unit type")]
    InvalidUnitType,

    #[error("invalid sequence parameter set ID")]
    InvalidSeqParameterSetId,

    #[error("invalid chroma format")]
    InvalidChromaFormat,

    #[error("invalid bit depth")]
    InvalidBitDepth,

    /// The luma and chroma bit depths disagree.
    #[error("conflicting luma/chroma bit depths")]
    ConflictingBitDepth,

    #[error("invalid scaling matrix delta scale")]
    InvalidScalingMatrixDeltaScale,

    #[error("invalid maximum frame number")]
    InvalidLog2MaxFrameNum,

    #[error("invalid picture order count type")]
    InvalidPicOrderCntType,

    #[error("invalid maximum picture order count")]
    InvalidLog2MaxPicOrderCntLsb,

    #[error("invalid picture order count cycle length")]
    InvalidPicOrderCntCycleLength,

    #[error("invalid maximum reference frame count")]
    InvalidMaxNumRefFrames,

    #[error("invalid picture size")]
    InvalidPictureSize,

    /// The frame crop offsets exceed the picture size.
    #[error("invalid frame crop")]
    InvalidCrop,

    #[error("invalid aspect ratio indicator")]
    InvalidAspectRatio,

    #[error("invalid chroma sample location")]
    InvalidChromaSampleLocation,

    /// A timing info field which must be non-zero is zero.
    #[error("invalid timing info")]
    InvalidTimingInfo,

    /// The bitstream ended mid-field, or a zero-run exceeded its structural bound.
    #[error(transparent)]
    Read(#[from] ReadError),
}

impl ReportableError for SpsError {
    type Stack = ReportStack;
}
