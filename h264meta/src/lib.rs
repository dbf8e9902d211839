#![warn(missing_docs)]

//! `h264meta` decodes metadata from H.264 bitstream parameter sets without decoding any video.
//!
//! The only entry point is [`parse_sps`], which decodes a single sequence parameter set NAL unit into an [`Sps`]
//! record: profile identity, chroma format and bit depth, picture geometry and crop, reference behavior, and the
//! display hints (aspect ratio, colour description, timing) carried in the usability information.
//!
//! The caller supplies the NAL unit starting at its header byte, with any Annex-B start code stripped but
//! emulation-prevention bytes still present — exactly the form in which an `avcC` box or an RTP packetizer hands NAL
//! units around. Desanitization happens internally, on a copy.
//!
//! ```
//! use h264meta::parse_sps;
//! use mediameta_common::Diagnostics;
//!
//! // A 16x16 Baseline sequence parameter set.
//! let nal = [0x67, 0x42, 0x00, 0x0a, 0xf4, 0xf0];
//!
//! let mut diagnostics = Diagnostics::new();
//! let sps = parse_sps(&nal, &mut diagnostics)?;
//! assert_eq!(sps.width(), 16);
//! assert_eq!(sps.height(), 16);
//! # Ok::<(), mediameta_common::Report<h264meta::SpsError>>(())
//! ```

#[macro_use]
extern crate mediameta_common;

mod error;
mod nal;
mod profile;
mod scaling;
mod sps;

pub use error::SpsError;
pub use nal::{strip_emulation_prevention, NalHeader, NAL_UNIT_TYPE_SPS};
pub use profile::{ConstraintFlags, Profile};
pub use scaling::{
    ScalingMatrices, DEFAULT_4X4_INTER, DEFAULT_4X4_INTRA, DEFAULT_8X8_INTER, DEFAULT_8X8_INTRA,
};
pub use sps::{parse_sps, ChromaFormat, CropOffsets, FrameRate, PicOrderCnt, SampleAspectRatio, Sps};
