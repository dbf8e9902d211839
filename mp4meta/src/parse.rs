//! Parsing of the individual MP4 box types.

mod audio;
mod avcc;
mod context;
pub mod error;
mod esds;
mod hdlr;
mod header;
mod mdhd;
mod mvhd;
mod sample_table;
mod stco;
mod stsc;
mod stsd;
mod stts;
mod tkhd;
mod visual;
mod walker;

pub use avcc::AvcConfiguration;
pub use context::{
    AudioDescription, ByteRange, ChunkOffsetWidth, HandlerType, Language, Movie, ParseContext, SampleArray,
    SampleDescription, Track, TrackFlags, VideoDescription,
};
pub use error::ParseError;
pub use esds::AudioSpecificConfig;
pub use header::{box_type, BoxHeader, BoxSize};
pub use walker::{parse_movie, MAX_BOX_DEPTH};

pub use mediameta_common::parse::FourCC;

#[cfg(test)]
pub(crate) mod test_util {
    use mediameta_common::parse::ByteReader;
    use mediameta_common::Diagnostics;

    use super::{BoxHeader, ParseContext, ParseError};

    /// Run one leaf parser over a standalone box buffer, unwrapping the report for terse assertions.
    pub(crate) fn parse_leaf<'a, F>(
        context: &mut ParseContext,
        data: &'a [u8],
        parser: F,
    ) -> Result<(), ParseError>
    where
        F: FnOnce(
            &mut ParseContext,
            &mut ByteReader<&'a [u8]>,
            &mut Diagnostics,
            &BoxHeader,
        ) -> mediameta_common::Result<(), ParseError>,
    {
        let mut reader = ByteReader::new(data);
        let header = BoxHeader::read_from(&mut reader).map_err(|report| report.into_inner())?;
        let mut diagnostics = Diagnostics::new();
        parser(context, &mut reader, &mut diagnostics, &header).map_err(|report| report.into_inner())
    }
}
