use fixed::types::{I16F16, I8F8};
use mediameta_common::parse::ByteReader;
use mediameta_common::{Diagnostics, Result};

use super::box_type::MVHD;
use super::error::WhileParsingBox;
use super::{BoxHeader, ParseContext, ParseError};

/// The exact movie header box size per version, header bytes included.
const SIZE_V0: u64 = 108;
const SIZE_V1: u64 = 120;

/// Parse a `mvhd` box, populating the movie-level record.
pub(crate) fn parse<T: AsRef<[u8]>>(
    context: &mut ParseContext,
    reader: &mut ByteReader<T>,
    _diagnostics: &mut Diagnostics,
    header: &BoxHeader,
) -> Result<(), ParseError> {
    let version = reader.u8()?;
    let _flags = reader.u24()?;

    let expected_size = match version {
        0 => SIZE_V0,
        1 => SIZE_V1,
        _ => bail_attach!(ParseError::InvalidBoxVersion(MVHD), WhileParsingBox(MVHD)),
    };
    ensure_attach!(
        header.box_size() == Some(expected_size),
        ParseError::InvalidBoxSize(MVHD),
        WhileParsingBox(MVHD),
    );

    ensure_attach!(
        context.movie.timescale == 0,
        ParseError::DuplicateBox(MVHD),
        WhileParsingBox(MVHD),
    );

    let movie = &mut context.movie;
    match version {
        0 => {
            let _creation_time = reader.u32()?;
            let _modification_time = reader.u32()?;
            movie.timescale = reader.u32()?;
            movie.duration = reader.u32()?.into();
        }
        _ => {
            let _creation_time = reader.u64()?;
            let _modification_time = reader.u64()?;
            movie.timescale = reader.u32()?;
            movie.duration = reader.u64()?;
        }
    }

    movie.rate = I16F16::from_bits(reader.i32()?);
    movie.volume = I8F8::from_bits(reader.i16()?);
    // Reserved bytes, the transform matrix, and the pre-defined block carry nothing we surface.
    reader.seek(2 + 8 + 36 + 24);
    movie.next_track_id = reader.u32()?;

    Ok(())
}
