use mediameta_common::parse::ByteReader;
use mediameta_common::{Diagnostics, Result};

use super::box_type::MDHD;
use super::error::WhileParsingBox;
use super::{BoxHeader, Language, ParseContext, ParseError};

/// The exact media header box size per version, header bytes included.
const SIZE_V0: u64 = 32;
const SIZE_V1: u64 = 44;

/// Parse a `mdhd` box, populating the current track's media timescale, duration and language.
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
        _ => bail_attach!(ParseError::InvalidBoxVersion(MDHD), WhileParsingBox(MDHD)),
    };
    ensure_attach!(
        header.box_size() == Some(expected_size),
        ParseError::InvalidBoxSize(MDHD),
        WhileParsingBox(MDHD),
    );

    let Some(track) = context.current_track_mut() else {
        bail_attach!(ParseError::InvalidBoxLayout, "mdhd outside trak", WhileParsingBox(MDHD));
    };
    ensure_attach!(
        track.media_timescale == 0,
        ParseError::DuplicateBox(MDHD),
        WhileParsingBox(MDHD),
    );

    match version {
        0 => {
            let _creation_time = reader.u32()?;
            let _modification_time = reader.u32()?;
            track.media_timescale = reader.u32()?;
            track.media_duration = reader.u32()?.into();
        }
        _ => {
            let _creation_time = reader.u64()?;
            let _modification_time = reader.u64()?;
            track.media_timescale = reader.u32()?;
            track.media_duration = reader.u64()?;
        }
    }

    // 15 bits of packed language; the padding bit is ignored.
    track.language = Language::from_packed(reader.u16()? & 0x7fff);
    let _pre_defined = reader.u16()?;

    Ok(())
}
