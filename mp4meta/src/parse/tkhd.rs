use fixed::types::U16F16;
use mediameta_common::parse::ByteReader;
use mediameta_common::{Diagnostics, Result};

use super::box_type::TKHD;
use super::error::WhileParsingBox;
use super::{BoxHeader, ParseContext, ParseError, TrackFlags};

/// The exact track header box size per version, header bytes included.
const SIZE_V0: u64 = 92;
const SIZE_V1: u64 = 104;

/// Parse a `tkhd` box, populating the current track's identity, flags and presentation geometry.
pub(crate) fn parse<T: AsRef<[u8]>>(
    context: &mut ParseContext,
    reader: &mut ByteReader<T>,
    _diagnostics: &mut Diagnostics,
    header: &BoxHeader,
) -> Result<(), ParseError> {
    let version = reader.u8()?;
    let flags = reader.u24()?;

    let expected_size = match version {
        0 => SIZE_V0,
        1 => SIZE_V1,
        _ => bail_attach!(ParseError::InvalidBoxVersion(TKHD), WhileParsingBox(TKHD)),
    };
    ensure_attach!(
        header.box_size() == Some(expected_size),
        ParseError::InvalidBoxSize(TKHD),
        WhileParsingBox(TKHD),
    );

    let Some(track) = context.current_track_mut() else {
        bail_attach!(ParseError::InvalidBoxLayout, "tkhd outside trak", WhileParsingBox(TKHD));
    };
    ensure_attach!(track.id == 0, ParseError::DuplicateBox(TKHD), WhileParsingBox(TKHD));

    track.flags = TrackFlags::from_bits_truncate(flags);
    match version {
        0 => {
            let _creation_time = reader.u32()?;
            let _modification_time = reader.u32()?;
            track.id = reader.u32()?;
            reader.seek(4); // reserved
            track.duration = reader.u32()?.into();
        }
        _ => {
            let _creation_time = reader.u64()?;
            let _modification_time = reader.u64()?;
            track.id = reader.u32()?;
            reader.seek(4); // reserved
            track.duration = reader.u64()?;
        }
    }

    reader.seek(8); // reserved
    track.layer = reader.i16()?;
    track.alternate_group = reader.i16()?;
    let _volume = reader.i16()?;
    reader.seek(2 + 36); // reserved and the transform matrix
    track.width = U16F16::from_bits(reader.u32()?);
    track.height = U16F16::from_bits(reader.u32()?);

    Ok(())
}
