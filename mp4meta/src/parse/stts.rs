use mediameta_common::parse::ByteReader;
use mediameta_common::{Diagnostics, Result};

use super::error::WhileParsingBox;
use super::{sample_table, BoxHeader, ParseContext, ParseError};

/// The size of one `{sample_count, sample_delta}` record.
pub(crate) const RECORD_SIZE: u64 = 8;

/// Parse a `stts` box, recording the current track's time-to-sample descriptor.
pub(crate) fn parse<T: AsRef<[u8]>>(
    context: &mut ParseContext,
    reader: &mut ByteReader<T>,
    _diagnostics: &mut Diagnostics,
    header: &BoxHeader,
) -> Result<(), ParseError> {
    let box_type = header.box_type();
    let Some(track) = context.current_track_mut() else {
        bail_attach!(ParseError::InvalidBoxLayout, "stts outside trak", WhileParsingBox(box_type));
    };
    sample_table::ensure_unset(&track.time_to_sample, box_type)?;
    track.time_to_sample = sample_table::parse_descriptor(reader, header, RECORD_SIZE)?;
    Ok(())
}
