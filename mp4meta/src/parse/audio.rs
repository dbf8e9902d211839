use fixed::types::U16F16;
use mediameta_common::parse::ByteReader;
use mediameta_common::{Diagnostics, Result};

use super::error::WhileParsingBox;
use super::{AudioDescription, BoxHeader, ByteRange, ParseError};

/// The fixed audio sample entry layout, entry box header included.
const FIXED_SIZE: u64 = 36;

/// Parse one audio sample entry, with the reader positioned just past the entry's box header.
///
/// Trailing bytes of the entry (typically an `esds` elementary stream descriptor) are preserved as an opaque byte
/// range; [`esds`](super::esds) decodes the AudioSpecificConfig out of that range on demand.
pub(crate) fn parse_entry<T: AsRef<[u8]>>(
    reader: &mut ByteReader<T>,
    _diagnostics: &mut Diagnostics,
    header: &BoxHeader,
    entry_end: usize,
) -> Result<AudioDescription, ParseError> {
    let codec = header.box_type();
    ensure_attach!(
        header.box_size() >= Some(FIXED_SIZE),
        ParseError::InvalidBoxSize(codec),
        WhileParsingBox(codec),
    );

    reader.seek(6); // reserved
    let data_reference_index = reader.u16()?;
    reader.seek(8); // reserved
    let channel_count = reader.u16()?;
    let sample_size = reader.u16()?;
    reader.seek(2 + 2); // pre_defined and reserved
    let sample_rate = U16F16::from_bits(reader.u32()?);

    let extensions = ByteRange { start: reader.position() as usize, end: entry_end };

    Ok(AudioDescription {
        codec,
        data_reference_index,
        channel_count,
        sample_size,
        sample_rate,
        extensions,
    })
}
