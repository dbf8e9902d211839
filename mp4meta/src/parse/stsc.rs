use mediameta_common::parse::ByteReader;
use mediameta_common::{Diagnostics, Result};

use super::error::WhileParsingBox;
use super::{sample_table, BoxHeader, ParseContext, ParseError};

/// The size of one `{first_chunk, samples_per_chunk, sample_description_index}` record.
pub(crate) const RECORD_SIZE: u64 = 12;

/// Parse a `stsc` box, recording the current track's sample-to-chunk descriptor.
pub(crate) fn parse<T: AsRef<[u8]>>(
    context: &mut ParseContext,
    reader: &mut ByteReader<T>,
    _diagnostics: &mut Diagnostics,
    header: &BoxHeader,
) -> Result<(), ParseError> {
    let box_type = header.box_type();
    let Some(track) = context.current_track_mut() else {
        bail_attach!(ParseError::InvalidBoxLayout, "stsc outside trak", WhileParsingBox(box_type));
    };
    sample_table::ensure_unset(&track.sample_to_chunk, box_type)?;
    track.sample_to_chunk = sample_table::parse_descriptor(reader, header, RECORD_SIZE)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;
    use bytes::BufMut;

    use crate::parse::box_type::STSC;
    use crate::parse::test_util::parse_leaf;
    use crate::parse::Track;

    use super::*;

    fn write_stsc(out: &mut Vec<u8>, entries: &[(u32, u32, u32)]) {
        out.put_u32(16 + 12 * entries.len() as u32);
        out.put_slice(b"stsc");
        out.put_u32(0); // version and flags
        out.put_u32(entries.len() as u32);
        for &(first_chunk, samples_per_chunk, description_index) in entries {
            out.put_u32(first_chunk);
            out.put_u32(samples_per_chunk);
            out.put_u32(description_index);
        }
    }

    #[test]
    fn records_offset_and_count_without_decoding() {
        let mut data = vec![];
        write_stsc(&mut data, &[(1, 10, 1), (4, 5, 1)]);
        let mut context = ParseContext { tracks: vec![Track::default()], ..Default::default() };
        parse_leaf(&mut context, &data, parse).unwrap();

        let table = context.tracks[0].sample_to_chunk;
        assert_eq!(table.entry_count, 2);
        assert_eq!(table.offset, 16);
    }

    #[test]
    fn truncated_record_run() {
        let mut data = vec![];
        write_stsc(&mut data, &[(1, 10, 1)]);
        data.truncate(data.len() - 4);
        data[3] -= 4; // still consistent with the truncated payload, but misaligned
        let mut context = ParseContext { tracks: vec![Track::default()], ..Default::default() };
        assert_matches!(
            parse_leaf(&mut context, &data, parse),
            Err(ParseError::InvalidBoxSize(STSC))
        );
    }
}
