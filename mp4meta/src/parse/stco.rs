use mediameta_common::parse::ByteReader;
use mediameta_common::{Diagnostics, Result};

use super::box_type::STCO;
use super::error::WhileParsingBox;
use super::{sample_table, BoxHeader, ChunkOffsetWidth, ParseContext, ParseError};

/// Parse a `stco` or `co64` box, recording the current track's chunk-offset descriptor and its record width.
pub(crate) fn parse<T: AsRef<[u8]>>(
    context: &mut ParseContext,
    reader: &mut ByteReader<T>,
    _diagnostics: &mut Diagnostics,
    header: &BoxHeader,
) -> Result<(), ParseError> {
    let box_type = header.box_type();
    let width = if box_type == STCO {
        ChunkOffsetWidth::U32
    } else {
        ChunkOffsetWidth::U64
    };

    let Some(track) = context.current_track_mut() else {
        bail_attach!(
            ParseError::InvalidBoxLayout,
            "chunk offsets outside trak",
            WhileParsingBox(box_type),
        );
    };
    sample_table::ensure_unset(&track.chunk_offsets, box_type)?;

    track.chunk_offsets = sample_table::parse_descriptor(reader, header, record_size(width))?;
    track.chunk_offset_width = width;
    Ok(())
}

fn record_size(width: ChunkOffsetWidth) -> u64 {
    match width {
        ChunkOffsetWidth::U32 => 4,
        ChunkOffsetWidth::U64 => 8,
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;
    use bytes::BufMut;

    use crate::parse::box_type::CO64;
    use crate::parse::test_util::parse_leaf;
    use crate::parse::Track;

    use super::*;

    fn write_stco(out: &mut Vec<u8>, offsets: &[u32]) {
        out.put_u32(16 + 4 * offsets.len() as u32);
        out.put_slice(b"stco");
        out.put_u32(0); // version and flags
        out.put_u32(offsets.len() as u32);
        for &offset in offsets {
            out.put_u32(offset);
        }
    }

    fn write_co64(out: &mut Vec<u8>, offsets: &[u64]) {
        out.put_u32(16 + 8 * offsets.len() as u32);
        out.put_slice(b"co64");
        out.put_u32(0); // version and flags
        out.put_u32(offsets.len() as u32);
        for &offset in offsets {
            out.put_u64(offset);
        }
    }

    fn context_with_track() -> ParseContext {
        ParseContext { tracks: vec![Track::default()], ..Default::default() }
    }

    #[test]
    fn stco() {
        let mut data = vec![];
        write_stco(&mut data, &[48, 1048, 2048]);
        let mut context = context_with_track();
        parse_leaf(&mut context, &data, parse).unwrap();

        let track = &context.tracks[0];
        assert_eq!(track.chunk_offsets.entry_count, 3);
        assert_eq!(track.chunk_offsets.offset, 16);
        assert_eq!(track.chunk_offset_width, ChunkOffsetWidth::U32);
    }

    #[test]
    fn co64() {
        let mut data = vec![];
        write_co64(&mut data, &[1 << 33]);
        let mut context = context_with_track();
        parse_leaf(&mut context, &data, parse).unwrap();

        let track = &context.tracks[0];
        assert_eq!(track.chunk_offsets.entry_count, 1);
        assert_eq!(track.chunk_offset_width, ChunkOffsetWidth::U64);
    }

    #[test]
    fn stco_then_co64_is_a_duplicate() {
        let mut stco_data = vec![];
        write_stco(&mut stco_data, &[48]);
        let mut co64_data = vec![];
        write_co64(&mut co64_data, &[48]);

        let mut context = context_with_track();
        parse_leaf(&mut context, &stco_data, parse).unwrap();
        assert_matches!(
            parse_leaf(&mut context, &co64_data, parse),
            Err(ParseError::DuplicateBox(CO64))
        );
    }

    #[test]
    fn entry_count_mismatch() {
        let mut data = vec![];
        write_stco(&mut data, &[48, 1048]);
        data[15] = 3; // declared count disagrees with the size-derived count
        let mut context = context_with_track();
        assert_matches!(
            parse_leaf(&mut context, &data, parse),
            Err(ParseError::InvalidEntryCount(STCO))
        );
    }
}
