//! The recursive, depth- and size-bounded walk over a buffered movie box.

use mediameta_common::parse::{ByteReader, FourCC};
use mediameta_common::{Diagnostics, Result};

use super::box_type::{CO64, HDLR, MDHD, MDIA, MINF, MOOV, MVHD, STBL, STCO, STSC, STSD, STTS, TKHD, TRAK};
use super::error::{ByteShortfall, WhileParsingBox};
use super::{hdlr, mdhd, mvhd, stco, stsc, stsd, stts, tkhd, BoxHeader, ParseContext, ParseError};

/// The deepest box nesting accepted before the walk fails outright.
pub const MAX_BOX_DEPTH: u32 = 10;

/// Walk a fully-buffered `moov` box, header included, accumulating one [`ParseContext`].
///
/// The walk aborts on the first parse failure; every failure is also appended to `diagnostics` with a tag naming the
/// box path that raised it.
pub fn parse_movie(buf: &[u8], diagnostics: &mut Diagnostics) -> Result<ParseContext, ParseError> {
    let mut reader = ByteReader::new(buf);
    let header = BoxHeader::read_from(&mut reader)?;
    ensure_attach!(
        header.box_type() == MOOV,
        ParseError::InvalidBoxLayout,
        "buffer does not start with a moov box",
        WhileParsingBox(header.box_type()),
    );
    // The discovery layer resolves extended and to-end-of-file sizes before buffering; either way the box must span
    // the whole buffer.
    if let Some(size) = header.box_size() {
        ensure_attach!(
            size == buf.len() as u64,
            ParseError::InvalidBoxSize(MOOV),
            WhileParsingBox(MOOV),
        );
    }

    let mut context = ParseContext::default();
    walk_children(&mut context, &mut reader, diagnostics, buf.len(), "moov")?;
    Ok(context)
}

/// Recurse over the children of a container box spanning `[reader.position(), parent_end)`.
fn walk_children<T: AsRef<[u8]>>(
    context: &mut ParseContext,
    reader: &mut ByteReader<T>,
    diagnostics: &mut Diagnostics,
    parent_end: usize,
    parent_tag: &str,
) -> Result<(), ParseError> {
    context.depth += 1;
    let result = walk_children_inner(context, reader, diagnostics, parent_end, parent_tag);
    context.depth -= 1;
    result
}

fn walk_children_inner<T: AsRef<[u8]>>(
    context: &mut ParseContext,
    reader: &mut ByteReader<T>,
    diagnostics: &mut Diagnostics,
    parent_end: usize,
    parent_tag: &str,
) -> Result<(), ParseError> {
    if context.depth > MAX_BOX_DEPTH {
        diagnostics.log_error(parent_tag, "box nesting deeper than the recursion bound");
        bail_attach!(ParseError::IllegalBoxDepth);
    }

    while (reader.position() as usize) < parent_end {
        let child_start = reader.position() as usize;
        let header = BoxHeader::read_from(reader)?;
        let child_type = header.box_type();

        let Some(child_size) = header.box_size() else {
            diagnostics.log_error(
                parent_tag,
                format_args!("`{child_type}` box runs to end of file below the top level"),
            );
            bail_attach!(ParseError::InvalidBoxSize(child_type), WhileParsingBox(child_type));
        };
        header.box_data_size()?;

        let child_end = child_start as u64 + child_size;
        if child_end > parent_end as u64 {
            let shortfall = child_end - parent_end as u64;
            diagnostics.log_error(
                format_args!("{parent_tag}/{child_type}"),
                format_args!("box exceeds its parent by {shortfall} bytes"),
            );
            bail_attach!(
                ParseError::InvalidBoxSize(child_type),
                ByteShortfall(shortfall),
                WhileParsingBox(child_type),
            );
        }
        let child_end = child_end as usize;
        log::trace!("{parent_tag}/{child_type} @ 0x{child_start:08x}: {child_size} bytes");

        match child_type {
            TRAK => {
                let tag = format!("{parent_tag}/trak[{}]", context.tracks.len());
                context.tracks.push(Default::default());
                walk_children(context, reader, diagnostics, child_end, &tag)?;
            }
            MDIA | MINF | STBL => {
                let tag = format!("{parent_tag}/{child_type}");
                walk_children(context, reader, diagnostics, child_end, &tag)?;
            }
            other => match leaf_parser::<T>(other) {
                Some(parser) => {
                    if let Err(report) = parser(context, reader, diagnostics, &header) {
                        diagnostics.log_error(
                            format_args!("{parent_tag}/{child_type}"),
                            format_args!("{report:?}"),
                        );
                        return Err(report);
                    }
                }
                // Unknown box types are skipped without interpretation.
                None => log::debug!("{parent_tag}/{child_type}: skipped"),
            },
        }

        // Sibling iteration is re-derived from the declared size, not from where the child parser stopped.
        reader.set_position(child_end)?;
    }

    Ok(())
}

type LeafParser<T> = fn(
    &mut ParseContext,
    &mut ByteReader<T>,
    &mut Diagnostics,
    &BoxHeader,
) -> Result<(), ParseError>;

fn leaf_parser<T: AsRef<[u8]>>(box_type: FourCC) -> Option<LeafParser<T>> {
    match box_type {
        MVHD => Some(mvhd::parse),
        TKHD => Some(tkhd::parse),
        MDHD => Some(mdhd::parse),
        HDLR => Some(hdlr::parse),
        STSD => Some(stsd::parse),
        STTS => Some(stts::parse),
        STSC => Some(stsc::parse),
        STCO | CO64 => Some(stco::parse),
        _ => None,
    }
}
