use mediameta_common::parse::ByteReader;
use mediameta_common::{Diagnostics, Result};

use super::box_type::STSD;
use super::error::{WhileParsingBox, WhileParsingField};
use super::{audio, visual, BoxHeader, HandlerType, ParseContext, ParseError, SampleDescription};

/// The largest sample-description entry count accepted.
const MAX_ENTRY_COUNT: u32 = 256;

/// Parse a `stsd` box, dispatching each entry to the visual or audio entry parser per the track handler.
///
/// Entries for other handlers are recorded by coding name only, and any trailing codec extension bytes of a parsed
/// entry are preserved as an opaque range rather than interpreted.
pub(crate) fn parse<T: AsRef<[u8]>>(
    context: &mut ParseContext,
    reader: &mut ByteReader<T>,
    diagnostics: &mut Diagnostics,
    header: &BoxHeader,
) -> Result<(), ParseError> {
    let box_start = reader.position() as usize - header.encoded_len() as usize;
    let Some(box_size) = header.box_size() else {
        bail_attach!(
            ParseError::InvalidBoxSize(STSD),
            "box runs to end of file",
            WhileParsingBox(STSD),
        );
    };
    let box_end = box_start + box_size as usize;

    let version = reader.u8()?;
    let _flags = reader.u24()?;
    ensure_attach!(version == 0, ParseError::InvalidBoxVersion(STSD), WhileParsingBox(STSD));

    let entry_count = reader.u32()?;
    ensure_attach!(
        (1..=MAX_ENTRY_COUNT).contains(&entry_count),
        ParseError::InvalidEntryCount(STSD),
        WhileParsingField(STSD, "entry_count"),
    );

    let Some(track) = context.current_track_mut() else {
        bail_attach!(ParseError::InvalidBoxLayout, "stsd outside trak", WhileParsingBox(STSD));
    };
    ensure_attach!(
        track.sample_descriptions.is_empty(),
        ParseError::DuplicateBox(STSD),
        WhileParsingBox(STSD),
    );

    let handler = track.handler;
    for _ in 0..entry_count {
        let entry_start = reader.position() as usize;
        let entry_header = BoxHeader::read_from(reader)?;
        let Some(entry_size) = entry_header.box_size() else {
            bail_attach!(
                ParseError::InvalidBoxSize(entry_header.box_type()),
                "sample entry runs to end of file",
                WhileParsingBox(STSD),
            );
        };
        entry_header.box_data_size()?;
        let entry_end = entry_start + entry_size as usize;
        ensure_attach!(
            entry_end <= box_end,
            ParseError::InvalidBoxSize(entry_header.box_type()),
            "sample entry exceeds its stsd box",
            WhileParsingBox(STSD),
        );

        let description = match handler {
            Some(HandlerType::Video) => {
                SampleDescription::Video(visual::parse_entry(reader, diagnostics, &entry_header, entry_end)?)
            }
            Some(HandlerType::Audio) => {
                SampleDescription::Audio(audio::parse_entry(reader, diagnostics, &entry_header, entry_end)?)
            }
            _ => {
                diagnostics.log_warning(
                    "stsd",
                    format_args!(
                        "skipping `{}` sample entry for unhandled handler",
                        entry_header.box_type()
                    ),
                );
                SampleDescription::Other(entry_header.box_type())
            }
        };
        track.sample_descriptions.push(description);

        reader.set_position(entry_end)?;
    }

    Ok(())
}
