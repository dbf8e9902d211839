use mediameta_common::parse::ByteReader;
use mediameta_common::{Diagnostics, Result};

use super::box_type::HDLR;
use super::error::WhileParsingBox;
use super::{BoxHeader, HandlerType, ParseContext, ParseError};

/// The smallest valid handler reference: full box header, pre-defined, handler type, reserved block, and a name of
/// at least one byte.
const MIN_SIZE: u64 = 33;

/// Parse a `hdlr` box, classifying the current track's media handler.
pub(crate) fn parse<T: AsRef<[u8]>>(
    context: &mut ParseContext,
    reader: &mut ByteReader<T>,
    diagnostics: &mut Diagnostics,
    header: &BoxHeader,
) -> Result<(), ParseError> {
    let version = reader.u8()?;
    let _flags = reader.u24()?;
    ensure_attach!(version == 0, ParseError::InvalidBoxVersion(HDLR), WhileParsingBox(HDLR));
    ensure_attach!(
        header.box_size() >= Some(MIN_SIZE),
        ParseError::InvalidBoxSize(HDLR),
        WhileParsingBox(HDLR),
    );

    let Some(track) = context.current_track_mut() else {
        bail_attach!(ParseError::InvalidBoxLayout, "hdlr outside trak", WhileParsingBox(HDLR));
    };
    ensure_attach!(
        track.handler.is_none(),
        ParseError::DuplicateBox(HDLR),
        WhileParsingBox(HDLR),
    );

    let _pre_defined = reader.u32()?;
    let handler = HandlerType::from_fourcc(reader.four_cc()?);
    if let HandlerType::Other(fourcc) = handler {
        diagnostics.log_warning("hdlr", format_args!("unrecognized handler type `{fourcc}`"));
    }
    track.handler = Some(handler);

    Ok(())
}
