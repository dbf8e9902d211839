use mediameta_common::parse::{ByteReader, FourCC};
use mediameta_common::{Diagnostics, Result};

use super::box_type::AVCC;
use super::error::WhileParsingBox;
use super::{BoxHeader, ByteRange, ParseError, VideoDescription};

/// The fixed visual sample entry layout, entry box header included.
const FIXED_SIZE: u64 = 86;

/// Parse one visual sample entry, with the reader positioned just past the entry's box header.
///
/// Trailing bytes of the entry are codec-specific extension boxes (AVC configuration, color info, pixel aspect
/// ratio, ...); they are preserved as an opaque byte range, with only their box sizes validated to locate an `avcC`
/// span when one is present.
pub(crate) fn parse_entry<T: AsRef<[u8]>>(
    reader: &mut ByteReader<T>,
    diagnostics: &mut Diagnostics,
    header: &BoxHeader,
    entry_end: usize,
) -> Result<VideoDescription, ParseError> {
    let codec = header.box_type();
    ensure_attach!(
        header.box_size() >= Some(FIXED_SIZE),
        ParseError::InvalidBoxSize(codec),
        WhileParsingBox(codec),
    );

    reader.seek(6); // reserved
    let data_reference_index = reader.u16()?;
    reader.seek(2 + 2 + 12); // pre-defined and reserved
    let width = reader.u16()?;
    let height = reader.u16()?;
    // Resolution, reserved, frame count and compressor name carry nothing we surface.
    reader.seek(4 + 4 + 4 + 2 + 32);
    let depth = reader.u16()?;
    reader.seek(2); // pre_defined

    let extensions = ByteRange { start: reader.position() as usize, end: entry_end };
    let avc_configuration = scan_extensions(reader, diagnostics, codec, extensions)?;

    Ok(VideoDescription {
        codec,
        data_reference_index,
        width,
        height,
        depth,
        extensions,
        avc_configuration,
    })
}

/// Size-validate the extension child boxes, returning the `avcC` payload range when one is found.
///
/// A malformed extension run is reported as a warning and left opaque; the fixed entry fields already parsed stand.
fn scan_extensions<T: AsRef<[u8]>>(
    reader: &mut ByteReader<T>,
    diagnostics: &mut Diagnostics,
    codec: FourCC,
    extensions: ByteRange,
) -> Result<Option<ByteRange>, ParseError> {
    let mut avc_configuration = None;
    let mut child_start = extensions.start;

    while child_start < extensions.end {
        if extensions.end - child_start < 8 {
            diagnostics.log_warning(codec, "trailing bytes too short for an extension box header");
            break;
        }
        let child = BoxHeader::read_from(reader)?;
        let Some(child_size) = child.box_size().filter(|&size| size >= child.encoded_len()) else {
            diagnostics.log_warning(codec, format_args!("malformed `{}` extension box size", child.box_type()));
            break;
        };
        let child_end = child_start + child_size as usize;
        if child_end > extensions.end {
            diagnostics.log_warning(codec, format_args!("`{}` extension box exceeds its entry", child.box_type()));
            break;
        }

        if child.box_type() == AVCC {
            let payload_start = child_start + child.encoded_len() as usize;
            avc_configuration = Some(ByteRange { start: payload_start, end: child_end });
            log::debug!("avcC @ 0x{child_start:08x}: {child_size} bytes");
        }

        reader.set_position(child_end)?;
        child_start = child_end;
    }

    Ok(avc_configuration)
}
