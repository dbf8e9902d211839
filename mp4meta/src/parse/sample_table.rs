//! The shared layout of the sample-table boxes: a full box header, a declared entry count, and a run of fixed-width
//! records which is recorded as a deferred-decode descriptor rather than decoded in place.

use mediameta_common::parse::{ByteReader, FourCC};
use mediameta_common::Result;

use super::error::{WhereEq, WhileParsingBox};
use super::{BoxHeader, ParseError, SampleArray};

/// The bytes of full-box header and entry-count fields preceding the records.
const TABLE_HEADER_SIZE: u64 = 8;

/// Validate a sample-table box and record where its entries live.
///
/// The declared entry count must agree exactly with the count derived from the box size; the records themselves are
/// skipped, not decoded.
pub(crate) fn parse_descriptor<T: AsRef<[u8]>>(
    reader: &mut ByteReader<T>,
    header: &BoxHeader,
    record_size: u64,
) -> Result<SampleArray, ParseError> {
    let box_type = header.box_type();

    let version = reader.u8()?;
    let _flags = reader.u24()?;
    ensure_attach!(
        version == 0,
        ParseError::InvalidBoxVersion(box_type),
        WhileParsingBox(box_type),
    );

    let declared_count = reader.u32()?;

    let Some(data_size) = header.box_data_size()? else {
        bail_attach!(
            ParseError::InvalidBoxSize(box_type),
            "box runs to end of file",
            WhileParsingBox(box_type),
        );
    };
    let Some(records_len) = data_size.checked_sub(TABLE_HEADER_SIZE) else {
        bail_attach!(ParseError::InvalidBoxSize(box_type), WhileParsingBox(box_type));
    };
    ensure_attach!(
        records_len % record_size == 0,
        ParseError::InvalidBoxSize(box_type),
        WhileParsingBox(box_type),
    );

    let derived_count = records_len / record_size;
    ensure_attach!(
        u64::from(declared_count) == derived_count,
        ParseError::InvalidEntryCount(box_type),
        WhereEq("derived entry count", derived_count),
        WhileParsingBox(box_type),
    );

    let offset = reader.position() as usize;
    reader.seek(records_len as isize);

    Ok(SampleArray { offset, entry_count: declared_count })
}

/// Return an error if the table has already been populated.
pub(crate) fn ensure_unset(table: &SampleArray, box_type: FourCC) -> Result<(), ParseError> {
    ensure_attach!(
        table.entry_count == 0,
        ParseError::DuplicateBox(box_type),
        WhileParsingBox(box_type),
    );
    Ok(())
}
