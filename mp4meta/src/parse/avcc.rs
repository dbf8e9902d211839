//! AVC decoder configuration parsing.
//!
//! The configuration is parsed only down to the raw SPS/PPS NAL byte ranges; deriving codec parameters from the
//! embedded SPS is the job of a standalone SPS decoder, which stays the single source of truth.

use mediameta_common::parse::ByteReader;
use mediameta_common::Result;

use super::box_type::AVCC;
use super::error::{WhileParsingBox, WhileParsingField};
use super::{ByteRange, ParseError};

/// An AVC decoder configuration record, parsed down to its raw parameter-set byte ranges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvcConfiguration {
    /// The configuration version; always 1.
    pub configuration_version: u8,

    /// The profile indication byte.
    pub profile_idc: u8,

    /// The profile compatibility (constraint flag) byte.
    pub profile_compatibility: u8,

    /// The level indication byte.
    pub level_idc: u8,

    /// The size in bytes of the NAL length prefixes in the stream (1, 2 or 4).
    pub nal_length_size: u8,

    /// The raw SPS NAL units, as ranges of the parsed buffer, emulation-prevention bytes included.
    pub sps: Vec<ByteRange>,

    /// The raw PPS NAL units, as ranges of the parsed buffer, emulation-prevention bytes included.
    pub pps: Vec<ByteRange>,
}

impl AvcConfiguration {
    /// Parse the `avcC` payload at `range` within `buf`.
    ///
    /// `range` is the payload span recorded on a video sample description; the returned NAL ranges index into the
    /// same buffer.
    pub fn parse(buf: &[u8], range: ByteRange) -> Result<Self, ParseError> {
        let mut reader = ByteReader::new(buf);
        reader.set_position(range.start)?;

        let configuration_version = reader.u8()?;
        ensure_attach!(
            configuration_version == 1,
            ParseError::InvalidBoxVersion(AVCC),
            WhileParsingField(AVCC, "configuration_version"),
        );
        let profile_idc = reader.u8()?;
        let profile_compatibility = reader.u8()?;
        let level_idc = reader.u8()?;
        let nal_length_size = (reader.u8()? & 0x03) + 1;

        let sps_count = reader.u8()? & 0x1f;
        let sps = read_nal_ranges(&mut reader, sps_count.into(), range)?;
        let pps_count = reader.u8()?;
        let pps = read_nal_ranges(&mut reader, pps_count.into(), range)?;

        Ok(Self {
            configuration_version,
            profile_idc,
            profile_compatibility,
            level_idc,
            nal_length_size,
            sps,
            pps,
        })
    }
}

fn read_nal_ranges<T: AsRef<[u8]>>(
    reader: &mut ByteReader<T>,
    count: usize,
    range: ByteRange,
) -> Result<Vec<ByteRange>, ParseError> {
    let mut ranges = Vec::with_capacity(count);
    for _ in 0..count {
        let len = reader.u16()? as usize;
        let start = reader.position() as usize;
        ensure_attach!(
            start + len <= range.end,
            ParseError::InvalidBoxSize(AVCC),
            "parameter set overruns the configuration",
            WhileParsingBox(AVCC),
        );
        reader.seek(len as isize);
        ranges.push(ByteRange { start, end: start + len });
    }
    Ok(ranges)
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;
    use bytes::BufMut;

    use super::*;

    pub(crate) fn write_avcc_payload(out: &mut Vec<u8>, sps: &[&[u8]], pps: &[&[u8]]) {
        out.put_u8(1); // configuration_version
        out.put_u8(100);
        out.put_u8(0);
        out.put_u8(31);
        out.put_u8(0xfc | 3); // 4-byte NAL length prefixes
        out.put_u8(0xe0 | sps.len() as u8);
        for nal in sps {
            out.put_u16(nal.len() as u16);
            out.put_slice(nal);
        }
        out.put_u8(pps.len() as u8);
        for nal in pps {
            out.put_u16(nal.len() as u16);
            out.put_slice(nal);
        }
    }

    #[test]
    fn nal_ranges() {
        let sps = b"\x67\x64\x00\x1f\xaa";
        let pps = b"\x68\xee\x3c\x80";
        let mut data = vec![];
        write_avcc_payload(&mut data, &[sps], &[pps]);

        let range = ByteRange { start: 0, end: data.len() };
        let config = AvcConfiguration::parse(&data, range).unwrap();
        assert_eq!(config.configuration_version, 1);
        assert_eq!(config.profile_idc, 100);
        assert_eq!(config.nal_length_size, 4);
        assert_eq!(config.sps.len(), 1);
        assert_eq!(config.sps[0].slice(&data), sps);
        assert_eq!(config.pps[0].slice(&data), pps);
    }

    #[test]
    fn parameter_set_overrun() {
        let mut data = vec![];
        write_avcc_payload(&mut data, &[b"\x67\x64"], &[]);
        data.truncate(data.len() - 2);
        // Keep a plausible end bound, shorter than the declared parameter set.
        let range = ByteRange { start: 0, end: data.len() };
        assert_matches!(
            AvcConfiguration::parse(&data, range).map_err(|report| report.into_inner()),
            Err(ParseError::InvalidBoxSize(AVCC))
        );
    }
}
