//! Elementary stream descriptor parsing, down to the AAC AudioSpecificConfig.

use mediameta_common::parse::{BitReader, ByteReader};
use mediameta_common::Result;

use super::box_type::ESDS;
use super::error::{WhileParsingBox, WhileParsingField};
use super::{BoxHeader, ByteRange, ParseError};

const ES_DESCRIPTOR_TAG: u8 = 0x03;
const DECODER_CONFIG_TAG: u8 = 0x04;
const DECODER_SPECIFIC_TAG: u8 = 0x05;

/// Sampling frequencies by AudioSpecificConfig frequency index; index 15 signals an explicit 24-bit frequency.
const SAMPLE_FREQUENCIES: [u32; 13] = [
    96_000, 88_200, 64_000, 48_000, 44_100, 32_000, 24_000, 22_050, 16_000, 12_000, 11_025, 8_000, 7_350,
];

/// The decoded AAC AudioSpecificConfig of an elementary stream descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioSpecificConfig {
    /// The audio object type (2 is AAC-LC).
    pub object_type: u8,

    /// The sampling frequency, in hertz.
    pub frequency: u32,

    /// The channel configuration code point.
    pub channel_config: u8,
}

impl AudioSpecificConfig {
    /// Decode the AudioSpecificConfig out of the `esds` box found in an audio sample entry's extension range.
    ///
    /// `extensions` is the opaque extension span recorded on the audio sample description; the `esds` box is located
    /// inside it, its descriptor chain walked down to the decoder specific info, and the config decoded bit-wise
    /// from there.
    pub fn parse(buf: &[u8], extensions: ByteRange) -> Result<Self, ParseError> {
        let mut reader = ByteReader::new(buf);
        reader.set_position(extensions.start)?;

        // Locate the esds box among the entry's extension boxes.
        let esds_end = loop {
            let child_start = reader.position() as usize;
            ensure_attach!(
                extensions.end - child_start >= 8,
                ParseError::MissingRequiredBox(ESDS),
                "no esds box among the sample entry extensions",
            );
            let child = BoxHeader::read_from(&mut reader)?;
            let Some(child_size) = child.box_size().filter(|&size| size >= child.encoded_len()) else {
                bail_attach!(ParseError::InvalidBoxSize(child.box_type()), WhileParsingBox(ESDS));
            };
            let child_end = child_start + child_size as usize;
            ensure_attach!(
                child_end <= extensions.end,
                ParseError::InvalidBoxSize(child.box_type()),
                WhileParsingBox(ESDS),
            );
            if child.box_type() == ESDS {
                break child_end;
            }
            reader.set_position(child_end)?;
        };

        let _version_and_flags = reader.u32()?;

        expect_descriptor(&mut reader, ES_DESCRIPTOR_TAG, esds_end)?;
        let _es_id = reader.u16()?;
        let stream_flags = reader.u8()?;
        if stream_flags & 0x80 != 0 {
            let _depends_on_es_id = reader.u16()?;
        }
        if stream_flags & 0x40 != 0 {
            let url_length = reader.u8()?;
            reader.seek(url_length as isize);
        }
        if stream_flags & 0x20 != 0 {
            let _ocr_es_id = reader.u16()?;
        }

        expect_descriptor(&mut reader, DECODER_CONFIG_TAG, esds_end)?;
        let _object_type_indication = reader.u8()?;
        let _stream_type = reader.u8()?;
        let _buffer_size = reader.u24()?;
        let _max_bitrate = reader.u32()?;
        let _avg_bitrate = reader.u32()?;

        let config_len = expect_descriptor(&mut reader, DECODER_SPECIFIC_TAG, esds_end)?;
        let config_bytes = reader.bytes(config_len)?;
        Self::decode(config_bytes)
    }

    /// Decode a raw AudioSpecificConfig payload.
    pub fn decode(config: &[u8]) -> Result<Self, ParseError> {
        let mut bits = BitReader::new(config);

        let mut object_type = bits.bits(5)? as u8;
        if object_type == 31 {
            object_type = bits.bits(6)? as u8 + 32;
        }

        let frequency_index = bits.bits(4)?;
        let frequency = if frequency_index == 15 {
            bits.bits(24)?
        } else {
            *SAMPLE_FREQUENCIES.get(frequency_index as usize).ok_or_else(|| {
                report_attach!(
                    ParseError::InvalidInput,
                    "reserved sampling frequency index",
                    WhileParsingField(ESDS, "sampling_frequency_index"),
                )
            })?
        };

        let channel_config = bits.bits(4)? as u8;

        Ok(Self { object_type, frequency, channel_config })
    }
}

/// Read a descriptor tag and its variable-length size, requiring `tag` and bounding the payload by `end`.
fn expect_descriptor<T: AsRef<[u8]>>(
    reader: &mut ByteReader<T>,
    tag: u8,
    end: usize,
) -> Result<usize, ParseError> {
    let actual = reader.u8()?;
    ensure_attach!(
        actual == tag,
        ParseError::InvalidInput,
        "unexpected descriptor tag",
        WhileParsingBox(ESDS),
    );

    // Descriptor sizes are coded base-128, at most four bytes.
    let mut size: u32 = 0;
    for _ in 0..4 {
        let byte = reader.u8()?;
        size = size << 7 | u32::from(byte & 0x7f);
        if byte & 0x80 == 0 {
            break;
        }
    }

    ensure_attach!(
        reader.position() as usize + size as usize <= end,
        ParseError::InvalidBoxSize(ESDS),
        "descriptor overruns the esds box",
        WhileParsingBox(ESDS),
    );
    Ok(size as usize)
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;
    use bytes::BufMut;

    use super::*;

    fn put_descriptor(out: &mut Vec<u8>, tag: u8, payload: &[u8]) {
        out.put_u8(tag);
        out.put_u8(payload.len() as u8);
        out.put_slice(payload);
    }

    pub(crate) fn write_esds(out: &mut Vec<u8>, config: &[u8]) {
        let mut decoder_specific = vec![];
        put_descriptor(&mut decoder_specific, DECODER_SPECIFIC_TAG, config);

        // objectTypeIndication, streamType, bufferSizeDB, maxBitrate, avgBitrate, then the nested specific info.
        let mut decoder_config = vec![0x40, 0x15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        decoder_config.extend_from_slice(&decoder_specific);

        let mut es_payload = vec![0, 1, 0]; // ES_ID 1, no optional fields
        put_descriptor(&mut es_payload, DECODER_CONFIG_TAG, &decoder_config);

        let mut body = vec![];
        put_descriptor(&mut body, ES_DESCRIPTOR_TAG, &es_payload);

        out.put_u32(12 + body.len() as u32);
        out.put_slice(b"esds");
        out.put_u32(0); // version and flags
        out.put_slice(&body);
    }

    #[test]
    fn aac_lc_48khz_stereo() {
        // Object type 2, frequency index 3 (48 kHz), channel config 2: 00010 0011 0010 ...
        let config = [0b0001_0001, 0b1001_0000];
        let mut data = vec![];
        write_esds(&mut data, &config);

        let parsed =
            AudioSpecificConfig::parse(&data, ByteRange { start: 0, end: data.len() }).unwrap();
        assert_eq!(parsed.object_type, 2);
        assert_eq!(parsed.frequency, 48_000);
        assert_eq!(parsed.channel_config, 2);
    }

    #[test]
    fn explicit_frequency() {
        // Frequency index 15 carries a 24-bit explicit frequency; 37 bits total, left-aligned into 5 bytes.
        let fields: u64 = (2 << 32) | (15 << 28) | (44_056 << 4) | 1;
        let config = &(fields << 3 << 24).to_be_bytes()[..5];
        let parsed = AudioSpecificConfig::decode(config).unwrap();
        assert_eq!(parsed.object_type, 2);
        assert_eq!(parsed.frequency, 44_056);
        assert_eq!(parsed.channel_config, 1);
    }

    #[test]
    fn reserved_frequency_index() {
        // Object type 2, frequency index 13 (reserved).
        let config = [0b0001_0011, 0b0101_0000];
        assert_matches!(
            AudioSpecificConfig::decode(&config).map_err(|report| report.into_inner()),
            Err(ParseError::InvalidInput)
        );
    }
}
