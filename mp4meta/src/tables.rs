//! Dense decoding of the deferred sample-table descriptors.
//!
//! The box-tree walk records each sample table as a [`SampleArray`] descriptor pointing into the buffered `moov`
//! bytes. The decoders here are straight strided loops over those records, run only when a consumer actually needs a
//! dense table.

use mediameta_common::parse::ByteReader;
use mediameta_common::Result;

use crate::parse::{ChunkOffsetWidth, ParseError, SampleArray};

/// One decoded time-to-sample record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeToSampleEntry {
    /// The number of consecutive samples sharing this delta.
    pub sample_count: u32,

    /// The duration of each of those samples, in media-timescale units.
    pub sample_delta: u32,
}

/// One decoded sample-to-chunk record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleToChunkEntry {
    /// The first chunk this record applies to, 1-based.
    pub first_chunk: u32,

    /// The number of samples in each chunk of the run.
    pub samples_per_chunk: u32,

    /// The sample description the run's samples use, 1-based.
    pub sample_description_index: u32,
}

/// Decode a time-to-sample descriptor against the buffer it was recorded from.
pub fn time_to_sample(buf: &[u8], table: SampleArray) -> Result<Vec<TimeToSampleEntry>, ParseError> {
    let mut reader = positioned(buf, table)?;
    let mut entries = Vec::with_capacity(table.entry_count as usize);
    for _ in 0..table.entry_count {
        entries.push(TimeToSampleEntry { sample_count: reader.u32()?, sample_delta: reader.u32()? });
    }
    Ok(entries)
}

/// Decode a sample-to-chunk descriptor against the buffer it was recorded from.
pub fn sample_to_chunk(buf: &[u8], table: SampleArray) -> Result<Vec<SampleToChunkEntry>, ParseError> {
    let mut reader = positioned(buf, table)?;
    let mut entries = Vec::with_capacity(table.entry_count as usize);
    for _ in 0..table.entry_count {
        entries.push(SampleToChunkEntry {
            first_chunk: reader.u32()?,
            samples_per_chunk: reader.u32()?,
            sample_description_index: reader.u32()?,
        });
    }
    Ok(entries)
}

/// Decode a chunk-offset descriptor against the buffer it was recorded from, widening 32-bit offsets.
pub fn chunk_offsets(
    buf: &[u8],
    table: SampleArray,
    width: ChunkOffsetWidth,
) -> Result<Vec<u64>, ParseError> {
    let mut reader = positioned(buf, table)?;
    let mut offsets = Vec::with_capacity(table.entry_count as usize);
    for _ in 0..table.entry_count {
        let offset = match width {
            ChunkOffsetWidth::U32 => reader.u32()?.into(),
            ChunkOffsetWidth::U64 => reader.u64()?,
        };
        offsets.push(offset);
    }
    Ok(offsets)
}

fn positioned(buf: &[u8], table: SampleArray) -> Result<ByteReader<&[u8]>, ParseError> {
    let mut reader = ByteReader::new(buf);
    reader.set_position(table.offset)?;
    Ok(reader)
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;
    use bytes::BufMut;

    use super::*;

    #[test]
    fn strided_decodes() {
        let mut buf = vec![0u8; 3]; // unrelated leading bytes
        buf.put_u32(2);
        buf.put_u32(1000);
        buf.put_u32(1);
        buf.put_u32(500);

        let table = SampleArray { offset: 3, entry_count: 2 };
        let entries = time_to_sample(&buf, table).unwrap();
        assert_eq!(
            entries,
            [
                TimeToSampleEntry { sample_count: 2, sample_delta: 1000 },
                TimeToSampleEntry { sample_count: 1, sample_delta: 500 },
            ]
        );
    }

    #[test]
    fn chunk_offsets_widen() {
        let mut buf = vec![];
        buf.put_u32(48);
        buf.put_u32(4096);
        let table = SampleArray { offset: 0, entry_count: 2 };
        assert_eq!(chunk_offsets(&buf, table, ChunkOffsetWidth::U32).unwrap(), [48, 4096]);

        let mut buf = vec![];
        buf.put_u64(1 << 33);
        let table = SampleArray { offset: 0, entry_count: 1 };
        assert_eq!(chunk_offsets(&buf, table, ChunkOffsetWidth::U64).unwrap(), [1 << 33]);
    }

    #[test]
    fn stale_descriptor_fails_closed() {
        let buf = [0u8; 8];
        let table = SampleArray { offset: 4, entry_count: 1 };
        assert_matches!(time_to_sample(&buf, table), Err(_));
    }
}
