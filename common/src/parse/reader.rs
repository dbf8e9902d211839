//! A checked big-endian cursor over an in-memory byte buffer.

use std::result::Result as StdResult;

use super::FourCC;

/// Error type returned by [`ByteReader`](super::ByteReader) and [`BitReader`](super::BitReader).
///
/// This is the low-level reader error family; the container and bitstream parsers embed it in their own error types
/// via explicit `From` conversions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// Fewer bytes/bits remain in the buffer than the read requested.
    #[error("read out of range")]
    OutOfRange,

    /// A decoded value or zero-run exceeded a structural bound.
    #[error("decoded value overflow")]
    Overflow,
}

/// A convenience type alias for a [`Result`](std::result::Result) of a reader operation.
pub type ReadResult<T> = StdResult<T, ReadError>;

/// A big-endian cursor over a byte buffer.
///
/// Every fixed-width read advances the cursor by its width and fails with [`ReadError::OutOfRange`] if fewer bytes
/// remain than requested. [`seek`](Self::seek) adjusts the cursor without a bounds check; a caller may deliberately
/// seek past the end to have the next read signal truncation, but must then treat the cursor as unvalidated until a
/// read or [`set_position`](Self::set_position) succeeds.
///
/// The buffer storage is anything implementing `AsRef<[u8]>`, so a reader may either borrow (`&[u8]`) or own
/// (`Vec<u8>`) its bytes.
#[derive(Clone, Debug)]
pub struct ByteReader<T> {
    data: T,
    pos: isize,
}

impl<T: AsRef<[u8]>> ByteReader<T> {
    /// Construct a reader positioned at the start of `data`.
    pub fn new(data: T) -> Self {
        Self { data, pos: 0 }
    }

    /// Return the total length of the underlying buffer, in bytes.
    pub fn len(&self) -> usize {
        self.data.as_ref().len()
    }

    /// Return whether the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.as_ref().is_empty()
    }

    /// Return the current cursor, which may be out of range after a [`seek`](Self::seek).
    pub fn position(&self) -> isize {
        self.pos
    }

    /// Set the cursor to an absolute position, validating `position <= len`.
    pub fn set_position(&mut self, position: usize) -> ReadResult<()> {
        if position > self.len() {
            return Err(ReadError::OutOfRange);
        }
        self.pos = position as isize;
        Ok(())
    }

    /// Adjust the cursor by a relative amount, without a bounds check.
    pub fn seek(&mut self, delta: isize) {
        self.pos += delta;
    }

    /// Return the number of bytes remaining past the cursor, saturating to zero for an out-of-range cursor.
    pub fn remaining(&self) -> usize {
        if self.pos < 0 {
            return 0;
        }
        self.len().saturating_sub(self.pos as usize)
    }

    /// Read `len` bytes as a slice of the underlying buffer.
    pub fn bytes(&mut self, len: usize) -> ReadResult<&[u8]> {
        if self.pos < 0 || len > self.len().saturating_sub(self.pos as usize) {
            return Err(ReadError::OutOfRange);
        }
        let start = self.pos as usize;
        self.pos += len as isize;
        Ok(&self.data.as_ref()[start..start + len])
    }

    /// Read a big-endian `u8`.
    pub fn u8(&mut self) -> ReadResult<u8> {
        Ok(self.bytes(1)?[0])
    }

    /// Read a big-endian `u16`.
    pub fn u16(&mut self) -> ReadResult<u16> {
        Ok(u16::from_be_bytes(self.bytes(2)?.try_into().unwrap()))
    }

    /// Read a big-endian 24-bit unsigned integer.
    pub fn u24(&mut self) -> ReadResult<u32> {
        let bytes = self.bytes(3)?;
        Ok(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }

    /// Read a big-endian `u32`.
    pub fn u32(&mut self) -> ReadResult<u32> {
        Ok(u32::from_be_bytes(self.bytes(4)?.try_into().unwrap()))
    }

    /// Read a big-endian `u64`.
    pub fn u64(&mut self) -> ReadResult<u64> {
        Ok(u64::from_be_bytes(self.bytes(8)?.try_into().unwrap()))
    }

    /// Read a big-endian `i8`.
    pub fn i8(&mut self) -> ReadResult<i8> {
        Ok(self.u8()? as i8)
    }

    /// Read a big-endian `i16`.
    pub fn i16(&mut self) -> ReadResult<i16> {
        Ok(self.u16()? as i16)
    }

    /// Read a big-endian `i32`.
    pub fn i32(&mut self) -> ReadResult<i32> {
        Ok(self.u32()? as i32)
    }

    /// Read a big-endian `i64`.
    pub fn i64(&mut self) -> ReadResult<i64> {
        Ok(self.u64()? as i64)
    }

    /// Read a [`FourCC`].
    pub fn four_cc(&mut self) -> ReadResult<FourCC> {
        Ok(FourCC { value: self.bytes(4)?.try_into().unwrap() })
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn big_endian_reads_advance_the_cursor() {
        let mut reader = ByteReader::new(&b"\x01\x02\x03\x04\x05\x06\x07\x08"[..]);
        assert_eq!(reader.u16().unwrap(), 0x0102);
        assert_eq!(reader.u24().unwrap(), 0x030405);
        assert_eq!(reader.position(), 5);
        assert_eq!(reader.remaining(), 3);
        assert_matches!(reader.u32(), Err(ReadError::OutOfRange));
    }

    #[test]
    fn failed_read_leaves_cursor_unchanged() {
        let mut reader = ByteReader::new(&b"\xff"[..]);
        assert_matches!(reader.u16(), Err(ReadError::OutOfRange));
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.u8().unwrap(), 0xff);
    }

    #[test]
    fn seek_is_unchecked_and_fails_lazily() {
        let mut reader = ByteReader::new(&b"abcd"[..]);
        reader.seek(6);
        assert_eq!(reader.remaining(), 0);
        assert_matches!(reader.u8(), Err(ReadError::OutOfRange));

        reader.seek(-10);
        assert!(reader.position() < 0);
        assert_matches!(reader.u8(), Err(ReadError::OutOfRange));
    }

    #[test]
    fn set_position_validates() {
        let mut reader = ByteReader::new(&b"abcd"[..]);
        reader.set_position(4).unwrap();
        assert_matches!(reader.set_position(5), Err(ReadError::OutOfRange));
        reader.set_position(1).unwrap();
        assert_eq!(reader.u8().unwrap(), b'b');
    }

    #[test]
    fn owned_buffer() {
        let mut reader = ByteReader::new(vec![0u8, 0, 0, 42]);
        assert_eq!(reader.u32().unwrap(), 42);
    }
}
