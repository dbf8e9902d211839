//! A checked cursor over a byte buffer at bit granularity.

use super::reader::{ReadError, ReadResult};

/// The longest zero-run accepted while decoding an Exp-Golomb code.
const MAX_EXP_GOLOMB_ZEROS: u32 = 32;

/// A most-significant-bit-first cursor over a byte buffer.
///
/// Always a non-owning view; the cursor is checked against the bit length before every read, and no read ever
/// advances past it. A failed read mid-decode consumes only the bits actually read before the failure.
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_len: usize,
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Construct a reader over all of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_len: data.len() * 8, bit_pos: 0 }
    }

    /// Return the total length of the buffer, in bits.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Return the current cursor, in bits from the start of the buffer.
    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Set the cursor to an absolute bit position, validating `position <= bit_len`.
    pub fn set_bit_position(&mut self, position: usize) -> ReadResult<()> {
        if position > self.bit_len {
            return Err(ReadError::OutOfRange);
        }
        self.bit_pos = position;
        Ok(())
    }

    /// Return the number of bits remaining past the cursor.
    pub fn remaining(&self) -> usize {
        self.bit_len - self.bit_pos
    }

    /// Read a single bit.
    pub fn bit(&mut self) -> ReadResult<bool> {
        if self.bit_pos >= self.bit_len {
            return Err(ReadError::OutOfRange);
        }
        let byte = self.data[self.bit_pos / 8];
        let bit = byte >> (7 - self.bit_pos % 8) & 1;
        self.bit_pos += 1;
        Ok(bit != 0)
    }

    /// Read `count` bits (at most 32) as a big-endian unsigned integer.
    pub fn bits(&mut self, count: u32) -> ReadResult<u32> {
        if count > 32 {
            return Err(ReadError::Overflow);
        }
        if count as usize > self.remaining() {
            return Err(ReadError::OutOfRange);
        }
        let mut value = 0u32;
        for _ in 0..count {
            value = value << 1 | self.bit()? as u32;
        }
        Ok(value)
    }

    /// Skip `count` bits.
    pub fn skip(&mut self, count: usize) -> ReadResult<()> {
        if count > self.remaining() {
            return Err(ReadError::OutOfRange);
        }
        self.bit_pos += count;
        Ok(())
    }

    /// Decode an unsigned Exp-Golomb code.
    ///
    /// The leading zero-run is bounded to 32 bits; a longer run fails with [`ReadError::Overflow`].
    pub fn unsigned_exp_golomb(&mut self) -> ReadResult<u64> {
        let mut zeros = 0u32;
        while !self.bit()? {
            zeros += 1;
            if zeros > MAX_EXP_GOLOMB_ZEROS {
                return Err(ReadError::Overflow);
            }
        }
        let info = self.bits(zeros)? as u64;
        Ok((1u64 << zeros) - 1 + info)
    }

    /// Decode a signed Exp-Golomb code.
    ///
    /// Delegates to the unsigned form; code 0 maps to 0, odd codes map to negative values and even codes to positive
    /// ones (code 1 → -1, code 2 → 1, code 3 → -2, ...).
    pub fn signed_exp_golomb(&mut self) -> ReadResult<i64> {
        let code = self.unsigned_exp_golomb()?;
        if code == 0 {
            return Ok(0);
        }
        let value = code + 1;
        if value % 2 == 0 {
            Ok(-((value >> 1) as i64))
        } else {
            Ok((value >> 1) as i64)
        }
    }
}
