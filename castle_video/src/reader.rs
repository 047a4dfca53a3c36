// SPDX-License-Identifier: GPL-2.0-or-later

use byteorder::{BigEndian, ByteOrder};

use crate::error::DecodeError;

/// Big-endian cursor over a byte range of the frame payload.
///
/// Offsets in errors are absolute within the frame payload, even for
/// readers split off with [`ByteReader::take`].
#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    cursor: usize,
    base: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            cursor: 0,
            base: 0,
        }
    }

    /// Absolute offset of the next byte.
    #[inline]
    pub(crate) fn offset(&self) -> usize {
        self.base + self.cursor
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn truncated(&self, needed: usize) -> DecodeError {
        DecodeError::TruncatedRead {
            offset: self.offset(),
            needed,
            available: self.remaining(),
        }
    }

    pub(crate) fn read_exact(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(self.truncated(len));
        }
        let slice = &self.data[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_exact(1)?[0])
    }

    pub(crate) fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.read_u8()? as i8)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(BigEndian::read_u16(self.read_exact(2)?))
    }

    pub(crate) fn read_u24(&mut self) -> Result<u32, DecodeError> {
        Ok(BigEndian::read_u24(self.read_exact(3)?))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(BigEndian::read_u32(self.read_exact(4)?))
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.read_exact(len).map(|_| ())
    }

    /// Split off the next `len` bytes as their own reader and advance past them.
    pub(crate) fn take(&mut self, len: usize) -> Result<ByteReader<'a>, DecodeError> {
        let base = self.offset();
        let data = self.read_exact(len)?;
        Ok(ByteReader {
            data,
            cursor: 0,
            base,
        })
    }

    pub(crate) fn skip_to_end(&mut self) {
        self.cursor = self.data.len();
    }
}
