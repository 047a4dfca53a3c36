// SPDX-License-Identifier: GPL-2.0-or-later

use crate::color::{ChromaOffsets, Rgb};
use crate::error::DecodeError;
use crate::reader::ByteReader;

/// Slots in every codebook table; indices in the vector stream are 8-bit.
pub const CODEBOOK_SIZE: usize = 256;

/// Reconstruction vector for one 2x2 sub-block.
///
/// Output colours for both pixel formats are derived when the entry is
/// loaded so painting never repeats the chroma math.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodebookEntry {
    /// Luma samples in raster order: top-left, top-right, bottom-left, bottom-right.
    pub luma: [u8; 4],
    pub u: i8,
    pub v: i8,
    rgb: [Rgb; 4],
    packed: [u32; 4],
}

impl CodebookEntry {
    pub fn color(luma: [u8; 4], u: i8, v: i8) -> Self {
        let offsets = ChromaOffsets::new(u, v);
        let rgb = luma.map(|sample| offsets.apply(sample));
        Self {
            luma,
            u,
            v,
            rgb,
            packed: rgb.map(Rgb::packed),
        }
    }

    pub fn mono(luma: [u8; 4]) -> Self {
        let rgb = luma.map(Rgb::grey);
        Self {
            luma,
            u: 0,
            v: 0,
            rgb,
            packed: rgb.map(Rgb::packed),
        }
    }

    #[inline]
    pub fn rgb(&self) -> &[Rgb; 4] {
        &self.rgb
    }

    #[inline]
    pub fn packed(&self) -> &[u32; 4] {
        &self.packed
    }
}

/// Selects one of the two tables a strip owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodebookKind {
    /// One entry paints a whole 4x4 block.
    V1,
    /// Four entries paint one 2x2 quadrant each.
    V4,
}

/// How entries are laid out inside a codebook-load chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryEncoding {
    /// Four luma bytes followed by signed u and v.
    Color,
    /// Four luma bytes; chroma is zero.
    Mono,
}

impl EntryEncoding {
    #[inline]
    pub fn entry_len(self) -> usize {
        match self {
            Self::Color => 6,
            Self::Mono => 4,
        }
    }

    fn read(self, reader: &mut ByteReader<'_>) -> Result<CodebookEntry, DecodeError> {
        let luma: [u8; 4] = [
            reader.read_u8()?,
            reader.read_u8()?,
            reader.read_u8()?,
            reader.read_u8()?,
        ];
        match self {
            Self::Color => {
                let u = reader.read_i8()?;
                let v = reader.read_i8()?;
                Ok(CodebookEntry::color(luma, u, v))
            }
            Self::Mono => Ok(CodebookEntry::mono(luma)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codebook {
    entries: [CodebookEntry; CODEBOOK_SIZE],
}

impl Codebook {
    pub fn new_boxed() -> Box<Self> {
        Box::new(Self {
            entries: [CodebookEntry::default(); CODEBOOK_SIZE],
        })
    }

    #[inline]
    pub fn entry(&self, index: u8) -> &CodebookEntry {
        &self.entries[index as usize]
    }

    pub fn set(&mut self, index: u8, entry: CodebookEntry) {
        self.entries[index as usize] = entry;
    }

    pub(crate) fn copy_from(&mut self, other: &Codebook) {
        self.entries = other.entries;
    }

    pub(crate) fn clear(&mut self) {
        self.entries = [CodebookEntry::default(); CODEBOOK_SIZE];
    }

    /// Load consecutive entries from slot 0 until the chunk runs out.
    ///
    /// Entries past the last slot and any trailing partial entry are skipped.
    pub(crate) fn load_full(
        &mut self,
        reader: &mut ByteReader<'_>,
        encoding: EntryEncoding,
    ) -> Result<usize, DecodeError> {
        let count = (reader.remaining() / encoding.entry_len()).min(CODEBOOK_SIZE);
        for slot in &mut self.entries[..count] {
            *slot = encoding.read(reader)?;
        }
        reader.skip_to_end();
        Ok(count)
    }

    /// Load entries selected by 32-bit masks, most significant bit first.
    ///
    /// Each mask covers the next 32 slots; a clear bit keeps the slot's
    /// current (carried-over) value.
    pub(crate) fn load_selective(
        &mut self,
        reader: &mut ByteReader<'_>,
        encoding: EntryEncoding,
    ) -> Result<usize, DecodeError> {
        let entry_len = encoding.entry_len();
        let mut index = 0usize;
        let mut loaded = 0usize;
        while reader.remaining() >= 4 {
            let mut mask = reader.read_u32()?;
            for _ in 0..32 {
                if reader.remaining() < entry_len {
                    break;
                }
                if mask & 0x8000_0000 != 0 {
                    let entry = encoding.read(reader)?;
                    if let Some(slot) = self.entries.get_mut(index) {
                        *slot = entry;
                        loaded += 1;
                    }
                }
                index += 1;
                mask <<= 1;
            }
        }
        reader.skip_to_end();
        Ok(loaded)
    }
}

/// The V1 and V4 tables owned by one strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripCodebooks {
    v1: Box<Codebook>,
    v4: Box<Codebook>,
}

impl Default for StripCodebooks {
    fn default() -> Self {
        Self {
            v1: Codebook::new_boxed(),
            v4: Codebook::new_boxed(),
        }
    }
}

impl StripCodebooks {
    #[inline]
    pub fn table(&self, kind: CodebookKind) -> &Codebook {
        match kind {
            CodebookKind::V1 => &self.v1,
            CodebookKind::V4 => &self.v4,
        }
    }

    #[inline]
    pub fn table_mut(&mut self, kind: CodebookKind) -> &mut Codebook {
        match kind {
            CodebookKind::V1 => &mut self.v1,
            CodebookKind::V4 => &mut self.v4,
        }
    }

    /// Overwrite both tables with another strip's, reusing the allocations.
    pub(crate) fn copy_from(&mut self, other: &StripCodebooks) {
        self.v1.copy_from(&other.v1);
        self.v4.copy_from(&other.v4);
    }

    pub(crate) fn clear(&mut self) {
        self.v1.clear();
        self.v4.clear();
    }
}
