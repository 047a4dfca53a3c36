// SPDX-License-Identifier: GPL-2.0-or-later
//
// A strip body is a run of chunks: 16-bit tag, 16-bit length (header
// included), payload. Codebook chunks update the strip's tables in place;
// vector chunks paint 4x4 blocks at the frame's scan cursor.

use crate::block::{BLOCK_SIZE, FrameTarget};
use crate::codebook::{Codebook, CodebookKind, EntryEncoding, StripCodebooks};
use crate::error::DecodeError;
use crate::limits::DecodeLimits;
use crate::reader::ByteReader;

pub const CHUNK_HEADER_LEN: usize = 4;

/// How a vector chunk chooses between V1 and V4 blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorCoding {
    /// One mask bit per block: set for four V4 indices, clear for one V1 index.
    Intra,
    /// Per block: `0` skips, `10` paints V1, `11` paints V4.
    Inter,
    /// Every byte is a V1 index; no masks.
    V1Only,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkTag {
    Codebook {
        kind: CodebookKind,
        encoding: EntryEncoding,
        selective: bool,
    },
    Vectors(VectorCoding),
    Unknown(u16),
}

impl ChunkTag {
    pub fn from_raw(raw: u16) -> Self {
        let codebook = |kind, encoding, selective| Self::Codebook {
            kind,
            encoding,
            selective,
        };
        match raw {
            0x2000 => codebook(CodebookKind::V4, EntryEncoding::Color, false),
            0x2100 => codebook(CodebookKind::V4, EntryEncoding::Color, true),
            0x2200 => codebook(CodebookKind::V1, EntryEncoding::Color, false),
            0x2300 => codebook(CodebookKind::V1, EntryEncoding::Color, true),
            0x2400 => codebook(CodebookKind::V4, EntryEncoding::Mono, false),
            0x2500 => codebook(CodebookKind::V4, EntryEncoding::Mono, true),
            0x2600 => codebook(CodebookKind::V1, EntryEncoding::Mono, false),
            0x2700 => codebook(CodebookKind::V1, EntryEncoding::Mono, true),
            0x3000 => Self::Vectors(VectorCoding::Intra),
            0x3100 => Self::Vectors(VectorCoding::Inter),
            0x3200 => Self::Vectors(VectorCoding::V1Only),
            other => Self::Unknown(other),
        }
    }
}

/// Write position for the next block, in pixels.
///
/// Lives for one decode call: `x` restarts with every strip while `y` keeps
/// counting down the frame, bounded by the strips seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ScanCursor {
    pub(crate) x: usize,
    pub(crate) y: usize,
    bottom: usize,
    width: usize,
}

impl ScanCursor {
    pub(crate) fn new(width: usize) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    /// Start a strip whose blocks extend the vertical bound by `height` rows.
    pub(crate) fn begin_strip(&mut self, height: usize) {
        self.x = 0;
        self.bottom = self.bottom.saturating_add(height);
    }

    #[inline]
    pub(crate) fn done(&self) -> bool {
        self.y >= self.bottom
    }

    #[inline]
    fn advance(&mut self) {
        self.x += BLOCK_SIZE;
        if self.x >= self.width {
            self.x = 0;
            self.y += BLOCK_SIZE;
        }
    }
}

/// MSB-first reader over the 32-bit flag words interleaved with indices.
struct FlagBits {
    word: u32,
    left: u32,
}

impl FlagBits {
    fn new() -> Self {
        Self { word: 0, left: 0 }
    }

    /// True when the chunk has no bytes left for another block, or the
    /// current word is spent and no further word can start.
    fn exhausted(&self, body: &ByteReader<'_>) -> bool {
        body.is_empty() || (self.left == 0 && body.remaining() < 4)
    }

    fn next(&mut self, body: &mut ByteReader<'_>) -> Result<bool, DecodeError> {
        if self.left == 0 {
            self.word = body.read_u32()?;
            self.left = 32;
        }
        let bit = self.word & 0x8000_0000 != 0;
        self.word <<= 1;
        self.left -= 1;
        Ok(bit)
    }
}

/// Run every chunk in one strip body. Returns the number of chunks seen.
pub(crate) fn dispatch_chunks(
    strip: usize,
    reader: &mut ByteReader<'_>,
    codebooks: &mut StripCodebooks,
    target: &mut FrameTarget<'_>,
    cursor: &mut ScanCursor,
    limits: &DecodeLimits,
) -> Result<u32, DecodeError> {
    let mut chunks = 0u32;
    while reader.remaining() >= CHUNK_HEADER_LEN {
        chunks += 1;
        if chunks > limits.max_chunks_per_strip {
            return Err(DecodeError::TooManyChunks {
                strip,
                limit: limits.max_chunks_per_strip,
            });
        }

        let raw_tag = reader.read_u16()?;
        let length = reader.read_u16()?;
        if (length as usize) < CHUNK_HEADER_LEN {
            return Err(DecodeError::MalformedChunk {
                tag: raw_tag,
                length,
            });
        }
        let mut body = reader.take(length as usize - CHUNK_HEADER_LEN)?;
        log::trace!(
            "[castle_video] strip {strip}: chunk {raw_tag:#06x} ({} payload bytes)",
            body.remaining()
        );

        match ChunkTag::from_raw(raw_tag) {
            ChunkTag::Codebook {
                kind,
                encoding,
                selective,
            } => {
                let table = codebooks.table_mut(kind);
                let loaded = if selective {
                    table.load_selective(&mut body, encoding)?
                } else {
                    table.load_full(&mut body, encoding)?
                };
                log::trace!("[castle_video] strip {strip}: loaded {loaded} {kind:?} entries");
            }
            ChunkTag::Vectors(coding) => {
                decode_vectors(coding, &mut body, codebooks, target, cursor)?;
            }
            ChunkTag::Unknown(tag) => {
                log::debug!("[castle_video] strip {strip}: skipping unknown chunk {tag:#06x}");
            }
        }
    }
    if !reader.is_empty() {
        log::trace!(
            "[castle_video] strip {strip}: ignoring {} trailing bytes",
            reader.remaining()
        );
    }
    Ok(chunks)
}

fn paint_v1(
    body: &mut ByteReader<'_>,
    table: &Codebook,
    target: &mut FrameTarget<'_>,
    cursor: &ScanCursor,
) -> Result<(), DecodeError> {
    let index = body.read_u8()?;
    target.paint_v1(cursor.x, cursor.y, table.entry(index));
    Ok(())
}

fn paint_v4(
    body: &mut ByteReader<'_>,
    table: &Codebook,
    target: &mut FrameTarget<'_>,
    cursor: &ScanCursor,
) -> Result<(), DecodeError> {
    let [a, b, c, d] = [
        body.read_u8()?,
        body.read_u8()?,
        body.read_u8()?,
        body.read_u8()?,
    ];
    target.paint_v4(
        cursor.x,
        cursor.y,
        [table.entry(a), table.entry(b), table.entry(c), table.entry(d)],
    );
    Ok(())
}

fn decode_vectors(
    coding: VectorCoding,
    body: &mut ByteReader<'_>,
    codebooks: &StripCodebooks,
    target: &mut FrameTarget<'_>,
    cursor: &mut ScanCursor,
) -> Result<(), DecodeError> {
    let v1 = codebooks.table(CodebookKind::V1);
    let v4 = codebooks.table(CodebookKind::V4);

    match coding {
        VectorCoding::Intra => {
            let mut flags = FlagBits::new();
            while !cursor.done() && !flags.exhausted(body) {
                if flags.next(body)? {
                    paint_v4(body, v4, target, cursor)?;
                } else {
                    paint_v1(body, v1, target, cursor)?;
                }
                cursor.advance();
            }
        }
        VectorCoding::Inter => {
            let mut flags = FlagBits::new();
            while !cursor.done() && !flags.exhausted(body) {
                if flags.next(body)? {
                    if flags.next(body)? {
                        paint_v4(body, v4, target, cursor)?;
                    } else {
                        paint_v1(body, v1, target, cursor)?;
                    }
                }
                cursor.advance();
            }
        }
        VectorCoding::V1Only => {
            while !cursor.done() && !body.is_empty() {
                paint_v1(body, v1, target, cursor)?;
                cursor.advance();
            }
        }
    }
    Ok(())
}
