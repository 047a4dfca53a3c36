// SPDX-License-Identifier: GPL-2.0-or-later

//! Decoder for Cinepak vector-quantized video frames.
//!
//! [`CinepakDecoder`] keeps the per-strip codebooks of one stream and paints
//! each frame into a caller-owned 24 or 32 bit buffer.

pub mod block;
pub mod chunk;
pub mod codebook;
pub mod color;
pub mod decoder;
pub mod error;
pub mod limits;
mod reader;

pub use block::{BLOCK_SIZE, FrameTarget};
pub use chunk::{ChunkTag, VectorCoding};
pub use codebook::{
    CODEBOOK_SIZE, Codebook, CodebookEntry, CodebookKind, EntryEncoding, StripCodebooks,
};
pub use color::{PixelFormat, Rgb};
pub use decoder::{
    CinepakDecoder, FrameHeader, FrameReport, StripHeader, StripKind, peek_frame_header,
};
pub use error::{DecodeError, DecodeWarning};
pub use limits::DecodeLimits;
