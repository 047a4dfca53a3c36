// SPDX-License-Identifier: GPL-2.0-or-later
//
// Cinepak frame and strip driver.
//
// A frame is a 10-byte header followed by strips. Every strip inherits the
// previous strip's codebooks before its own chunks run, and strip 0 starts
// from whatever the context kept from the last frame, so the decoder must
// live for the whole stream.

use serde::Serialize;

use crate::block::FrameTarget;
use crate::chunk::{ScanCursor, dispatch_chunks};
use crate::codebook::StripCodebooks;
use crate::color::PixelFormat;
use crate::error::{DecodeError, DecodeWarning};
use crate::limits::{DecodeLimits, Retry, retry_bounded};
use crate::reader::ByteReader;

pub const FRAME_HEADER_LEN: usize = 10;
pub const STRIP_HEADER_LEN: usize = 12;

const KEY_STRIP_TAG: u16 = 0x1000;
const DELTA_STRIP_TAG: u16 = 0x1100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameHeader {
    pub flags: u8,
    /// 24-bit length the encoder wrote; not trusted.
    pub declared_len: u32,
    pub width: u16,
    pub height: u16,
    pub strip_count: u16,
}

impl FrameHeader {
    fn read(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            flags: reader.read_u8()?,
            declared_len: reader.read_u24()?,
            width: reader.read_u16()?,
            height: reader.read_u16()?,
            strip_count: reader.read_u16()?,
        })
    }
}

/// Read the frame header without touching any decoder state.
pub fn peek_frame_header(payload: &[u8]) -> Result<FrameHeader, DecodeError> {
    FrameHeader::read(&mut ByteReader::new(payload))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StripKind {
    Key,
    Delta,
}

impl StripKind {
    fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            KEY_STRIP_TAG => Some(Self::Key),
            DELTA_STRIP_TAG => Some(Self::Delta),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StripHeader {
    pub kind: StripKind,
    /// Byte length including the 12-byte header.
    pub length: u16,
    pub top: u16,
    pub left: u16,
    pub bottom: u16,
    pub right: u16,
}

impl StripHeader {
    fn ensure_full_frame(&self, strip: usize, width: u32, height: u32) -> Result<(), DecodeError> {
        let full = self.top == 0
            && self.left == 0
            && u32::from(self.bottom) == height
            && u32::from(self.right) == width;
        if full {
            Ok(())
        } else {
            Err(DecodeError::UnsupportedStripRect {
                strip,
                top: self.top,
                left: self.left,
                bottom: self.bottom,
                right: self.right,
            })
        }
    }
}

/// What a successful decode call saw on its way through the frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    pub header: FrameHeader,
    pub strips_decoded: usize,
    pub warnings: Vec<DecodeWarning>,
}

/// Decoder context for one Cinepak stream.
///
/// Holds the per-strip codebooks that carry over between frames. Create one
/// per stream and feed it every frame in order; it is not shared between
/// streams and does no locking.
#[derive(Debug, Clone, Default)]
pub struct CinepakDecoder {
    strips: Vec<StripCodebooks>,
    limits: DecodeLimits,
}

impl CinepakDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: DecodeLimits) -> Self {
        Self {
            strips: Vec::new(),
            limits,
        }
    }

    #[inline]
    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Number of strip codebook pairs allocated so far. Never shrinks.
    #[inline]
    pub fn strip_count(&self) -> usize {
        self.strips.len()
    }

    pub fn strip_codebooks(&self, strip: usize) -> Option<&StripCodebooks> {
        self.strips.get(strip)
    }

    /// Zero every codebook, e.g. after the caller seeks to a new key frame.
    pub fn reset(&mut self) {
        for strip in &mut self.strips {
            strip.clear();
        }
    }

    /// Decode one frame into `out`, a `width` x `height` buffer of 24 or 32
    /// bit pixels with rows packed back to back.
    ///
    /// On error, pixels painted before the failure stay in `out` and the
    /// codebooks keep any updates already applied.
    pub fn decode(
        &mut self,
        payload: &[u8],
        out: &mut [u8],
        width: u32,
        height: u32,
        bits_per_pixel: u32,
    ) -> Result<(), DecodeError> {
        self.decode_with_report(payload, out, width, height, bits_per_pixel)
            .map(|_| ())
    }

    /// Same as [`CinepakDecoder::decode`], also returning the header and any
    /// non-fatal warnings.
    pub fn decode_with_report(
        &mut self,
        payload: &[u8],
        out: &mut [u8],
        width: u32,
        height: u32,
        bits_per_pixel: u32,
    ) -> Result<FrameReport, DecodeError> {
        let format = PixelFormat::from_bits_per_pixel(bits_per_pixel)?;
        let mut reader = ByteReader::new(payload);
        let header = FrameHeader::read(&mut reader)?;
        let mut warnings = Vec::new();

        log::debug!(
            "[castle_video] frame flags={:#04x} len={} {}x{} strips={}",
            header.flags,
            header.declared_len,
            header.width,
            header.height,
            header.strip_count
        );

        if header.declared_len as usize != payload.len() {
            log::warn!(
                "[castle_video] frame declares {} bytes, payload has {}; using payload size",
                header.declared_len,
                payload.len()
            );
            warnings.push(DecodeWarning::HeaderMismatch {
                declared: header.declared_len,
                actual: payload.len(),
            });
        }

        let strip_count = self.clamp_strip_count(header.strip_count, &mut warnings)?;
        if self.strips.len() < strip_count {
            self.strips.resize_with(strip_count, StripCodebooks::default);
        }

        let mut target = FrameTarget::new(out, width as usize, height as usize, format);
        let mut cursor = ScanCursor::new(width as usize);

        for strip in 0..strip_count {
            if strip > 0 {
                let (previous, current) = self.strips.split_at_mut(strip);
                current[0].copy_from(&previous[strip - 1]);
            }

            let (strip_header, mut body) =
                self.read_strip_header(strip, &mut reader, &mut warnings)?;
            strip_header.ensure_full_frame(strip, width, height)?;
            log::debug!(
                "[castle_video] strip {}/{}: {:?}, {} bytes",
                strip + 1,
                strip_count,
                strip_header.kind,
                strip_header.length
            );

            cursor.begin_strip(strip_header.bottom as usize);
            let chunks = dispatch_chunks(
                strip,
                &mut body,
                &mut self.strips[strip],
                &mut target,
                &mut cursor,
                &self.limits,
            )?;
            log::trace!("[castle_video] strip {strip}: {chunks} chunks");
        }

        Ok(FrameReport {
            header,
            strips_decoded: strip_count,
            warnings,
        })
    }

    fn clamp_strip_count(
        &self,
        declared: u16,
        warnings: &mut Vec<DecodeWarning>,
    ) -> Result<usize, DecodeError> {
        let limit = self.limits.max_strips;
        if declared <= limit {
            return Ok(declared as usize);
        }
        if self.limits.reject_excess_strips {
            return Err(DecodeError::TooManyStrips { declared, limit });
        }
        log::warn!("[castle_video] capping strip count from {declared} to {limit}");
        warnings.push(DecodeWarning::StripsClamped {
            declared,
            used: limit,
        });
        Ok(limit as usize)
    }

    /// Read a strip header, skipping over records with unknown tags, and
    /// split the strip's chunk bytes off `reader`.
    fn read_strip_header<'a>(
        &self,
        strip: usize,
        reader: &mut ByteReader<'a>,
        warnings: &mut Vec<DecodeWarning>,
    ) -> Result<(StripHeader, ByteReader<'a>), DecodeError> {
        let mut skip = 0usize;
        let next_header = |attempt: u32| -> Result<Option<(StripKind, u16)>, DecodeError> {
            reader.skip(skip)?;
            let tag = reader.read_u16()?;
            let length = reader.read_u16()?;
            match StripKind::from_raw(tag) {
                Some(kind) => Ok(Some((kind, length))),
                None => {
                    log::warn!(
                        "[castle_video] strip {strip}: bad strip tag {tag:#06x} at offset {} (attempt {})",
                        reader.offset() - 4,
                        attempt + 1
                    );
                    // The length field is the only hint where the next record starts.
                    skip = (length as usize).saturating_sub(4);
                    Ok(None)
                }
            }
        };
        let outcome = retry_bounded(self.limits.max_resync_attempts, next_header)?;

        let (kind, length) = match outcome {
            Retry::Found { value, retries } => {
                if retries > 0 {
                    warnings.push(DecodeWarning::StripResynced {
                        strip,
                        attempts: retries,
                    });
                }
                value
            }
            Retry::Exhausted { retries } => {
                return Err(DecodeError::StripResyncFailed {
                    strip,
                    attempts: retries,
                });
            }
        };

        if (length as usize) < STRIP_HEADER_LEN {
            return Err(DecodeError::MalformedStrip { strip, length });
        }
        let mut body = reader.take(length as usize - 4)?;
        let header = StripHeader {
            kind,
            length,
            top: body.read_u16()?,
            left: body.read_u16()?,
            bottom: body.read_u16()?,
            right: body.read_u16()?,
        };
        Ok((header, body))
    }
}
