// SPDX-License-Identifier: GPL-2.0-or-later

use serde::Serialize;
use thiserror::Error;

/// Errors returned while decoding a single Cinepak frame.
///
/// Every variant aborts the current `decode` call only. The decoder context
/// keeps its codebooks, so playback can continue with the next frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Declared frame length disagrees with the payload size. Only ever
    /// reported through [`DecodeWarning::HeaderMismatch`]; decoding carries on.
    #[error("frame header declares {declared} bytes but payload holds {actual}")]
    HeaderMismatch { declared: u32, actual: usize },
    #[error(
        "strip {strip} covers ({top},{left})-({bottom},{right}); only full-frame strips are supported"
    )]
    UnsupportedStripRect {
        strip: usize,
        top: u16,
        left: u16,
        bottom: u16,
        right: u16,
    },
    #[error("strip {strip}: no valid strip tag found after {attempts} attempts")]
    StripResyncFailed { strip: usize, attempts: u32 },
    #[error("read of {needed} bytes at offset {offset} runs past the {available}-byte boundary")]
    TruncatedRead {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("strip {strip} exceeds the limit of {limit} chunks")]
    TooManyChunks { strip: usize, limit: u32 },
    #[error("frame declares {declared} strips, limit is {limit}")]
    TooManyStrips { declared: u16, limit: u16 },
    #[error("chunk {tag:#06x} declares length {length}, shorter than its header")]
    MalformedChunk { tag: u16, length: u16 },
    #[error("strip {strip} declares length {length}, shorter than its header")]
    MalformedStrip { strip: usize, length: u16 },
    #[error("unsupported output depth of {0} bits per pixel (expected 24 or 32)")]
    UnsupportedBitDepth(u32),
}

/// Non-fatal conditions noticed while decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeWarning {
    /// The frame header's 24-bit length field does not match the payload.
    HeaderMismatch { declared: u32, actual: usize },
    /// The frame declared more strips than the configured maximum.
    StripsClamped { declared: u16, used: u16 },
    /// A strip tag was unrecognised and the driver skipped ahead to find one.
    StripResynced { strip: usize, attempts: u32 },
}

impl DecodeWarning {
    /// The error this warning would be if the caller chose to treat it as fatal.
    pub fn as_error(&self) -> Option<DecodeError> {
        match *self {
            DecodeWarning::HeaderMismatch { declared, actual } => {
                Some(DecodeError::HeaderMismatch { declared, actual })
            }
            _ => None,
        }
    }
}
