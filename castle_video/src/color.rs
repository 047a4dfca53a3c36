// SPDX-License-Identifier: GPL-2.0-or-later
//
// Cinepak stores colour as four luma samples sharing one signed chroma pair.
// Reconstruction adds fixed per-channel chroma offsets to each luma sample and
// clamps through a lookup table, so blocks can be painted without math.

use crate::error::DecodeError;

const CLIP_BIAS: i32 = 512;
const CLIP_LEN: usize = 1024;

const fn build_clip_table() -> [u8; CLIP_LEN] {
    let mut table = [0u8; CLIP_LEN];
    let mut i = 0;
    while i < CLIP_LEN {
        let value = i as i32 - CLIP_BIAS;
        table[i] = if value < 0 {
            0
        } else if value > 255 {
            255
        } else {
            value as u8
        };
        i += 1;
    }
    table
}

/// Clamp lookup for sums in -512..=511, indexed by `sum + 512`.
static CLIP_TABLE: [u8; CLIP_LEN] = build_clip_table();

/// Clamp a luma + chroma sum to a channel value.
#[inline]
pub(crate) fn clip(sum: i32) -> u8 {
    let index = (sum + CLIP_BIAS).clamp(0, CLIP_LEN as i32 - 1);
    CLIP_TABLE[index as usize]
}

/// Output pixel layout, chosen once per decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Three bytes per pixel in B, G, R order.
    Bgr24,
    /// Four bytes per pixel: B, G, R, then a byte the decoder never writes.
    Bgrx32,
}

impl PixelFormat {
    pub fn from_bits_per_pixel(bits: u32) -> Result<Self, DecodeError> {
        match bits {
            24 => Ok(Self::Bgr24),
            32 => Ok(Self::Bgrx32),
            other => Err(DecodeError::UnsupportedBitDepth(other)),
        }
    }

    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgr24 => 3,
            Self::Bgrx32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn grey(level: u8) -> Self {
        Self {
            r: level,
            g: level,
            b: level,
        }
    }

    /// `0x00RRGGBB`.
    #[inline]
    pub const fn packed(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

/// Per-channel offsets derived from one chroma pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChromaOffsets {
    red: i32,
    green: i32,
    blue: i32,
}

impl ChromaOffsets {
    pub(crate) fn new(u: i8, v: i8) -> Self {
        let u = u as i32;
        let v = v as i32;
        Self {
            red: v << 1,
            green: -((u + 1) >> 1) - v,
            blue: u << 1,
        }
    }

    #[inline]
    pub(crate) fn apply(self, luma: u8) -> Rgb {
        let luma = luma as i32;
        Rgb {
            r: clip(luma + self.red),
            g: clip(luma + self.green),
            b: clip(luma + self.blue),
        }
    }
}
