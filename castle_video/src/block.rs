// SPDX-License-Identifier: GPL-2.0-or-later

use byteorder::{ByteOrder, LittleEndian};

use crate::codebook::CodebookEntry;
use crate::color::PixelFormat;

/// Edge length of a coded block in pixels.
pub const BLOCK_SIZE: usize = 4;

/// Caller-owned pixel memory the decoder paints into.
///
/// Rows are `width * bytes_per_pixel` apart. Writes are clipped to the frame
/// width and to the shorter of the frame rectangle and the slice itself.
pub struct FrameTarget<'a> {
    buffer: &'a mut [u8],
    width: usize,
    format: PixelFormat,
    stride: usize,
    end: usize,
}

impl<'a> FrameTarget<'a> {
    pub fn new(buffer: &'a mut [u8], width: usize, height: usize, format: PixelFormat) -> Self {
        let stride = width.saturating_mul(format.bytes_per_pixel());
        let end = stride.saturating_mul(height).min(buffer.len());
        Self {
            buffer,
            width,
            format,
            stride,
            end,
        }
    }

    /// Paint a 4x4 block from one entry, each sample covering a 2x2 area.
    pub fn paint_v1(&mut self, x: usize, y: usize, entry: &CodebookEntry) {
        self.paint_block(x, y, |row, col| (entry, (row / 2) * 2 + col / 2));
    }

    /// Paint a 4x4 block from four entries, one per 2x2 quadrant in raster order.
    pub fn paint_v4(&mut self, x: usize, y: usize, quadrants: [&CodebookEntry; 4]) {
        self.paint_block(x, y, |row, col| {
            (
                quadrants[(row / 2) * 2 + col / 2],
                (row % 2) * 2 + col % 2,
            )
        });
    }

    /// Write the block at pixel (`x`, `y`), asking `sample` which entry and
    /// luma slot supplies each pixel. Rows that would end past the buffer are
    /// dropped along with everything below them.
    fn paint_block<'e>(
        &mut self,
        x: usize,
        y: usize,
        sample: impl Fn(usize, usize) -> (&'e CodebookEntry, usize),
    ) {
        if x >= self.width {
            return;
        }
        let columns = BLOCK_SIZE.min(self.width - x);
        let bpp = self.format.bytes_per_pixel();
        let write: fn(&mut [u8], &CodebookEntry, usize) = match self.format {
            PixelFormat::Bgr24 => write_bgr24,
            PixelFormat::Bgrx32 => write_bgrx32,
        };
        for row in 0..BLOCK_SIZE {
            let Some(start) = (y + row)
                .checked_mul(self.stride)
                .and_then(|offset| offset.checked_add(x * bpp))
            else {
                return;
            };
            let row_end = start + columns * bpp;
            if row_end > self.end {
                return;
            }
            let pixels = &mut self.buffer[start..row_end];
            for (col, pixel) in pixels.chunks_exact_mut(bpp).enumerate() {
                let (entry, slot) = sample(row, col);
                write(pixel, entry, slot);
            }
        }
    }
}

fn write_bgr24(pixel: &mut [u8], entry: &CodebookEntry, slot: usize) {
    let rgb = entry.rgb()[slot];
    pixel.copy_from_slice(&[rgb.b, rgb.g, rgb.r]);
}

/// Low three bytes of the packed colour; the fourth byte keeps whatever the
/// caller stored there.
fn write_bgrx32(pixel: &mut [u8], entry: &CodebookEntry, slot: usize) {
    LittleEndian::write_u24(&mut pixel[..3], entry.packed()[slot]);
}
