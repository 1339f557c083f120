//! 3x3 stencil evaluation over a block of flattened pixel indices.
//!
//! Interior pixels take the weighted sum of their 8 neighbours and
//! themselves, channel by channel. Pixels on the outermost rows and columns
//! are copied through unchanged.
//!
//! All reads go to the source image as it stood before the stage began;
//! output is written to a separate buffer.

use crate::error::{Error, Result};
use crate::filters::kernels::Kernel;
use crate::image::Image;
use crate::partition::Block;

/// How a floating-point accumulator becomes an 8-bit sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Narrowing {
    /// Truncate toward zero and keep the low 8 bits, so out-of-range sums
    /// wrap around (-30 becomes 226). Bit-compatible with the reference
    /// filters.
    #[default]
    Wrap,
    /// Truncate toward zero, then clamp to `0..=255`.
    Saturate,
}

impl Narrowing {
    #[inline]
    pub fn narrow(self, acc: f32) -> u8 {
        let truncated = acc as i32;
        match self {
            Narrowing::Wrap => truncated as u8,
            Narrowing::Saturate => truncated.clamp(0, 255) as u8,
        }
    }
}

/// `(row, col)` of flattened pixel index `idx`.
#[inline]
pub fn pixel_coord(idx: usize, width: usize) -> (usize, usize) {
    (idx / width, idx % width)
}

/// True when the pixel has a full 3x3 neighbourhood inside the image.
#[inline]
pub fn is_interior(row: usize, col: usize, width: usize, height: usize) -> bool {
    row > 0 && row + 1 < height && col > 0 && col + 1 < width
}

/// Filter the pixels of `block`, returning `block.len * channels` samples.
pub fn evaluate(
    source: &Image,
    block: &Block,
    kernel: &Kernel,
    narrowing: Narrowing,
) -> Result<Vec<u8>> {
    let mut out = crate::error::try_alloc(block.len * source.channels())?;
    evaluate_into(source, block, kernel, narrowing, &mut out)?;
    Ok(out)
}

/// Like [`evaluate`], writing into a caller-owned scratch buffer.
pub fn evaluate_into(
    source: &Image,
    block: &Block,
    kernel: &Kernel,
    narrowing: Narrowing,
    out: &mut [u8],
) -> Result<()> {
    let (width, height, channels) = (source.width(), source.height(), source.channels());

    if block.end() > source.pixel_count() {
        return Err(Error::InvalidPartition(format!(
            "block {}..{} of rank {} exceeds {} pixels",
            block.start,
            block.end(),
            block.rank,
            source.pixel_count()
        )));
    }
    if out.len() != block.len * channels {
        return Err(Error::InvalidPartition(format!(
            "output buffer holds {} samples, block of rank {} needs {}",
            out.len(),
            block.rank,
            block.len * channels
        )));
    }

    let input = source.view()?;

    for (offset, out_px) in out.chunks_exact_mut(channels).enumerate() {
        let idx = block.start + offset;
        let (row, col) = pixel_coord(idx, width);

        if !is_interior(row, col, width, height) {
            out_px.copy_from_slice(source.pixel(idx));
            continue;
        }

        for (c, sample) in out_px.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for dr in -1isize..=1 {
                let r = row.wrapping_add_signed(dr);
                for dc in -1isize..=1 {
                    let x = col.wrapping_add_signed(dc);
                    acc += kernel.weight(dr, dc) * input[[r, x, c]] as f32;
                }
            }
            *sample = narrowing.narrow(acc);
        }
    }

    Ok(())
}

/// Filter the whole image as a single block.
pub fn evaluate_image(source: &Image, kernel: &Kernel, narrowing: Narrowing) -> Result<Vec<u8>> {
    let whole = Block {
        rank: 0,
        start: 0,
        len: source.pixel_count(),
    };
    evaluate(source, &whole, kernel, narrowing)
}
