//! Flat 8-bit pixel buffer.
//!
//! ## Layout
//!
//! Samples are stored row-major, interleaved per pixel:
//! - **Gray**: 1 byte per pixel
//! - **RGB**: 3 bytes per pixel, red-green-blue order
//!
//! [`Image::view`] exposes the same bytes as a `(height, width, channels)`
//! array view for neighbourhood reads.

use ndarray::ArrayView3;

use crate::error::{Error, Result};

/// Channel layout of an [`Image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    Gray,
    Rgb,
}

impl ChannelMode {
    pub fn channels(self) -> usize {
        match self {
            ChannelMode::Gray => 1,
            ChannelMode::Rgb => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    mode: ChannelMode,
    max_value: u8,
    samples: Vec<u8>,
}

impl Image {
    /// Wrap an existing sample buffer.
    ///
    /// Fails with [`Error::Format`] for zero dimensions and with
    /// [`Error::Shape`] when `samples.len() != width * height * channels`.
    pub fn new(
        width: usize,
        height: usize,
        mode: ChannelMode,
        max_value: u8,
        samples: Vec<u8>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Format(format!(
                "image dimensions must be positive, got {width}x{height}"
            )));
        }
        // Validates the length invariant.
        ArrayView3::from_shape((height, width, mode.channels()), &samples[..])?;

        Ok(Self {
            width,
            height,
            mode,
            max_value,
            samples,
        })
    }

    /// Image where every sample has the same value.
    pub fn filled(width: usize, height: usize, mode: ChannelMode, value: u8) -> Result<Self> {
        let len = width * height * mode.channels();
        let mut samples = crate::error::try_alloc(len)?;
        samples.fill(value);
        Self::new(width, height, mode, 255, samples)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    pub fn channels(&self) -> usize {
        self.mode.channels()
    }

    pub fn max_value(&self) -> u8 {
        self.max_value
    }

    /// Number of pixels, i.e. the size of the flat index space.
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }

    /// Samples of pixel `idx`, one per channel.
    pub fn pixel(&self, idx: usize) -> &[u8] {
        let c = self.channels();
        &self.samples[idx * c..(idx + 1) * c]
    }

    /// Byte range covered by the pixel range `start..start + len`.
    pub fn sample_range(&self, start: usize, len: usize) -> std::ops::Range<usize> {
        let c = self.channels();
        start * c..(start + len) * c
    }

    /// `(height, width, channels)` view over the sample buffer.
    pub fn view(&self) -> Result<ArrayView3<'_, u8>> {
        Ok(ArrayView3::from_shape(
            (self.height, self.width, self.channels()),
            &self.samples[..],
        )?)
    }

    /// Swap in a whole new buffer, e.g. the output of a filter stage.
    ///
    /// The length must match the current buffer; a stage never writes a
    /// partial image.
    pub fn replace_samples(&mut self, samples: Vec<u8>) -> Result<Vec<u8>> {
        if samples.len() != self.samples.len() {
            return Err(Error::Format(format!(
                "replacement buffer has {} samples, expected {}",
                samples.len(),
                self.samples.len()
            )));
        }
        Ok(std::mem::replace(&mut self.samples, samples))
    }

    /// Mutable access for in-place overwrites of the same length, such as
    /// receiving a broadcast.
    pub(crate) fn samples_mut(&mut self) -> &mut [u8] {
        &mut self.samples
    }
}
