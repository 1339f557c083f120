//! WebAssembly exports, exposed to JavaScript via wasm-bindgen.
//!
//! wasm32 has no thread pool, so the filter chain always runs on the
//! single-process path. Output is identical to a multi-worker run.

use wasm_bindgen::prelude::*;

use crate::filters::stencil::Narrowing;
use crate::image::{ChannelMode, Image};
use crate::pipeline::apply_filters_serial;

/// Apply a comma separated filter chain to a flat u8 image.
///
/// # Arguments
/// * `data` - Flat array of samples (length = width * height * channels)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `channels` - 1 for grayscale, 3 for RGB
/// * `filters` - e.g. `"blur,sharpen"`
/// * `saturate` - Clamp out-of-range sums instead of wrapping them
///
/// # Returns
/// Flat array of filtered samples
#[wasm_bindgen]
pub fn apply_filters_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    filters: &str,
    saturate: bool,
) -> Result<Vec<u8>, JsValue> {
    let mode = match channels {
        1 => ChannelMode::Gray,
        3 => ChannelMode::Rgb,
        n => return Err(JsValue::from_str(&format!("expected 1 or 3 channels, got {n}"))),
    };
    let mut img = Image::new(width, height, mode, 255, data.to_vec())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let names: Vec<&str> = filters
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();
    let narrowing = if saturate {
        Narrowing::Saturate
    } else {
        Narrowing::Wrap
    };

    apply_filters_serial(&mut img, &names, narrowing)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(img.into_samples())
}
