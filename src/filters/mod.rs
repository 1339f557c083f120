//! 3x3 convolution filters.
//!
//! ## Supported Formats
//!
//! | Format | Samples per pixel | Description |
//! |--------|-------------------|-------------|
//! | Gray8 | 1 | Single luminance channel, 0-255 |
//! | RGB8 | 3 | Red, green, blue, 0-255 |
//!
//! Each channel is filtered independently with the same kernel.
//!
//! ## Modules
//!
//! - **kernels**: the fixed kernel table (smooth, blur, sharpen, mean, emboss)
//! - **stencil**: evaluates a kernel over a block of pixels with border
//!   passthrough

pub mod kernels;
pub mod stencil;
