// spatial_tonemap: convolution and tone reproduction for HDR float images
//
// Turns a high-dynamic-range RGB(A) float buffer into a displayable one:
//   - 2D convolution with an arbitrary odd N×N kernel read from text
//   - logarithmic (power-law) luminance compression that keeps color ratios
//
// Decoding, encoding and display belong to the host (see src/bin/tonemap.rs).

pub mod error;
pub mod color;
pub mod image;
pub mod kernel;
pub mod convolution;
pub mod tonemap;
pub mod buffer;
pub mod convert;
pub mod pipeline;

pub use crate::buffer::{BufferCopy, ImageBuffers};
pub use crate::color::Rgba;
pub use crate::error::{ConfigError, Error, Result};
pub use crate::image::Image;
pub use crate::kernel::Kernel;
pub use crate::pipeline::{Pipeline, PipelineConfig, Stage};
pub use crate::tonemap::{BlackPixelPolicy, ToneMapMode, ToneMapper};
