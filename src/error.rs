// error.rs — Error taxonomy for kernel loading, tone mapping and host buffers.
//
// Two layers:
//   ConfigError  — something wrong with the run parameters (kernel text,
//                  kernel dimension, gamma). Raised before any pixel is touched.
//   Error        — everything a public operation can fail with. Wraps
//                  ConfigError and adds the numeric hazard and bad host buffers.
//
// Out-of-range convolution taps are NOT errors; they are skipped silently.

use thiserror::Error;

/// Problems with the run configuration: kernel description or gamma.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Kernel dimension is zero or negative.
    #[error("kernel dimension must be positive (got {0})")]
    NonPositiveDimension(i64),

    /// Kernel dimension is even, so there is no center tap.
    #[error("kernel dimension must be odd (got {0})")]
    EvenDimension(usize),

    /// Token stream ran out before N² weights were read.
    #[error("kernel needs {expected} weights but only {found} were supplied")]
    MissingWeights { expected: usize, found: usize },

    /// Kernel dimension is so large that N² overflows.
    #[error("kernel dimension {0} is too large")]
    DimensionTooLarge(u64),

    /// A token could not be parsed as a finite float.
    #[error("kernel token {index} is not a finite number: {token:?}")]
    InvalidToken { index: usize, token: String },

    /// Dimension was inferred and the token count is not an odd perfect square.
    #[error("cannot infer a square odd kernel from {0} weights")]
    NotSquare(usize),

    /// No strictly positive entry, so the normalizing sum is zero.
    #[error("kernel has no positive weights to normalize by")]
    NoPositiveWeights,

    /// The positive weights sum past the largest finite f32.
    #[error("kernel positive weights overflow when summed")]
    WeightSumOverflow,

    /// Gamma exponent was not supplied.
    #[error("gamma exponent is required")]
    MissingGamma,

    /// Gamma exponent is NaN, infinite, or not above zero.
    #[error("gamma exponent must be finite and positive (got {0})")]
    InvalidGamma(f32),

    /// Convolution or local tone mapping was requested without a kernel.
    #[error("{0} needs a kernel but none was loaded")]
    MissingKernel(&'static str),
}

/// Errors returned by the public operations of this crate.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tone mapping reached a pixel whose luminance cannot be mapped: zero,
    /// negative, non-finite, or compressed past the f32 range.
    #[error("unusable luminance {luminance} at pixel ({x}, {y})")]
    NumericHazard { x: usize, y: usize, luminance: f32 },

    /// Host pixel buffer does not describe a valid image.
    #[error("invalid pixel buffer: {0}")]
    InvalidBuffer(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
