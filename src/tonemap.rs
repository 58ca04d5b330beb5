// tonemap.rs — Logarithmic tone reproduction.
//
// GLOBAL operator, per pixel:
//
//   Lw     = (20·r + 40·g + b) / 61          world luminance
//   log Ld = γ · ln(Lw)                      compress in log space
//   Ld     = exp(log Ld)                     i.e. Lw^γ
//   c'     = (Ld / Lw) · c    for c in r,g,b
//
// Every channel is scaled by the same factor, so r:g:b ratios survive.
// γ < 1 compresses dynamic range, γ > 1 expands it, γ = 1 is the identity.
// The output is NOT clamped; values above 1 are left for the sink.
//
// LOCAL operator (convolved base layer):
//
//   B      = kernel ⊛ ln(Lw)                 blurred log luminance
//   log Ld = γ · B + (ln(Lw) − B)
//
// Only the low-frequency base is compressed; the detail layer ln(Lw) − B
// passes through at full strength. The blur uses the same skip-border
// stencil as color convolution, without the clamp.
//
// BLACK PIXELS:
// ln(Lw) is undefined for Lw ≤ 0 and useless for non-finite Lw. With γ > 1
// a very bright Lw can also compress past f32::MAX, and inf · 0 in a dark
// channel would be NaN. What happens to any of these pixels is set by
// BlackPixelPolicy. Under `Error` the
// whole image is checked before anything is written, so a failed pass
// leaves the buffer untouched.

use log::{trace, warn};

use crate::color::Rgba;
use crate::convolution::convolve;
use crate::error::{ConfigError, Error, Result};
use crate::image::Image;
use crate::kernel::Kernel;

/// Luminance floor used by [`BlackPixelPolicy::default_epsilon`] and for
/// pass-through pixels in the local base layer.
pub const DEFAULT_EPSILON: f32 = 1e-4;

/// What to do with a pixel whose luminance has no usable logarithm.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BlackPixelPolicy {
    /// Leave the pixel exactly as it was.
    #[default]
    PassThrough,
    /// Map the pixel as if its Lw were this value.
    /// Non-finite Lw still passes through.
    Epsilon(f32),
    /// Fail the pass with [`Error::NumericHazard`].
    Error,
}

impl BlackPixelPolicy {
    pub fn default_epsilon() -> Self {
        BlackPixelPolicy::Epsilon(DEFAULT_EPSILON)
    }
}

/// Global or locally adaptive operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToneMapMode {
    /// Same curve for every pixel.
    #[default]
    Global,
    /// Compress a blurred log-luminance base layer, keep local detail.
    Local,
}

/// Counts from one tone-mapping pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToneMapStats {
    /// Pixels visited.
    pub pixels: usize,
    /// Pixels whose luminance needed the black-pixel policy.
    pub black_pixels: usize,
}

impl ToneMapStats {
    fn count(resolved: &[Resolved]) -> Self {
        ToneMapStats {
            pixels: resolved.len(),
            black_pixels: resolved.iter().filter(|r| r.is_black()).count(),
        }
    }
}

/// Power-law luminance compressor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneMapper {
    gamma: f32,
    policy: BlackPixelPolicy,
}

/// How one pixel's luminance resolved under the policy.
#[derive(Clone, Copy)]
enum Resolved {
    /// Map with this Lw.
    Map(f32),
    /// Map with this Lw, which the epsilon floor replaced.
    Floored(f32),
    /// Leave the pixel alone.
    Skip,
}

impl Resolved {
    /// Lw to map with, if any.
    #[inline]
    fn luminance(self) -> Option<f32> {
        match self {
            Resolved::Map(lw) | Resolved::Floored(lw) => Some(lw),
            Resolved::Skip => None,
        }
    }

    #[inline]
    fn is_black(self) -> bool {
        !matches!(self, Resolved::Map(_))
    }
}

impl ToneMapper {
    /// Create a mapper with the given gamma exponent and the pass-through policy.
    pub fn new(gamma: f32) -> std::result::Result<Self, ConfigError> {
        if !gamma.is_finite() || gamma <= 0.0 {
            return Err(ConfigError::InvalidGamma(gamma));
        }
        Ok(ToneMapper { gamma, policy: BlackPixelPolicy::default() })
    }

    /// Like [`ToneMapper::new`], but reports a missing gamma.
    pub fn from_option(gamma: Option<f32>) -> std::result::Result<Self, ConfigError> {
        Self::new(gamma.ok_or(ConfigError::MissingGamma)?)
    }

    /// Replace the black-pixel policy.
    pub fn with_policy(mut self, policy: BlackPixelPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    #[inline]
    pub fn policy(&self) -> BlackPixelPolicy {
        self.policy
    }

    /// Display luminance `Ld = exp(γ · ln(Lw))` for positive `lw`.
    #[inline]
    pub fn compress(&self, lw: f32) -> f32 {
        (self.gamma * lw.ln()).exp()
    }

    /// Map a single pixel with the global operator.
    ///
    /// Returns the pixel unchanged when its luminance is unusable and the
    /// policy allows it. Under the `Error` policy the `Err` carries that
    /// luminance.
    pub fn map_pixel(&self, px: Rgba) -> std::result::Result<Rgba, f32> {
        let Some(lw) = self.resolve(px.luminance())?.luminance() else {
            return Ok(px);
        };
        let scale = self.compress(lw) / lw;
        if scale.is_finite() {
            Ok(px.scale_rgb(scale))
        } else if matches!(self.policy, BlackPixelPolicy::Error) {
            Err(lw)
        } else {
            Ok(px)
        }
    }

    /// Tone map `img` in place with the global operator.
    pub fn apply(&self, img: &mut Image<Rgba>) -> Result<ToneMapStats> {
        let mut resolved = self.resolve_all(img)?;
        let scales = self.scale_factors(img, &mut resolved, |_, lw| self.compress(lw))?;
        for (px, scale) in img.pixels_mut().zip(scales) {
            if let Some(s) = scale {
                *px = px.scale_rgb(s);
            }
        }

        let stats = ToneMapStats::count(&resolved);
        self.report(&stats);
        Ok(stats)
    }

    /// Tone map `img` in place with the local operator, blurring log
    /// luminance with `kernel`.
    pub fn apply_local(&self, img: &mut Image<Rgba>, kernel: &Kernel) -> Result<ToneMapStats> {
        let mut resolved = self.resolve_all(img)?;
        let (w, h) = img.dimensions();

        let log_lw = Image::from_vec(
            w,
            h,
            resolved
                .iter()
                .map(|r| r.luminance().unwrap_or(DEFAULT_EPSILON).ln())
                .collect(),
        );
        let base = convolve(&log_lw, kernel);
        trace!("local tone map: base layer {w}x{h} built with {0}x{0} kernel", kernel.size());

        let (log_w, b) = (log_lw.as_slice(), base.as_slice());
        let scales = self.scale_factors(img, &mut resolved, |i, _| {
            (self.gamma * b[i] + (log_w[i] - b[i])).exp()
        })?;
        for (px, scale) in img.pixels_mut().zip(scales) {
            if let Some(s) = scale {
                *px = px.scale_rgb(s);
            }
        }

        let stats = ToneMapStats::count(&resolved);
        self.report(&stats);
        Ok(stats)
    }

    /// Resolve every pixel first, so an `Error` policy fails before any write.
    fn resolve_all(&self, img: &Image<Rgba>) -> Result<Vec<Resolved>> {
        img.pixels()
            .map(|(x, y, px)| {
                self.resolve(px.luminance())
                    .map_err(|luminance| Error::NumericHazard { x, y, luminance })
            })
            .collect()
    }

    /// Per-pixel factor `Ld / Lw`, `None` where the pixel stays as it is.
    ///
    /// `ld(i, lw)` gives the display luminance of pixel `i`. When that
    /// overflows (γ > 1 on a very bright pixel) the policy decides, as for
    /// a black pixel: `Error` fails, anything else skips the pixel. Nothing
    /// is written here, so a failure still leaves the image untouched.
    fn scale_factors(
        &self,
        img: &Image<Rgba>,
        resolved: &mut [Resolved],
        ld: impl Fn(usize, f32) -> f32,
    ) -> Result<Vec<Option<f32>>> {
        let w = img.width();
        resolved
            .iter_mut()
            .enumerate()
            .map(|(i, r)| {
                let Some(lw) = r.luminance() else {
                    return Ok(None);
                };
                let scale = ld(i, lw) / lw;
                if scale.is_finite() {
                    return Ok(Some(scale));
                }
                match self.policy {
                    BlackPixelPolicy::Error => {
                        Err(Error::NumericHazard { x: i % w, y: i / w, luminance: lw })
                    }
                    _ => {
                        *r = Resolved::Skip;
                        Ok(None)
                    }
                }
            })
            .collect()
    }

    fn resolve(&self, lw: f32) -> std::result::Result<Resolved, f32> {
        if lw > 0.0 && lw.is_finite() {
            return Ok(Resolved::Map(lw));
        }
        match self.policy {
            BlackPixelPolicy::PassThrough => Ok(Resolved::Skip),
            BlackPixelPolicy::Epsilon(eps) if lw.is_finite() => {
                Ok(Resolved::Floored(lw.max(eps.max(f32::MIN_POSITIVE))))
            }
            BlackPixelPolicy::Epsilon(_) => Ok(Resolved::Skip),
            BlackPixelPolicy::Error => Err(lw),
        }
    }

    fn report(&self, stats: &ToneMapStats) {
        if stats.black_pixels > 0 {
            warn!(
                "tone map (gamma {}): {} of {} pixels had unusable luminance, handled by {:?}",
                self.gamma, stats.black_pixels, stats.pixels, self.policy,
            );
        }
    }
}

/// Tone map `img` in place with the global operator and pass-through policy.
pub fn tonemap(img: &mut Image<Rgba>, gamma: f32) -> Result<ToneMapStats> {
    ToneMapper::new(gamma)?.apply(img)
}
