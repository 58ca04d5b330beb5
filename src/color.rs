// color.rs — The RGBA float pixel and the luminance estimate used by tone mapping.
//
// Rgba is `#[repr(C)]` and derives bytemuck's Pod/Zeroable, so an
// `Image<Rgba>` buffer can be reinterpreted as a flat `&[f32]` of
// interleaved RGBA samples without copying (see convert.rs). That is
// the layout a float image encoder or a GL upload expects.

use bytemuck::{Pod, Zeroable};

/// Red weight of the luminance estimate.
pub const LUMA_RED: f32 = 20.0;
/// Green weight of the luminance estimate.
pub const LUMA_GREEN: f32 = 40.0;
/// Blue weight of the luminance estimate.
pub const LUMA_BLUE: f32 = 1.0;
/// Sum of the three weights; the estimate divides by this.
pub const LUMA_TOTAL: f32 = 61.0;

/// One pixel: four float channels, conventionally in [0, 1].
///
/// Alpha is carried but never processed; loaders set it to 1.0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Rgba {
    /// Opaque black.
    fn default() -> Self {
        Rgba::opaque(0.0, 0.0, 0.0)
    }
}

impl Rgba {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Rgba { r, g, b, a }
    }

    /// Color with alpha fixed at 1.0.
    #[inline]
    pub const fn opaque(r: f32, g: f32, b: f32) -> Self {
        Rgba { r, g, b, a: 1.0 }
    }

    /// Uniform gray, opaque.
    #[inline]
    pub const fn gray(v: f32) -> Self {
        Rgba::opaque(v, v, v)
    }

    /// World luminance `Lw = (20·r + 40·g + b) / 61`.
    ///
    /// These are not Rec.601/709 luma weights. Blue barely contributes.
    #[inline]
    pub fn luminance(&self) -> f32 {
        (LUMA_RED * self.r + LUMA_GREEN * self.g + LUMA_BLUE * self.b) / LUMA_TOTAL
    }

    /// Multiply the color channels by `factor`, leaving alpha alone.
    #[inline]
    pub fn scale_rgb(self, factor: f32) -> Self {
        Rgba {
            r: self.r * factor,
            g: self.g * factor,
            b: self.b * factor,
            a: self.a,
        }
    }

    /// Clamp the color channels to [0, 1], leaving alpha alone.
    #[inline]
    pub fn clamp_rgb(self) -> Self {
        // NaN collapses to 0; f32::clamp alone would let it through.
        let c = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Rgba {
            r: c(self.r),
            g: c(self.g),
            b: c(self.b),
            a: self.a,
        }
    }
}
