// convert.rs — Host pixel buffers to and from Image<Rgba>.
//
// Decoders hand over interleaved float samples with 3 (RGB) or 4 (RGBA)
// channels per pixel. Everything downstream works on 4 channels, so loading
// collapses both to Rgba and synthesizes alpha = 1.0. Source alpha is
// dropped.
//
// Origin: image files usually store the top row first; GL-style framebuffers
// store the bottom row first. Loading with `Origin::BottomLeft` flips the
// rows so that row 0 of the Image is always the top of the picture, and
// exporting with the same origin flips them back.
//
// Export reuses the Rgba memory layout directly: `Image<Rgba>` is a
// `[Rgba]`, and bytemuck reinterprets that as `[f32]` with no copy.

use crate::color::Rgba;
use crate::error::{Error, Result};
use crate::image::Image;

/// Which row a flat buffer stores first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    /// First row in memory is the top of the picture.
    #[default]
    TopLeft,
    /// First row in memory is the bottom of the picture.
    BottomLeft,
}

impl Origin {
    /// Source row for image row `y` in an image of height `h`.
    #[inline]
    fn source_row(self, y: usize, h: usize) -> usize {
        match self {
            Origin::TopLeft => y,
            Origin::BottomLeft => h - 1 - y,
        }
    }
}

/// Build an RGBA image from interleaved float samples.
///
/// `channels` must be at least 3; only the first three samples of each pixel
/// are read.
pub fn from_interleaved(
    width: usize,
    height: usize,
    channels: usize,
    data: &[f32],
    origin: Origin,
) -> Result<Image<Rgba>> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidBuffer(format!("empty image {width}x{height}")));
    }
    if channels < 3 {
        return Err(Error::InvalidBuffer(format!("need at least 3 channels, got {channels}")));
    }
    let expected = width * height * channels;
    if data.len() != expected {
        return Err(Error::InvalidBuffer(format!(
            "{width}x{height}x{channels} needs {expected} samples, got {}",
            data.len()
        )));
    }

    let row_len = width * channels;
    Ok(Image::from_fn(width, height, |x, y| {
        let start = origin.source_row(y, height) * row_len + x * channels;
        let s = &data[start..start + 3];
        Rgba::opaque(s[0], s[1], s[2])
    }))
}

/// Borrow the image as interleaved RGBA floats, top row first.
pub fn as_f32_slice(img: &Image<Rgba>) -> &[f32] {
    bytemuck::cast_slice(img.as_slice())
}

/// Copy the image out as interleaved RGBA floats in the given row order.
pub fn to_interleaved_rgba(img: &Image<Rgba>, origin: Origin) -> Vec<f32> {
    match origin {
        Origin::TopLeft => as_f32_slice(img).to_vec(),
        Origin::BottomLeft => {
            let mut out = Vec::with_capacity(img.len() * 4);
            for y in (0..img.height()).rev() {
                out.extend_from_slice(bytemuck::cast_slice(img.row(y)));
            }
            out
        }
    }
}

/// Quantize to interleaved 8-bit RGBA. Channels are clamped to [0, 1] first.
pub fn to_rgba8(img: &Image<Rgba>, origin: Origin) -> Vec<u8> {
    to_interleaved_rgba(img, origin)
        .into_iter()
        .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_gets_opaque_alpha() {
        let data = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let img = from_interleaved(2, 1, 3, &data, Origin::TopLeft).unwrap();
        assert_eq!(img.get(0, 0), Rgba::opaque(0.1, 0.2, 0.3));
        assert_eq!(img.get(1, 0), Rgba::opaque(0.4, 0.5, 0.6));
    }

    #[test]
    fn test_rgba_source_alpha_replaced() {
        let data = [0.1, 0.2, 0.3, 0.0];
        let img = from_interleaved(1, 1, 4, &data, Origin::TopLeft).unwrap();
        assert_eq!(img.get(0, 0).a, 1.0);
    }

    #[test]
    fn test_bottom_left_flips_rows() {
        // Memory: bottom row first.
        let data = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let img = from_interleaved(1, 2, 3, &data, Origin::BottomLeft).unwrap();
        assert_eq!(img.get(0, 0), Rgba::gray(1.0));
        assert_eq!(img.get(0, 1), Rgba::gray(0.0));

        let back = to_interleaved_rgba(&img, Origin::BottomLeft);
        assert_eq!(back, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_rejects_bad_buffers() {
        assert!(matches!(
            from_interleaved(0, 1, 3, &[], Origin::TopLeft),
            Err(Error::InvalidBuffer(_))
        ));
        assert!(matches!(
            from_interleaved(1, 1, 2, &[0.0, 0.0], Origin::TopLeft),
            Err(Error::InvalidBuffer(_))
        ));
        assert!(matches!(
            from_interleaved(2, 2, 3, &[0.0; 11], Origin::TopLeft),
            Err(Error::InvalidBuffer(_))
        ));
    }

    #[test]
    fn test_to_rgba8_clamps() {
        let img = Image::from_vec(2, 1, vec![Rgba::opaque(-0.5, 0.5, 2.0), Rgba::gray(1.0)]);
        assert_eq!(to_rgba8(&img, Origin::TopLeft), vec![0, 128, 255, 255, 255, 255, 255, 255]);
    }
}
