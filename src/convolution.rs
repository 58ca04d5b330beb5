// convolution.rs — Full 2D stencil convolution with a square Kernel.
//
// For output pixel (x, y) and every tap (dy, dx) in [-r, r]²:
//
//     acc += kernel.tap(dy, dx) * src(x + dx, y + dy)
//
// BORDER HANDLING: Skip.
// Taps that land outside the image are left out of the sum. Nothing is
// renormalized, so a border pixel only collects part of the kernel's mass.
// With a 3×3 box filter a corner pixel sees 4 of 9 taps and comes out at
// 4/9 of a flat input. That darkening at the edges is expected output.
//
// SOURCE / DESTINATION:
// Every read comes from `src`, every write goes to a separate `dst`. A
// pixel's neighbours are therefore always pre-pass values. Running the
// stencil in place would smear updated values into later pixels.
//
// The same stencil runs over two pixel types:
//   Rgba — color channels are clamped to [0, 1], alpha copied from the source.
//   f32  — no clamp; used for the log-luminance base layer in tonemap.rs.
//
// Rows of `dst` are disjoint, so `convolve_parallel` hands each row to a
// rayon worker. The result is bit-identical to the sequential pass because
// each pixel's accumulation order is the same.

use rayon::prelude::*;

use crate::color::Rgba;
use crate::image::{Image, Pixel};
use crate::kernel::Kernel;

/// A pixel type the stencil can accumulate.
pub trait Stencil: Pixel {
    /// The value accumulation starts from.
    fn zero() -> Self;

    /// `self + weight * sample`.
    fn add_weighted(self, sample: Self, weight: f32) -> Self;

    /// Turn a finished accumulator into the output pixel.
    /// `center` is the source pixel at the same position.
    fn finish(acc: Self, center: Self) -> Self;
}

impl Stencil for Rgba {
    #[inline]
    fn zero() -> Self {
        Rgba::new(0.0, 0.0, 0.0, 0.0)
    }

    #[inline]
    fn add_weighted(self, s: Self, w: f32) -> Self {
        Rgba::new(self.r + w * s.r, self.g + w * s.g, self.b + w * s.b, self.a)
    }

    #[inline]
    fn finish(acc: Self, center: Self) -> Self {
        Rgba { a: center.a, ..acc }.clamp_rgb()
    }
}

impl Stencil for f32 {
    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn add_weighted(self, s: Self, w: f32) -> Self {
        self + w * s
    }

    #[inline]
    fn finish(acc: Self, _center: Self) -> Self {
        acc
    }
}

/// Convolve `src` with `kernel`, returning a new image.
pub fn convolve<T: Stencil>(src: &Image<T>, kernel: &Kernel) -> Image<T> {
    let mut dst = Image::new(src.width(), src.height());
    convolve_into(src, kernel, &mut dst);
    dst
}

/// Convolve `src` with `kernel` into a caller-owned `dst`.
///
/// Lets repeated passes reuse one scratch buffer instead of allocating.
///
/// # Panics
/// Panics if `dst` has a different shape from `src`.
pub fn convolve_into<T: Stencil>(src: &Image<T>, kernel: &Kernel, dst: &mut Image<T>) {
    assert!(
        src.same_shape(dst),
        "convolve_into: destination {}×{} does not match source {}×{}",
        dst.width(),
        dst.height(),
        src.width(),
        src.height(),
    );
    for (y, row) in dst.rows_mut().enumerate() {
        convolve_row(src, kernel, y, row);
    }
}

/// Row-parallel convolution. Same output as [`convolve`].
pub fn convolve_parallel<T: Stencil>(src: &Image<T>, kernel: &Kernel) -> Image<T> {
    let w = src.width();
    let mut dst = Image::new(w, src.height());
    if w == 0 {
        return dst;
    }
    dst.as_mut_slice()
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row)| convolve_row(src, kernel, y, row));
    dst
}

/// Fill output row `y` from `src`.
///
/// Pixels whose whole window is inside the image take the unchecked path;
/// the rest test every tap and skip the ones that fall outside.
fn convolve_row<T: Stencil>(src: &Image<T>, kernel: &Kernel, y: usize, out: &mut [T]) {
    let w = src.width();
    let h = src.height();
    let r = kernel.radius();
    let n = kernel.size();
    let weights = kernel.weights();
    let row_interior = y >= r && y + r < h;

    for (x, dst_px) in out.iter_mut().enumerate() {
        let mut acc = T::zero();

        if row_interior && x >= r && x + r < w {
            // SAFETY: y-r..=y+r and x-r..=x+r are all inside the image.
            unsafe {
                for ky in 0..n {
                    let sy = y + ky - r;
                    for kx in 0..n {
                        let sx = x + kx - r;
                        acc = acc.add_weighted(src.get_unchecked(sx, sy), weights[ky * n + kx]);
                    }
                }
            }
        } else {
            for (dy, dx, weight) in kernel.taps() {
                let sx = x as isize + dx;
                let sy = y as isize + dy;
                if src.contains(sx, sy) {
                    acc = acc.add_weighted(src.get(sx as usize, sy as usize), weight);
                }
            }
        }

        // SAFETY: x < out.len() == w and y < h.
        let center = unsafe { src.get_unchecked(x, y) };
        *dst_px = T::finish(acc, center);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: usize, h: usize) -> Image<Rgba> {
        Image::from_fn(w, h, |x, y| {
            Rgba::opaque(x as f32 / w as f32, y as f32 / h as f32, 0.5)
        })
    }

    #[test]
    fn test_identity_kernel() {
        let img = gradient(5, 4);
        let out = convolve(&img, &Kernel::identity(3).unwrap());
        for (x, y, v) in out.pixels() {
            let e = img.get(x, y);
            assert!((v.r - e.r).abs() < 1e-6, "identity mismatch at ({x}, {y})");
            assert!((v.g - e.g).abs() < 1e-6);
            assert!((v.b - e.b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_one_by_one_kernel_is_identity() {
        let img = gradient(4, 4);
        let k = Kernel::parse("1", 1).unwrap();
        assert_eq!(convolve(&img, &k), img);
    }

    #[test]
    fn test_box_filter_center_mean() {
        let mut img = Image::filled(3, 3, Rgba::gray(0.0));
        img.set(1, 1, Rgba::gray(0.9));
        let out = convolve(&img, &Kernel::box_filter(3).unwrap());
        assert!((out.get(1, 1).r - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_skip_border_darkens_corner() {
        // Flat 0.5 with a 3×3 box: corner sees 4 taps, edge 6, center 9.
        let img = Image::filled(3, 3, Rgba::gray(0.5));
        let out = convolve(&img, &Kernel::box_filter(3).unwrap());
        assert!((out.get(0, 0).r - 0.5 * 4.0 / 9.0).abs() < 1e-6);
        assert!((out.get(1, 0).r - 0.5 * 6.0 / 9.0).abs() < 1e-6);
        assert!((out.get(1, 1).r - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_reads_pre_pass_values() {
        // Single bright pixel spreads to its neighbours only once.
        // If the pass wrote in place, (2,0) would pick up (1,0)'s new value.
        let mut img = Image::filled(3, 1, Rgba::gray(0.0));
        img.set(0, 0, Rgba::gray(0.9));
        // Raw middle column becomes the middle row after reflection.
        let k = Kernel::parse("0 1 0 0 1 0 0 1 0", 3).unwrap();
        let out = convolve(&img, &k);
        assert!((out.get(1, 0).r - 0.3).abs() < 1e-6);
        assert_eq!(out.get(2, 0).r, 0.0);
    }

    #[test]
    fn test_output_clamped() {
        let img = Image::filled(3, 3, Rgba::opaque(1.0, 0.0, 0.0));
        // Sharpen amplifies; the edge-detector goes negative.
        let sharpen = Kernel::parse("0 -1 0 -1 5 -1 0 -1 0", 3).unwrap();
        let mut hot = img.clone();
        hot.set(1, 1, Rgba::opaque(1.0, 1.0, 1.0));
        let out = convolve(&hot, &sharpen);
        for (_, _, v) in out.pixels() {
            for c in [v.r, v.g, v.b] {
                assert!((0.0..=1.0).contains(&c), "channel {c} escaped [0,1]");
            }
        }
    }

    #[test]
    fn test_alpha_untouched() {
        let img = Image::filled(4, 4, Rgba::new(0.5, 0.5, 0.5, 0.25));
        let out = convolve(&img, &Kernel::box_filter(3).unwrap());
        for (_, _, v) in out.pixels() {
            assert_eq!(v.a, 0.25);
        }
    }

    #[test]
    fn test_asymmetric_kernel_direction() {
        // Raw row-major kernel has weight only at (row 1, col 2); reflection
        // moves it to (row 2, col 1): the tap one row below center.
        let k = Kernel::parse("0 0 0 0 0 1 0 0 0", 3).unwrap();
        assert_eq!(k.tap(1, 0), 1.0);
        let img = Image::from_fn(1, 3, |_, y| Rgba::gray(y as f32 * 0.25));
        let out = convolve(&img, &k);
        assert!((out.get(0, 0).r - 0.25).abs() < 1e-6);
        assert!((out.get(0, 1).r - 0.5).abs() < 1e-6);
        assert_eq!(out.get(0, 2).r, 0.0);
    }

    #[test]
    fn test_scalar_plane_not_clamped() {
        let img = Image::filled(3, 3, -2.0f32);
        let out = convolve(&img, &Kernel::box_filter(3).unwrap());
        assert!((out.get(1, 1) + 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let img = gradient(17, 11);
        let k = Kernel::parse("1 2 3 4 5 4 3 2 1", 3).unwrap();
        assert_eq!(convolve_parallel(&img, &k), convolve(&img, &k));
    }

    #[test]
    fn test_kernel_larger_than_image() {
        let img = Image::filled(2, 2, Rgba::gray(1.0));
        let out = convolve(&img, &Kernel::box_filter(7).unwrap());
        // Every pixel sees all four image pixels: 4/49.
        for (_, _, v) in out.pixels() {
            assert!((v.r - 4.0 / 49.0).abs() < 1e-6);
        }
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn test_convolve_into_shape_mismatch() {
        let src: Image<Rgba> = Image::new(3, 3);
        let mut dst: Image<Rgba> = Image::new(2, 3);
        convolve_into(&src, &Kernel::identity(1).unwrap(), &mut dst);
    }
}
