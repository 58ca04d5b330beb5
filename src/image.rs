// image.rs — Runtime-sized image container, generic over pixel type.
//
// One owned, contiguous, row-major buffer. Pixel (x, y) lives at index
// `y * width + x`; the index math stays inside this type, so callers never
// build rows out of pointer offsets.
//
// Two pixel types matter in this crate:
//   Image<Rgba> — the color buffers the pipeline reads and writes.
//   Image<f32>  — scalar planes (log-luminance and its blurred base layer
//                 in local tone mapping).
//
// NEW RUST CONCEPTS:
// - Trait definition + blanket bounds (Pixel)
// - `impl Iterator` return types that hide the concrete adapter chain
// - `chunks_exact_mut` for handing out disjoint mutable rows

use std::fmt;

use crate::color::Rgba;

// ---------------------------------------------------------------------------
// Pixel Trait
// ---------------------------------------------------------------------------
// Copy + Default lets Image::new fill a buffer; Send + Sync lets rows of a
// destination image be written from worker threads during convolution.

/// Trait for types that can serve as pixel values in an Image.
pub trait Pixel: Copy + Default + Send + Sync + 'static {}

impl Pixel for f32 {}
impl Pixel for Rgba {}

// ---------------------------------------------------------------------------
// Image<T>
// ---------------------------------------------------------------------------

/// A 2D image with runtime dimensions, generic over pixel type `T`.
#[derive(Clone, PartialEq)]
pub struct Image<T: Pixel> {
    /// Pixel data in row-major order. Length = width * height.
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Pixel> Image<T> {
    // --- Constructors ---

    /// Create an image filled with `T::default()`.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::default())
    }

    /// Create an image with every pixel set to `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Image {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    /// Create an image from an existing row-major pixel vector.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "data length ({}) must equal width * height ({})",
            data.len(),
            width * height,
        );
        Image { data, width, height }
    }

    /// Build an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Image { data, width, height }
    }

    // --- Accessors ---

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// True when `other` has the same width and height.
    #[inline]
    pub fn same_shape<U: Pixel>(&self, other: &Image<U>) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// True when `(x, y)` is a valid signed coordinate.
    #[inline]
    pub fn contains(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Get the pixel value at (x, y). x is column, y is row.
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.bounds_check(x, y);
        self.data[y * self.width + x]
    }

    /// Get pixel value without bounds checking.
    ///
    /// # Safety
    /// Caller must guarantee x < width and y < height.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, x: usize, y: usize) -> T {
        debug_assert!(x < self.width && y < self.height,
            "get_unchecked({x},{y}) out of bounds for {}x{}", self.width, self.height);
        *self.data.get_unchecked(y * self.width + x)
    }

    /// Get a mutable reference to the pixel at (x, y).
    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        self.bounds_check(x, y);
        let idx = y * self.width + x;
        &mut self.data[idx]
    }

    /// Set the pixel at (x, y) to the given value.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        *self.get_mut(x, y) = value;
    }

    /// Borrow a single row as a slice.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    /// Iterate over disjoint mutable rows, top to bottom.
    ///
    /// Each row is a separate `&mut [T]`, so rows can be filled independently.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [T]> + '_ {
        // chunks_exact_mut(0) panics; a zero-width image has an empty buffer anyway.
        self.data.chunks_exact_mut(self.width.max(1))
    }

    /// Iterate over all pixels as `(x, y, value)` tuples.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        let w = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i % w, i / w, v))
    }

    /// Mutable iteration over every pixel in row-major order.
    pub fn pixels_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.data.iter_mut()
    }

    /// Apply `f` to every pixel, producing a new image of the same shape.
    pub fn map<U: Pixel, F: FnMut(T) -> U>(&self, f: F) -> Image<U> {
        Image {
            data: self.data.iter().copied().map(f).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Overwrite this image's pixels with `src`'s.
    ///
    /// # Panics
    /// Panics if the shapes differ.
    pub fn copy_from(&mut self, src: &Image<T>) {
        assert!(
            self.same_shape(src),
            "copy_from: shape mismatch {}×{} vs {}×{}",
            self.width,
            self.height,
            src.width,
            src.height,
        );
        self.data.copy_from_slice(&src.data);
    }

    /// Access the underlying data as a flat row-major slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable access to the underlying data.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // --- Internal helpers ---

    #[inline]
    fn bounds_check(&self, x: usize, y: usize) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for image {}×{}",
            self.width,
            self.height,
        );
    }
}

// Debug formatting — useful for small images in tests.
impl<T: Pixel + fmt::Debug> fmt::Debug for Image<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Image<{}> {{ {}×{} }}",
            std::any::type_name::<T>(),
            self.width,
            self.height,
        )?;
        for y in 0..self.height.min(8) {
            write!(f, "  row {y}: [")?;
            for x in 0..self.width.min(8) {
                if x > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?}", self.get(x, y))?;
            }
            if self.width > 8 {
                write!(f, ", ...")?;
            }
            writeln!(f, "]")?;
        }
        if self.height > 8 {
            writeln!(f, "  ...")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Index / IndexMut — img[(x, y)] syntax
// ---------------------------------------------------------------------------

impl<T: Pixel> std::ops::Index<(usize, usize)> for Image<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &T {
        self.bounds_check(x, y);
        &self.data[y * self.width + x]
    }
}

impl<T: Pixel> std::ops::IndexMut<(usize, usize)> for Image<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        self.bounds_check(x, y);
        let idx = y * self.width + x;
        &mut self.data[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rgba_is_opaque_black() {
        let img: Image<Rgba> = Image::new(10, 5);
        assert_eq!(img.dimensions(), (10, 5));
        for (_, _, v) in img.pixels() {
            assert_eq!(v, Rgba::opaque(0.0, 0.0, 0.0));
        }
    }

    #[test]
    fn test_roundtrip() {
        let mut img: Image<f32> = Image::new(4, 3);
        img.set(0, 0, 0.1);
        img.set(3, 2, 1.0);
        assert_eq!(img.get(0, 0), 0.1);
        assert_eq!(img.get(3, 2), 1.0);
        assert_eq!(img.get(2, 2), 0.0);
    }

    #[test]
    fn test_from_vec_row_major() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let img = Image::from_vec(4, 3, data);
        assert_eq!(img.get(3, 0), 3.0);
        assert_eq!(img.get(0, 1), 4.0);
        assert_eq!(img.row(2), &[8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_from_fn() {
        let img = Image::from_fn(3, 2, |x, y| (y * 10 + x) as f32);
        assert_eq!(img.get(2, 1), 12.0);
    }

    #[test]
    fn test_pixels_iterator_coords() {
        let img = Image::from_fn(3, 2, |x, y| (y * 3 + x) as f32);
        let px: Vec<_> = img.pixels().collect();
        assert_eq!(px[0], (0, 0, 0.0));
        assert_eq!(px[2], (2, 0, 2.0));
        assert_eq!(px[3], (0, 1, 3.0));
    }

    #[test]
    fn test_rows_mut_are_disjoint() {
        let mut img: Image<f32> = Image::new(3, 4);
        for (y, row) in img.rows_mut().enumerate() {
            row.fill(y as f32);
        }
        assert_eq!(img.get(1, 3), 3.0);
        assert_eq!(img.rows_mut().count(), 4);
    }

    #[test]
    fn test_contains() {
        let img: Image<f32> = Image::new(3, 2);
        assert!(img.contains(0, 0));
        assert!(img.contains(2, 1));
        assert!(!img.contains(-1, 0));
        assert!(!img.contains(3, 0));
        assert!(!img.contains(0, 2));
    }

    #[test]
    fn test_copy_from() {
        let src = Image::filled(2, 2, Rgba::gray(0.5));
        let mut dst: Image<Rgba> = Image::new(2, 2);
        dst.copy_from(&src);
        assert_eq!(dst, src);
    }

    #[test]
    #[should_panic(expected = "shape mismatch")]
    fn test_copy_from_shape_mismatch() {
        let src: Image<f32> = Image::new(2, 3);
        let mut dst: Image<f32> = Image::new(3, 2);
        dst.copy_from(&src);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_out_of_bounds() {
        let img: Image<f32> = Image::new(4, 4);
        img.get(4, 0);
    }

    #[test]
    fn test_index_mut_write() {
        let mut img: Image<f32> = Image::new(4, 3);
        img[(1, 2)] = 0.75;
        assert_eq!(img.get(1, 2), 0.75);
    }
}
