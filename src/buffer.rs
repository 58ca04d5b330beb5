// buffer.rs — Original / working image pair.
//
// The host shows either the processed result or the source. Rather than
// recompute, it keeps two same-shaped buffers and copies one over the other:
//
//   reset_from_original()   working  ← original
//   commit_to_original()    original ← working
//
// Transforms only ever touch `working`. The copies are explicit; nothing
// here runs behind the caller's back.
//
// `toggle()` replays the host's key handler: a counter that starts at 1 and
// is bumped before each copy. Even → reset, odd → commit.

use log::trace;

use crate::color::Rgba;
use crate::image::Image;

/// Which direction a toggle copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferCopy {
    /// working ← original
    Reset,
    /// original ← working
    Commit,
}

/// The pipeline's pair of RGBA buffers.
#[derive(Debug, Clone)]
pub struct ImageBuffers {
    original: Image<Rgba>,
    working: Image<Rgba>,
    switch_count: u64,
}

impl ImageBuffers {
    /// Start both buffers as copies of `image`.
    pub fn new(image: Image<Rgba>) -> Self {
        ImageBuffers {
            working: image.clone(),
            original: image,
            switch_count: 1,
        }
    }

    #[inline]
    pub fn original(&self) -> &Image<Rgba> {
        &self.original
    }

    #[inline]
    pub fn working(&self) -> &Image<Rgba> {
        &self.working
    }

    /// Mutable access to the working buffer for transforms.
    #[inline]
    pub fn working_mut(&mut self) -> &mut Image<Rgba> {
        &mut self.working
    }

    /// Replace the working buffer wholesale (e.g. with a convolution result).
    ///
    /// # Panics
    /// Panics if `image` has a different shape.
    pub fn set_working(&mut self, image: Image<Rgba>) {
        assert!(
            image.same_shape(&self.working),
            "set_working: {}×{} does not match buffer {}×{}",
            image.width(),
            image.height(),
            self.working.width(),
            self.working.height(),
        );
        self.working = image;
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        self.working.dimensions()
    }

    /// Discard processing: working ← original.
    pub fn reset_from_original(&mut self) {
        self.working.copy_from(&self.original);
        trace!("buffers: working reset from original");
    }

    /// Keep processing as the new baseline: original ← working.
    pub fn commit_to_original(&mut self) {
        self.original.copy_from(&self.working);
        trace!("buffers: working committed to original");
    }

    /// Advance the switch counter and copy in the direction its parity picks.
    pub fn toggle(&mut self) -> BufferCopy {
        self.switch_count += 1;
        if self.switch_count % 2 == 0 {
            self.reset_from_original();
            BufferCopy::Reset
        } else {
            self.commit_to_original();
            BufferCopy::Commit
        }
    }

    /// Give back the working buffer.
    pub fn into_working(self) -> Image<Rgba> {
        self.working
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffers() -> ImageBuffers {
        ImageBuffers::new(Image::filled(2, 2, Rgba::gray(0.5)))
    }

    #[test]
    fn test_reset_restores_working() {
        let mut b = buffers();
        b.working_mut().set(0, 0, Rgba::gray(0.9));
        b.reset_from_original();
        assert_eq!(b.working().get(0, 0), Rgba::gray(0.5));
    }

    #[test]
    fn test_commit_overwrites_original() {
        let mut b = buffers();
        b.working_mut().set(1, 1, Rgba::gray(0.1));
        b.commit_to_original();
        assert_eq!(b.original().get(1, 1), Rgba::gray(0.1));
    }

    #[test]
    fn test_toggle_alternates_starting_with_reset() {
        let mut b = buffers();
        b.working_mut().set(0, 0, Rgba::gray(0.9));
        assert_eq!(b.toggle(), BufferCopy::Reset);
        assert_eq!(b.working().get(0, 0), Rgba::gray(0.5));

        b.working_mut().set(0, 0, Rgba::gray(0.2));
        assert_eq!(b.toggle(), BufferCopy::Commit);
        assert_eq!(b.original().get(0, 0), Rgba::gray(0.2));

        assert_eq!(b.toggle(), BufferCopy::Reset);
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn test_set_working_shape_mismatch() {
        let mut b = buffers();
        b.set_working(Image::new(3, 2));
    }
}
