// kernel.rs — Square convolution kernel: parse, reflect, normalize.
//
// Construction always runs the same three steps, in this order:
//
//   1. Read N² weights row-major. Accumulate `positive_sum` over the
//      strictly positive entries only.
//   2. Reflect: swap (row, col) with (col, row) for every col > row.
//   3. Divide EVERY entry by `positive_sum`, negative ones included.
//
// Consequences worth knowing:
//   - An all-positive kernel sums to exactly 1 after step 3.
//   - A kernel with negative lobes (e.g. a sharpen filter) does NOT sum to 1.
//     Its positive entries sum to 1 and the negative ones are scaled by the
//     same divisor, so the whole kernel sums to less than 1.
//   - A kernel with no positive entry cannot be normalized and is rejected.
//   - NaN and infinite weights are rejected, and so is a positive sum that
//     overflows f32. Either would poison every output pixel.
//
// Filter file format: the first token is the dimension N, followed by N²
// whitespace-separated weights. Line breaks carry no meaning.
//
//   3
//   1 2 1
//   2 4 2
//   1 2 1

use std::fmt;

use log::debug;

use crate::error::ConfigError;

/// Upper bound on weights reserved before any token is read (a 31×31 kernel).
const MAX_PREALLOC: usize = 961;

/// A normalized, reflected square kernel of odd dimension.
#[derive(Clone, PartialEq)]
pub struct Kernel {
    /// Row-major weights, length = size * size.
    weights: Vec<f32>,
    /// Dimension N (odd, ≥ 1).
    size: usize,
    /// Sum of the strictly positive raw weights; the divisor used in normalization.
    positive_sum: f32,
}

impl Kernel {
    // --- Constructors ---

    /// Build a kernel from raw row-major weights and a declared dimension.
    ///
    /// Only the first `size²` weights are used; extra values are ignored.
    pub fn from_weights(size: i64, raw: &[f32]) -> Result<Self, ConfigError> {
        let n = validate_dimension(size)?;
        let needed = tap_count(n)?;
        if raw.len() < needed {
            return Err(ConfigError::MissingWeights { expected: needed, found: raw.len() });
        }
        Self::build(n, raw[..needed].to_vec())
    }

    /// Parse `size²` whitespace-separated weights from `text`.
    ///
    /// Tokens after the first `size²` are not read.
    pub fn parse(text: &str, size: i64) -> Result<Self, ConfigError> {
        let n = validate_dimension(size)?;
        let weights = read_weights(text.split_whitespace(), tap_count(n)?, 0)?;
        Self::build(n, weights)
    }

    /// Parse a bare list of weights, inferring N from the token count.
    pub fn parse_square(text: &str) -> Result<Self, ConfigError> {
        let count = text.split_whitespace().count();
        let n = (count as f64).sqrt().round() as usize;
        if n == 0 || n * n != count || n % 2 == 0 {
            return Err(ConfigError::NotSquare(count));
        }
        Self::parse(text, n as i64)
    }

    /// Parse a filter file: dimension first, then the weights.
    pub fn parse_filter_file(text: &str) -> Result<Self, ConfigError> {
        let mut tokens = text.split_whitespace();
        let first = tokens
            .next()
            .ok_or(ConfigError::MissingWeights { expected: 1, found: 0 })?;
        let size: i64 = first.parse().map_err(|_| ConfigError::InvalidToken {
            index: 0,
            token: first.to_string(),
        })?;
        let n = validate_dimension(size)?;
        let weights = read_weights(tokens, tap_count(n)?, 1)?;
        Self::build(n, weights)
    }

    /// The N×N identity: a single 1 at the center.
    pub fn identity(size: usize) -> Result<Self, ConfigError> {
        let n = validate_dimension(size as i64)?;
        let mut raw = vec![0.0f32; tap_count(n)?];
        raw[(n / 2) * n + n / 2] = 1.0;
        Self::build(n, raw)
    }

    /// The N×N box filter: every weight 1/N².
    pub fn box_filter(size: usize) -> Result<Self, ConfigError> {
        let n = validate_dimension(size as i64)?;
        Self::build(n, vec![1.0; tap_count(n)?])
    }

    fn build(size: usize, mut weights: Vec<f32>) -> Result<Self, ConfigError> {
        debug_assert_eq!(weights.len(), size * size);

        if let Some((index, w)) = weights.iter().enumerate().find(|(_, w)| !w.is_finite()) {
            return Err(ConfigError::InvalidToken { index, token: w.to_string() });
        }
        let positive_sum: f32 = weights.iter().copied().filter(|&w| w > 0.0).sum();
        if positive_sum <= 0.0 {
            return Err(ConfigError::NoPositiveWeights);
        }
        if !positive_sum.is_finite() {
            return Err(ConfigError::WeightSumOverflow);
        }

        reflect(&mut weights, size);
        for w in &mut weights {
            *w /= positive_sum;
        }

        debug!("kernel {size}x{size} loaded, positive sum {positive_sum}");
        Ok(Kernel { weights, size, positive_sum })
    }

    // --- Accessors ---

    /// Dimension N.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// N / 2: how far the kernel reaches from its center.
    #[inline]
    pub fn radius(&self) -> usize {
        self.size / 2
    }

    /// Sum of the strictly positive raw weights, before normalization.
    #[inline]
    pub fn positive_sum(&self) -> f32 {
        self.positive_sum
    }

    /// Normalized weight at grid position (row, col).
    ///
    /// # Panics
    /// Panics if row or col ≥ size.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        assert!(
            row < self.size && col < self.size,
            "kernel position ({row},{col}) out of bounds for {0}×{0}",
            self.size,
        );
        self.weights[row * self.size + col]
    }

    /// Weight for the tap `dy` rows and `dx` columns from the center.
    #[inline]
    pub fn tap(&self, dy: isize, dx: isize) -> f32 {
        let r = self.radius() as isize;
        self.get((dy + r) as usize, (dx + r) as usize)
    }

    /// Normalized weights, row-major.
    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Sum of all normalized weights (1 only when no weight is negative).
    pub fn sum(&self) -> f32 {
        self.weights.iter().sum()
    }

    /// Iterate over `(dy, dx, weight)` for every tap, top-left first.
    pub fn taps(&self) -> impl Iterator<Item = (isize, isize, f32)> + '_ {
        let n = self.size;
        let r = self.radius() as isize;
        self.weights
            .iter()
            .enumerate()
            .map(move |(i, &w)| ((i / n) as isize - r, (i % n) as isize - r, w))
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Kernel {{ {0}×{0}, positive_sum={1} }}", self.size, self.positive_sum)?;
        for row in self.weights.chunks(self.size) {
            writeln!(f, "  {row:?}")?;
        }
        Ok(())
    }
}

/// Transpose a row-major `size`×`size` grid in place.
///
/// Swaps every off-diagonal pair once; the diagonal stays put.
/// Applying it twice restores the input.
pub fn reflect(grid: &mut [f32], size: usize) {
    assert_eq!(grid.len(), size * size, "grid is not {size}×{size}");
    for row in 0..size {
        for col in (row + 1)..size {
            grid.swap(row * size + col, col * size + row);
        }
    }
}

fn validate_dimension(size: i64) -> Result<usize, ConfigError> {
    if size <= 0 {
        return Err(ConfigError::NonPositiveDimension(size));
    }
    let n = usize::try_from(size).map_err(|_| ConfigError::DimensionTooLarge(size as u64))?;
    if n % 2 == 0 {
        return Err(ConfigError::EvenDimension(n));
    }
    Ok(n)
}

/// N², or an error when it does not fit in `usize`.
fn tap_count(n: usize) -> Result<usize, ConfigError> {
    n.checked_mul(n).ok_or(ConfigError::DimensionTooLarge(n as u64))
}

/// Read exactly `count` finite floats. `offset` is added to token indices in errors.
///
/// `count` comes from an untrusted header, so the buffer grows with the
/// tokens actually present.
fn read_weights<'a, I>(tokens: I, count: usize, offset: usize) -> Result<Vec<f32>, ConfigError>
where
    I: Iterator<Item = &'a str>,
{
    let mut weights = Vec::with_capacity(count.min(MAX_PREALLOC));
    for (i, token) in tokens.take(count).enumerate() {
        let invalid = || ConfigError::InvalidToken { index: i + offset, token: token.to_string() };
        let w: f32 = token.parse().map_err(|_| invalid())?;
        if !w.is_finite() {
            return Err(invalid());
        }
        weights.push(w);
    }
    if weights.len() < count {
        return Err(ConfigError::MissingWeights { expected: count, found: weights.len() });
    }
    Ok(weights)
}
