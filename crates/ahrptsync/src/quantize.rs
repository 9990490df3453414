//! Soft symbol quantization and phase rotation

use num_complex::Complex;

/// IQ rotation hypothesis
///
/// The demodulator may lock to the carrier at any multiple of
/// 90°. Only two of those hypotheses are resolved here:
/// identity and a 90° rotation. The remaining two look like
/// inverted data to the decoder.
///
/// Hypotheses enumerate (with `strum::IntoEnumIterator`) in
/// the order they are tested.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::IntoStaticStr,
)]
pub enum Phase {
    /// Use samples as received
    #[strum(serialize = "0°")]
    Deg0,

    /// Undo a 90° rotation
    #[strum(serialize = "90°")]
    Deg90,
}

/// Symbol-pair parity hypothesis
///
/// The punctured code transmits symbols in pairs. The
/// `Shift` says which of the first two symbols of a buffer
/// starts a pair.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::IntoStaticStr,
)]
pub enum Shift {
    /// Pairs start at symbol 0
    #[strum(serialize = "even")]
    Even,

    /// Pairs start at symbol 1
    #[strum(serialize = "odd")]
    Odd,
}

impl Shift {
    /// Number of leading symbols which precede the first pair
    pub fn offset(&self) -> usize {
        match self {
            Shift::Even => 0,
            Shift::Odd => 1,
        }
    }

    /// Shift which has the given leading `offset`, modulo 2
    pub fn from_offset(offset: usize) -> Self {
        if offset % 2 == 0 {
            Shift::Even
        } else {
            Shift::Odd
        }
    }

    /// Shift of the symbol which follows `len` symbols
    ///
    /// If this is the shift of a buffer of `len` symbols,
    /// returns the shift of the buffer which immediately
    /// follows it in the stream.
    pub fn realign(&self, len: usize) -> Self {
        Self::from_offset(self.offset() + len)
    }
}

/// Quantize one sample
///
/// Maps the in-phase and quadrature components of `sample`
/// to unsigned soft symbols as `clamp(x * 100 + 128, 0, 255)`.
/// Returns `(i, q)`.
#[inline]
pub fn quantize(sample: Complex<f32>) -> (u8, u8) {
    (quantize_component(sample.re), quantize_component(sample.im))
}

/// Apply a phase hypothesis to one soft symbol
///
/// The 90° hypothesis maps `(i, q)` to `(q, !i)`. Bitwise
/// complement is negation in the soft symbol domain.
#[inline]
pub fn rotate(phase: Phase, i: u8, q: u8) -> (u8, u8) {
    match phase {
        Phase::Deg0 => (i, q),
        Phase::Deg90 => (q, !i),
    }
}

#[inline]
fn quantize_component(x: f32) -> u8 {
    f32::clamp(x * 100.0f32 + 128.0f32, 0.0f32, 255.0f32) as u8
}

/// Buffer of quantized soft symbols
///
/// Holds parallel in-phase and quadrature soft symbol
/// buffers. The buffers are reused from call to call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SoftSymbols {
    i: Vec<u8>,
    q: Vec<u8>,
}

impl SoftSymbols {
    /// Empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty buffer with room for `capacity` symbols
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            i: Vec::with_capacity(capacity),
            q: Vec::with_capacity(capacity),
        }
    }

    /// Replace contents with quantized `samples`
    pub fn quantize_from(&mut self, samples: &[Complex<f32>]) {
        self.clear();
        for sa in samples {
            let (i, q) = quantize(*sa);
            self.push(i, q);
        }
    }

    /// Replace contents with rotated symbols from `src`
    ///
    /// Copies at most `limit` leading symbols from `src`,
    /// rotated by the `phase` hypothesis.
    pub fn rotate_from(&mut self, src: &SoftSymbols, phase: Phase, limit: usize) {
        self.clear();
        for (i, q) in src.iter().take(limit) {
            let (i, q) = rotate(phase, i, q);
            self.push(i, q);
        }
    }

    /// Append one `(i, q)` soft symbol pair
    pub fn push(&mut self, i: u8, q: u8) {
        self.i.push(i);
        self.q.push(q);
    }

    /// Remove all symbols
    pub fn clear(&mut self) {
        self.i.clear();
        self.q.clear();
    }

    /// Number of symbols
    pub fn len(&self) -> usize {
        self.i.len()
    }

    /// True if there are no symbols
    pub fn is_empty(&self) -> bool {
        self.i.is_empty()
    }

    /// In-phase soft symbols
    pub fn i(&self) -> &[u8] {
        &self.i
    }

    /// Quadrature soft symbols
    pub fn q(&self) -> &[u8] {
        &self.q
    }

    /// Iterate over `(i, q)` soft symbol pairs
    pub fn iter(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.i.iter().copied().zip(self.q.iter().copied())
    }
}

impl FromIterator<(u8, u8)> for SoftSymbols {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (u8, u8)>,
    {
        let mut out = SoftSymbols::new();
        for (i, q) in iter {
            out.push(i, q);
        }
        out
    }
}
