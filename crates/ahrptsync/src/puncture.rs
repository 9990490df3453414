//! Rate 3/4 puncturing
//!
//! The rate 1/2 mother code emits a pair `(c0, c1)` for
//! every input bit. Over three input bits, only four of the
//! six encoded bits are transmitted, as two QPSK symbols:
//!
//! ```txt
//! step    0        1        2
//! c0      I0       -        I1
//! c1      Q0       Q1       -
//! ```
//!
//! Even symbols carry a complete pair. Odd symbols carry
//! the `c1` of one step and the `c0` of the next. The
//! receiver restores the missing positions as erasures.

use arrayvec::ArrayVec;

/// Soft value of a punctured (untransmitted) position
///
/// This is the midpoint of the soft symbol range, and it
/// is never counted when comparing bits.
pub const ERASURE: u8 = 128;

/// Branch inputs produced by one received symbol
pub type SymbolBranches = ArrayVec<u8, 4>;

/// Restore the punctured positions around one symbol
///
/// Accepts the soft `i` and `q` values of one received
/// symbol. `odd` is the position of this symbol within the
/// puncturing period. Returns the branch inputs, in trellis
/// order, which this symbol contributes:
///
/// * even symbols: `[i, q]` (one trellis step)
/// * odd symbols: `[ERASURE, q, i, ERASURE]` (two steps)
#[inline]
pub fn depuncture(odd: bool, i: u8, q: u8) -> SymbolBranches {
    let mut out = SymbolBranches::new();
    if odd {
        out.push(ERASURE);
        out.push(q);
        out.push(i);
        out.push(ERASURE);
    } else {
        out.push(i);
        out.push(q);
    }
    out
}

/// Transmit-side puncturer
///
/// Accepts encoded pairs from a
/// [`ConvEncoder`](crate::ConvEncoder) and emits symbol bit
/// pairs `(i, q)` according to the puncturing pattern.
/// The position in the pattern is kept across calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Puncturer {
    // position within the three-step period
    step: u8,

    // c1 of the middle step, awaiting its partner
    held_q: u8,
}

impl Puncturer {
    /// New puncturer at the start of the pattern
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the start of the pattern
    pub fn reset(&mut self) {
        self.step = 0;
        self.held_q = 0;
    }

    /// Puncture one encoded pair
    ///
    /// Returns a symbol `(i, q)` when one is complete.
    pub fn push(&mut self, c0: u8, c1: u8) -> Option<(u8, u8)> {
        let out = match self.step {
            0 => Some((c0, c1)),
            1 => {
                self.held_q = c1;
                None
            }
            _ => Some((c0, self.held_q)),
        };
        self.step = (self.step + 1) % 3;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depuncture() {
        assert_eq!(&[10u8, 20], depuncture(false, 10, 20).as_slice());
        assert_eq!(
            &[ERASURE, 20, 10, ERASURE],
            depuncture(true, 10, 20).as_slice()
        );
    }

    #[test]
    fn test_puncturer() {
        let mut punc = Puncturer::new();
        let pairs = [(1, 0), (0, 1), (1, 1), (0, 0), (1, 0), (0, 1)];
        let out: Vec<(u8, u8)> = pairs.iter().filter_map(|(a, b)| punc.push(*a, *b)).collect();
        assert_eq!(vec![(1, 0), (1, 1), (0, 0), (0, 0)], out);

        punc.push(1, 1);
        punc.reset();
        assert_eq!(Puncturer::new(), punc);
    }

    #[test]
    fn test_puncture_then_depuncture() {
        // every transmitted bit lands back in its trellis position
        let pairs = [(1u8, 0u8), (0, 1), (1, 1), (0, 1), (1, 0), (1, 0)];
        let mut punc = Puncturer::new();
        let mut branches = vec![];
        let mut odd = false;
        for (a, b) in pairs {
            if let Some((i, q)) = punc.push(a, b) {
                branches.extend(depuncture(odd, i, q));
                odd = !odd;
            }
        }

        assert_eq!(2 * pairs.len(), branches.len());
        for (t, (a, b)) in pairs.iter().enumerate() {
            let (rx0, rx1) = (branches[2 * t], branches[2 * t + 1]);
            match t % 3 {
                0 => assert_eq!((*a, *b), (rx0, rx1)),
                1 => assert_eq!((ERASURE, *b), (rx0, rx1)),
                _ => assert_eq!((*a, ERASURE), (rx0, rx1)),
            }
        }
    }
}
