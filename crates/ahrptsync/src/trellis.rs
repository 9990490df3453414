//! Add-compare-select trellis decoding
//!
//! The synchronizer needs only a small capability from a
//! Viterbi decoder: reset it, feed it branch inputs, and
//! pull decoded bytes out of it. The [`TrellisDecoder`]
//! trait describes that capability, and the
//! [`RegisterExchangeDecoder`] implements it for the
//! 64-state code of the [reference encoder](crate::ConvEncoder).

use crate::conv::{branch_outputs, NUM_STATES};
use crate::metric::MetricTable;

/// Number of branch inputs consumed by one update
///
/// Every update advances the trellis by two steps. Each
/// step consumes a pair of soft symbols: one for each
/// generator polynomial.
pub const BRANCHES_PER_UPDATE: usize = 4;

/// Streaming convolutional decoder
///
/// Implementations must be deterministic: the same sequence
/// of calls after a [`reset()`](TrellisDecoder::reset)
/// must produce the same output.
pub trait TrellisDecoder {
    /// Reset to zero initial conditions
    ///
    /// All path metrics and path histories are cleared.
    fn reset(&mut self);

    /// Advance the trellis by two steps
    ///
    /// `branches` contains two soft symbol pairs `(c0, c1)`,
    /// in transmission order. Punctured positions must
    /// contain the erasure value, which carries no
    /// information under any sensible `metrics`.
    fn update(&mut self, metrics: &MetricTable, branches: &[u8; BRANCHES_PER_UPDATE]);

    /// Obtain the next decoded byte, if one is ready
    ///
    /// Callers invoke this once for every eight trellis steps
    /// (16 branch inputs). Returns `None` until the decoder
    /// has accumulated enough history to make a decision.
    /// Once the decoder starts returning bytes, each byte
    /// follows the previous one in the decoded bitstream,
    /// most significant bit first.
    fn extract_byte(&mut self) -> Option<u8>;
}

/// Register-exchange Viterbi decoder
///
/// Every trellis state carries a path metric and a 32-bit
/// survivor register with the most recent decisions along
/// its survivor path. Decoded bytes are read out of the
/// oldest eight decisions of the best state. Each decoded
/// byte ends 24 trellis steps before the most recent input.
///
/// The decoder is double-buffered: each step reads from one
/// state array and writes the other.
#[derive(Clone, Debug)]
pub struct RegisterExchangeDecoder {
    // current and next state arrays
    states: [[PathState; NUM_STATES]; 2],

    // which of `states` is current
    active: usize,

    // trellis steps since reset, saturating
    steps: u32,
}

impl RegisterExchangeDecoder {
    /// Decision depth, in trellis steps
    pub const DEPTH: u32 = 32;

    /// New decoder with all states equally likely
    pub fn new() -> Self {
        Self {
            states: [[PathState::default(); NUM_STATES]; 2],
            active: 0,
            steps: 0,
        }
    }

    /// Trellis steps since reset
    ///
    /// This counter saturates instead of wrapping.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    // Add-compare-select for a single trellis step
    //
    // State `n` can be reached from states `(n >> 1)` and
    // `(n >> 1) | 0x20`. In both cases the input bit is the
    // lsb of `n`.
    fn step(&mut self, metrics: &MetricTable, c0: u8, c1: u8) {
        let branch = [
            [
                metrics.metric(0, c0) + metrics.metric(0, c1),
                metrics.metric(0, c0) + metrics.metric(1, c1),
            ],
            [
                metrics.metric(1, c0) + metrics.metric(0, c1),
                metrics.metric(1, c0) + metrics.metric(1, c1),
            ],
        ];

        let (first, second) = self.states.split_at_mut(1);
        let (cur, next) = if self.active == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        };

        let mut best = i32::MIN;
        for (n, survivor) in next.iter_mut().enumerate() {
            let bit = (n & 0x01) as u32;
            *survivor = PathState {
                metric: i32::MIN,
                path: 0,
            };
            for msb in 0..2usize {
                let prev = (n >> 1) | (msb << 5);
                let (a, b) = branch_outputs(((msb << 6) | n) as u32);
                let candidate = cur[prev].metric + branch[a as usize][b as usize];
                if candidate > survivor.metric {
                    survivor.metric = candidate;
                    survivor.path = (cur[prev].path << 1) | bit;
                }
            }
            best = i32::max(best, survivor.metric);
        }

        // renormalize so the best state sits at zero
        for survivor in next.iter_mut() {
            survivor.metric -= best;
        }

        self.active ^= 1;
        self.steps = self.steps.saturating_add(1);
    }
}

impl Default for RegisterExchangeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrellisDecoder for RegisterExchangeDecoder {
    fn reset(&mut self) {
        self.states = [[PathState::default(); NUM_STATES]; 2];
        self.active = 0;
        self.steps = 0;
    }

    fn update(&mut self, metrics: &MetricTable, branches: &[u8; BRANCHES_PER_UPDATE]) {
        self.step(metrics, branches[0], branches[1]);
        self.step(metrics, branches[2], branches[3]);
    }

    fn extract_byte(&mut self) -> Option<u8> {
        if self.steps < Self::DEPTH {
            return None;
        }

        let best = self.states[self.active]
            .iter()
            .max_by_key(|state| state.metric)?;
        Some((best.path >> (Self::DEPTH - 8)) as u8)
    }
}

// Path metric and survivor history of one trellis state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PathState {
    metric: i32,
    path: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::conv::ConvEncoder;

    // map encoded bits to clean soft symbols
    fn soft(bit: u8) -> u8 {
        if bit == 1 {
            228
        } else {
            28
        }
    }

    fn encode_soft(data: &[u8]) -> Vec<u8> {
        let mut enc = ConvEncoder::new();
        let mut out = vec![];
        for byte in data {
            for (c0, c1) in enc.push_byte(*byte) {
                out.push(soft(c0));
                out.push(soft(c1));
            }
        }
        out
    }

    fn decode(dec: &mut RegisterExchangeDecoder, metrics: &MetricTable, syms: &[u8]) -> Vec<u8> {
        let mut out = vec![];
        for (i, chunk) in syms.chunks_exact(BRANCHES_PER_UPDATE).enumerate() {
            dec.update(metrics, chunk.try_into().unwrap());
            if i % 4 == 3 {
                if let Some(byte) = dec.extract_byte() {
                    out.push(byte);
                }
            }
        }
        out
    }

    #[test]
    fn test_decode_clean() {
        const DATA: &[u8] = &[
            0x1a, 0xcf, 0xfc, 0x1d, 0x00, 0xff, 0x55, 0xaa, 0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc,
            0xde, 0xf0,
        ];

        let metrics = MetricTable::from_code_rate(0.5, 5.0);
        let mut dec = RegisterExchangeDecoder::new();
        let out = decode(&mut dec, &metrics, &encode_soft(DATA));

        // the last three bytes are still inside the decoder
        assert_eq!(DATA.len() - 3, out.len());
        assert_eq!(&DATA[0..DATA.len() - 3], out.as_slice());
    }

    #[test]
    fn test_decode_with_errors() {
        const DATA: &[u8] = b"ADVANCED HIGH RESOLUTION PICTURE TRANSMISSION";

        let metrics = MetricTable::from_code_rate(0.5, 5.0);
        let mut syms = encode_soft(DATA);

        // flip a few widely-separated symbols
        for idx in (7..syms.len()).step_by(41) {
            syms[idx] = 255 - syms[idx];
        }

        let mut dec = RegisterExchangeDecoder::new();
        let out = decode(&mut dec, &metrics, &syms);
        assert_eq!(&DATA[0..DATA.len() - 3], out.as_slice());
    }

    #[test]
    fn test_depth_and_reset() {
        let metrics = MetricTable::from_code_rate(0.5, 5.0);
        let mut dec = RegisterExchangeDecoder::new();

        for _i in 0..(RegisterExchangeDecoder::DEPTH / 2 - 1) {
            dec.update(&metrics, &[28, 28, 28, 28]);
            assert_eq!(None, dec.extract_byte());
        }
        dec.update(&metrics, &[28, 28, 28, 28]);
        assert_eq!(RegisterExchangeDecoder::DEPTH, dec.steps());
        assert_eq!(Some(0x00), dec.extract_byte());

        dec.reset();
        assert_eq!(0, dec.steps());
        assert_eq!(None, dec.extract_byte());
    }

    #[test]
    fn test_erasures_are_neutral() {
        // an all-erasure input never favors any state
        let metrics = MetricTable::from_code_rate(0.75, 5.0);
        let mut dec = RegisterExchangeDecoder::new();
        for _i in 0..8 {
            dec.update(&metrics, &[128, 128, 128, 128]);
        }
        for state in dec.states[dec.active].iter() {
            assert_eq!(0, state.metric);
        }
    }
}
