//! Bit error rate measurement for sync hypotheses
//!
//! A trial decode tells us whether a (phase, shift)
//! hypothesis is correct. We decode a window of symbols,
//! re-encode the decoded bits, and compare them with the
//! bits that were actually received. When the hypothesis is
//! right, the re-encoded stream matches the received stream
//! up to the channel error rate. When it is wrong, the
//! decoder cannot find a consistent path and the error rate
//! is high.

use crate::conv::ConvEncoder;
use crate::metric::MetricTable;
use crate::puncture::{depuncture, ERASURE};
use crate::quantize::{Shift, SoftSymbols};
use crate::trellis::{TrellisDecoder, BRANCHES_PER_UPDATE};

/// Length of the test window, in symbols
pub const TEST_LEN: usize = 1024;

/// Minimum window length for a conclusive measurement, in symbols
pub const MIN_TEST_LEN: usize = 256;

// Branch inputs per decoded byte
const BRANCHES_PER_BYTE: usize = 16;

/// Trial decoder for sync hypotheses
///
/// The tester owns only scratch buffers. The trellis decoder
/// to use is supplied by the caller and is reset before
/// every measurement, so measurements do not depend on
/// each other.
///
/// The tester mirrors the puncturing arithmetic of the
/// [`StreamingDecoder`](crate::StreamingDecoder) but keeps
/// no state between calls.
#[derive(Clone, Debug, Default)]
pub struct HypothesisTester {
    // depunctured branch inputs for the window
    branches: Vec<u8>,

    // trial decoder output
    decoded: Vec<u8>,
}

impl HypothesisTester {
    /// New tester
    pub fn new() -> Self {
        Self {
            branches: Vec::with_capacity(2 * TEST_LEN + 4),
            decoded: Vec::with_capacity(TEST_LEN / 4),
        }
    }

    /// Measure bit error rate of a hypothesis
    ///
    /// `symbols` must already be rotated by the phase
    /// hypothesis under test. At most [`TEST_LEN`] leading
    /// symbols are used. The first `shift.offset()` symbols
    /// are skipped so that the next symbol starts a
    /// puncturing period.
    ///
    /// Returns the fraction of received, non-erased bits
    /// which disagree with the re-encoded trial decode. The
    /// first decoded byte primes the re-encoder and is not
    /// compared.
    ///
    /// Returns `None` if there are fewer than [`MIN_TEST_LEN`]
    /// symbols to work with.
    pub fn measure<D>(
        &mut self,
        decoder: &mut D,
        metrics: &MetricTable,
        symbols: &SoftSymbols,
        shift: Shift,
    ) -> Option<f32>
    where
        D: TrellisDecoder,
    {
        let window = usize::min(symbols.len(), TEST_LEN);
        if window < MIN_TEST_LEN {
            return None;
        }

        // depuncture
        self.branches.clear();
        for (k, (i, q)) in symbols
            .iter()
            .take(window)
            .skip(shift.offset())
            .enumerate()
        {
            self.branches.extend(depuncture(k % 2 == 1, i, q));
        }

        // trial decode
        decoder.reset();
        self.decoded.clear();
        for (k, chunk) in self
            .branches
            .chunks_exact(BRANCHES_PER_UPDATE)
            .enumerate()
        {
            let mut update = [ERASURE; BRANCHES_PER_UPDATE];
            update.copy_from_slice(chunk);
            decoder.update(metrics, &update);
            if (k + 1) * BRANCHES_PER_UPDATE % BRANCHES_PER_BYTE == 0 {
                if let Some(byte) = decoder.extract_byte() {
                    self.decoded.push(byte);
                }
            }
        }

        compare_reencoded(&self.decoded, &self.branches)
    }
}

// Re-encode `decoded` and compare with `branches`
//
// `decoded[n]` holds the input bits for trellis steps
// `8n .. 8n + 8`, and step `t` was received in
// `branches[2t]` and `branches[2t + 1]`. Erasures are
// skipped. Returns the fraction of mismatched bits, or
// `None` if nothing could be compared.
fn compare_reencoded(decoded: &[u8], branches: &[u8]) -> Option<f32> {
    let (prime, rest) = decoded.split_first()?;

    let mut encoder = ConvEncoder::new();
    encoder.push_byte(*prime);

    let mut errors = 0u32;
    let mut compared = 0u32;
    for (n, byte) in rest.iter().enumerate() {
        for (k, (c0, c1)) in encoder.push_byte(*byte).iter().enumerate() {
            let step = 8 * (n + 1) + k;
            for (expect, rx) in [*c0, *c1].iter().zip(branches.iter().skip(2 * step).take(2)) {
                if *rx == ERASURE {
                    continue;
                }
                compared += 1;
                errors += (*expect != (*rx > ERASURE) as u8) as u32;
            }
        }
    }

    if compared == 0 {
        None
    } else {
        Some(errors as f32 / compared as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use num_complex::Complex;

    use crate::quantize::Phase;
    use crate::trellis::RegisterExchangeDecoder;
    use crate::waveform::{modulate, test_bytes};

    fn soft_symbols(samples: &[Complex<f32>], phase: Phase) -> SoftSymbols {
        let mut quantized = SoftSymbols::new();
        quantized.quantize_from(samples);
        let mut out = SoftSymbols::new();
        out.rotate_from(&quantized, phase, usize::MAX);
        out
    }

    #[test]
    fn test_compare_reencoded() {
        // perfect agreement
        let mut enc = ConvEncoder::new();
        let data = [0x5au8, 0xc3, 0x0f];
        let mut branches = vec![];
        for byte in data {
            for (c0, c1) in enc.push_byte(byte) {
                branches.push(if c0 == 1 { 228 } else { 28 });
                branches.push(if c1 == 1 { 228 } else { 28 });
            }
        }
        assert_eq!(Some(0.0f32), compare_reencoded(&data, &branches));

        // one error in the primer byte's span is not counted
        let mut corrupted = branches.clone();
        corrupted[3] = 255 - corrupted[3];
        assert_eq!(Some(0.0f32), compare_reencoded(&data, &corrupted));

        // but one afterwards is
        corrupted[20] = 255 - corrupted[20];
        assert_eq!(Some(1.0f32 / 32.0f32), compare_reencoded(&data, &corrupted));

        // erasures are never compared, even where they would disagree
        let mut erased = branches.clone();
        for rx in erased.iter_mut().skip(16).step_by(3) {
            *rx = ERASURE;
        }
        assert_eq!(Some(0.0f32), compare_reencoded(&data, &erased));

        // nothing to compare
        assert_eq!(None, compare_reencoded(&data[0..1], &branches));
        assert_eq!(None, compare_reencoded(&[], &branches));
    }

    #[test]
    fn test_measure_hypotheses() {
        let metrics = MetricTable::from_code_rate(0.75, 5.0);
        let mut tester = HypothesisTester::new();
        let mut dec = RegisterExchangeDecoder::new();
        let samples = modulate(&test_bytes(0x1234_5678, 400), Phase::Deg0, Shift::Odd);

        let right = soft_symbols(&samples, Phase::Deg0);
        assert_eq!(
            Some(0.0f32),
            tester.measure(&mut dec, &metrics, &right, Shift::Odd)
        );

        // repeatable, and independent of decoder history
        dec.update(&metrics, &[0, 255, 0, 255]);
        assert_eq!(
            Some(0.0f32),
            tester.measure(&mut dec, &metrics, &right, Shift::Odd)
        );

        // wrong shift
        let ber = tester
            .measure(&mut dec, &metrics, &right, Shift::Even)
            .expect("expected measurement");
        assert!(ber > 0.17);

        // wrong phase
        let wrong = soft_symbols(&samples, Phase::Deg90);
        for shift in [Shift::Even, Shift::Odd] {
            let ber = tester
                .measure(&mut dec, &metrics, &wrong, shift)
                .expect("expected measurement");
            assert!(ber > 0.17);
        }
    }

    #[test]
    fn test_measure_ignores_erased_symbols() {
        let metrics = MetricTable::from_code_rate(0.75, 5.0);
        let mut tester = HypothesisTester::new();
        let mut dec = RegisterExchangeDecoder::new();
        let mut samples = modulate(&test_bytes(0xfeed_beef, 400), Phase::Deg0, Shift::Even);

        // zero-valued components quantize to the erasure value
        for sa in samples.iter_mut().step_by(10) {
            sa.re = 0.0;
        }

        let syms = soft_symbols(&samples, Phase::Deg0);
        assert_eq!(
            Some(0.0f32),
            tester.measure(&mut dec, &metrics, &syms, Shift::Even)
        );
    }

    #[test]
    fn test_measure_short_window() {
        let metrics = MetricTable::from_code_rate(0.75, 5.0);
        let mut tester = HypothesisTester::new();
        let mut dec = RegisterExchangeDecoder::new();
        let samples = modulate(&test_bytes(1, 400), Phase::Deg0, Shift::Even);

        let syms = soft_symbols(&samples[0..MIN_TEST_LEN - 1], Phase::Deg0);
        assert_eq!(None, tester.measure(&mut dec, &metrics, &syms, Shift::Even));

        let syms = soft_symbols(&samples[0..MIN_TEST_LEN], Phase::Deg0);
        assert_eq!(
            Some(0.0f32),
            tester.measure(&mut dec, &metrics, &syms, Shift::Even)
        );
    }
}
