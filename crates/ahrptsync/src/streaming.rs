//! Continuous decoding across chunk boundaries

use arrayvec::ArrayVec;

use crate::metric::MetricTable;
use crate::puncture::depuncture;
use crate::quantize::SoftSymbols;
use crate::trellis::{TrellisDecoder, BRANCHES_PER_UPDATE};

// Branch inputs per decoded byte
const BRANCHES_PER_BYTE: u32 = 16;

/// Streaming punctured-code decoder
///
/// Drives the main [`TrellisDecoder`] with every symbol of
/// every chunk it is given. The position within the
/// puncturing period, the position within the current
/// decoded byte, and any branch inputs which do not yet fill
/// a complete update are all carried from one chunk to the
/// next. Splitting a stream into chunks differently does not
/// change the output.
///
/// The decoder does not know about phase or sync. The
/// caller must rotate the symbols and
/// [`start()`](#method.start) the decoder with the correct
/// leading offset.
#[derive(Clone, Debug)]
pub struct StreamingDecoder<D> {
    // main trellis decoder
    decoder: D,

    // branch inputs awaiting a full update
    pending: ArrayVec<u8, BRANCHES_PER_UPDATE>,

    // position within the puncturing period (mod 2)
    parity_syms: u32,

    // position within the current decoded byte (mod 16)
    parity_bits: u32,

    // symbols to discard before decoding resumes
    skip: usize,
}

impl<D> StreamingDecoder<D>
where
    D: TrellisDecoder,
{
    /// Create around a trellis decoder
    ///
    /// The `decoder` is reset.
    pub fn new(mut decoder: D) -> Self {
        decoder.reset();
        Self {
            decoder,
            pending: ArrayVec::new(),
            parity_syms: 0,
            parity_bits: 0,
            skip: 0,
        }
    }

    /// Reset to zero initial conditions
    ///
    /// Resets the trellis decoder and all counters.
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.pending.clear();
        self.parity_syms = 0;
        self.parity_bits = 0;
        self.skip = 0;
    }

    /// Begin decoding at an offset
    ///
    /// The next `skip` symbols given to
    /// [`decode()`](#method.decode) are discarded. The symbol
    /// after them must start a puncturing period. This is a
    /// one-shot adjustment.
    pub fn start(&mut self, skip: usize) {
        self.skip = skip;
    }

    /// Decode a chunk of symbols
    ///
    /// Consumes all of `symbols`, which must be rotated to the
    /// correct phase, and writes decoded bytes to `output`.
    /// Returns the number of bytes written.
    ///
    /// This method will panic if `output` is shorter than
    /// [`output_capacity(symbols.len())`](crate::output_capacity).
    pub fn decode(
        &mut self,
        metrics: &MetricTable,
        symbols: &SoftSymbols,
        output: &mut [u8],
    ) -> usize {
        let skip = usize::min(self.skip, symbols.len());
        self.skip -= skip;

        let mut written = 0;
        for (i, q) in symbols.iter().skip(skip) {
            for branch in depuncture(self.parity_syms == 1, i, q) {
                self.pending.push(branch);
                self.parity_bits = (self.parity_bits + 1) % BRANCHES_PER_BYTE;

                if self.pending.is_full() {
                    let mut update = [0u8; BRANCHES_PER_UPDATE];
                    update.copy_from_slice(&self.pending);
                    self.decoder.update(metrics, &update);
                    self.pending.clear();
                }

                if self.parity_bits == 0 {
                    if let Some(byte) = self.decoder.extract_byte() {
                        output[written] = byte;
                        written += 1;
                    }
                }
            }
            self.parity_syms = (self.parity_syms + 1) % 2;
        }

        written
    }

    /// Position within the puncturing period
    ///
    /// `0` if the next symbol starts a period.
    pub fn parity_syms(&self) -> u32 {
        self.parity_syms
    }

    /// Position within the current decoded byte, in branch inputs
    pub fn parity_bits(&self) -> u32 {
        self.parity_bits
    }

    /// Underlying trellis decoder
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Symbols remaining to be skipped
    pub fn pending_skip(&self) -> usize {
        self.skip
    }
}

/// Largest possible output for a chunk, in bytes
///
/// A chunk of `symbols` symbols never decodes to more bytes
/// than this, regardless of how it is aligned with the
/// puncturing period or with previous chunks.
pub fn output_capacity(symbols: usize) -> usize {
    // at most 3n + 1 new branch inputs, and up to 14 already
    // counted towards the current byte
    (3 * symbols + 16) / BRANCHES_PER_BYTE as usize
}
