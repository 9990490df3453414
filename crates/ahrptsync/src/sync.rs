//! Phase and shift synchronization controller

#[cfg(not(test))]
use log::{debug, info, trace};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as trace;

use num_complex::Complex;
use strum::IntoEnumIterator;

use crate::builder::ViterbiSyncBuilder;
use crate::hypothesis::{HypothesisTester, TEST_LEN};
use crate::metric::MetricTable;
use crate::quantize::{Phase, Shift, SoftSymbols};
use crate::streaming::{output_capacity, StreamingDecoder};
use crate::trellis::{RegisterExchangeDecoder, TrellisDecoder};

/// Synchronizer state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum SyncState {
    /// Searching for the phase and shift
    ///
    /// No bytes are decoded.
    #[strum(serialize = "idle")]
    Idle,

    /// Locked to a phase and shift
    ///
    /// Every symbol is decoded.
    #[strum(serialize = "synced")]
    Synced,
}

/// Viterbi synchronizer and decoder
///
/// Accepts chunks of complex baseband samples, one sample
/// per symbol, from a QPSK demodulator which may have locked
/// to the carrier at the wrong phase. Outputs the decoded
/// bytes of the rate 3/4 punctured convolutional code.
///
/// While [idle](SyncState::Idle), each chunk is searched for
/// a phase and shift hypothesis which decodes cleanly. The
/// hypotheses are tried in a fixed order:
///
/// 1. 0°, even
/// 2. 90°, even
/// 3. 0°, odd
/// 4. 90°, odd
///
/// The first one with a bit error rate under the threshold
/// wins. Decoding begins with the *next* chunk.
///
/// While [synced](SyncState::Synced), each chunk is first
/// re-measured under the locked hypothesis. If too many
/// consecutive chunks measure badly, the synchronizer drops
/// back to idle. Otherwise, every symbol of the chunk is
/// decoded.
///
/// ```
/// use ahrptsync::{modulate, output_capacity, Phase, Shift, SyncState, ViterbiSyncBuilder};
///
/// let data: Vec<u8> = (0..400u32).map(|i| (i * 7919 % 251) as u8).collect();
/// let samples = modulate(&data, Phase::Deg90, Shift::Odd);
///
/// let mut sync = ViterbiSyncBuilder::default().build();
/// let mut out = vec![0u8; output_capacity(1024)];
/// for chunk in samples.chunks(1024) {
///     let len = sync.work(chunk, &mut out);
///     println!("{}: {} bytes", sync.state(), len);
/// }
/// assert_eq!(SyncState::Synced, sync.state());
/// assert_eq!(Some(Phase::Deg90), sync.phase());
/// ```
///
/// The synchronizer is generic over its
/// [`TrellisDecoder`]. It owns three of them: one for
/// decoding and one for each phase hypothesis under test.
#[derive(Clone, Debug)]
pub struct ViterbiSync<D = RegisterExchangeDecoder> {
    metrics: MetricTable,
    sync_check: bool,
    ber_threshold: f32,
    insync_after: u32,
    outsync_after: u32,
    reset_after: u32,

    // trial decoders, indexed by phase hypothesis
    test_decoders: [D; 2],
    tester: HypothesisTester,
    streaming: StreamingDecoder<D>,

    // scratch buffers
    quantized: SoftSymbols,
    rotated: SoftSymbols,

    state: SyncState,
    phase: Phase,

    // alignment of the next chunk's first symbol
    shift: Shift,
    invalid_count: u32,
    decode_enabled: bool,
    last_ber: Option<f32>,
    chunk_counter: u64,
}

impl<D> ViterbiSync<D>
where
    D: TrellisDecoder,
{
    /// Create with caller-supplied trellis decoders
    ///
    /// `main` decodes the stream, and `tests` are used for
    /// trial decodes. All decoders are reset. Use a
    /// [`ViterbiSyncBuilder`] to create a synchronizer with
    /// the default decoder.
    pub fn with_decoders(cfg: &ViterbiSyncBuilder, main: D, tests: [D; 2]) -> Self {
        let (code_rate, ebn0_db) = cfg.channel_model();
        let mut out = Self {
            metrics: MetricTable::from_code_rate(code_rate, ebn0_db),
            sync_check: cfg.sync_check(),
            ber_threshold: cfg.ber_threshold(),
            insync_after: cfg.insync_after(),
            outsync_after: cfg.outsync_after(),
            reset_after: cfg.reset_after(),
            test_decoders: tests,
            tester: HypothesisTester::new(),
            streaming: StreamingDecoder::new(main),
            quantized: SoftSymbols::with_capacity(TEST_LEN),
            rotated: SoftSymbols::with_capacity(TEST_LEN),
            state: SyncState::Idle,
            phase: Phase::Deg0,
            shift: Shift::Even,
            invalid_count: 0,
            decode_enabled: false,
            last_ber: None,
            chunk_counter: 0,
        };
        out.reset();
        out
    }

    /// Process a chunk of samples
    ///
    /// Consumes all of `input`, which are complex samples at
    /// one sample per symbol, nominally `±1.0` on each axis.
    /// Writes decoded bytes to `output` and returns the
    /// number written. Returns zero unless the synchronizer
    /// was already synced at the start of this chunk.
    ///
    /// Chunks must be given in stream order, without gaps.
    /// They may be any length, but chunks shorter than 256
    /// symbols cannot be used for acquisition or for
    /// monitoring the sync.
    ///
    /// When decoding, this method will panic if `output` is
    /// shorter than
    /// [`output_capacity(input.len())`](crate::output_capacity).
    /// At rate 3/4, that is about `3 * input.len() / 16`
    /// bytes, so a buffer of `input.len() / 8` bytes is *not*
    /// large enough. Idle chunks never write to `output`.
    pub fn work(&mut self, input: &[Complex<f32>], output: &mut [u8]) -> usize {
        self.chunk_counter = self.chunk_counter.wrapping_add(1);
        self.quantized.quantize_from(input);

        match self.state {
            SyncState::Idle => {
                self.acquire();
                0
            }
            SyncState::Synced => self.track(output),
        }
    }

    /// Clear all state and return to idle
    ///
    /// All decoders and counters are reset. The configuration
    /// is retained.
    pub fn reset(&mut self) {
        self.drop_sync();
        self.test_decoders.iter_mut().for_each(|dec| dec.reset());
        self.last_ber = None;
        self.chunk_counter = 0;
    }

    /// Synchronizer state
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Locked phase hypothesis, if synced
    pub fn phase(&self) -> Option<Phase> {
        match self.state {
            SyncState::Idle => None,
            SyncState::Synced => Some(self.phase),
        }
    }

    /// Locked shift hypothesis, if synced
    ///
    /// The shift is reported for the first symbol of the
    /// *next* chunk. A chunk with an odd number of symbols
    /// toggles it.
    pub fn shift(&self) -> Option<Shift> {
        match self.state {
            SyncState::Idle => None,
            SyncState::Synced => Some(self.shift),
        }
    }

    /// Consecutive bad measurements while synced
    pub fn invalid_count(&self) -> u32 {
        self.invalid_count
    }

    /// Most recent conclusive bit error rate measurement
    ///
    /// While idle, this is the last hypothesis tested.
    pub fn last_ber(&self) -> Option<f32> {
        self.last_ber
    }

    /// Chunks processed since reset
    pub fn chunk_counter(&self) -> u64 {
        self.chunk_counter
    }

    /// Monitor the sync while decoding
    pub fn sync_check(&self) -> bool {
        self.sync_check
    }

    /// Bit error rate threshold
    pub fn ber_threshold(&self) -> f32 {
        self.ber_threshold
    }

    /// Good measurements before sync is declared
    pub fn insync_after(&self) -> u32 {
        self.insync_after
    }

    /// Bad measurements before sync is dropped
    pub fn outsync_after(&self) -> u32 {
        self.outsync_after
    }

    /// Reset interval
    pub fn reset_after(&self) -> u32 {
        self.reset_after
    }

    // Search the quantized chunk for a hypothesis
    //
    // Shift is the outer loop. The first hypothesis under
    // the threshold is locked, and the decoder is started
    // at the beginning of the next chunk.
    fn acquire(&mut self) {
        let chunk_len = self.quantized.len();
        for shift in Shift::iter() {
            for phase in Phase::iter() {
                let ber = match self.measure(phase, shift) {
                    Some(ber) => ber,
                    None => {
                        trace!(
                            "sync [{:<8}]: chunk of {} too short to test",
                            self.chunk_counter,
                            chunk_len
                        );
                        return;
                    }
                };

                debug!(
                    "sync [{:<8}]: hypothesis ({}, {}): ber {:0.3}",
                    self.chunk_counter, phase, shift, ber
                );

                if ber < self.ber_threshold {
                    self.lock(phase, shift, chunk_len);
                    return;
                }
            }
        }
    }

    // Enter sync with the given hypothesis
    //
    // The hypothesis applies to the current chunk of
    // `chunk_len` symbols, which is not decoded.
    fn lock(&mut self, phase: Phase, shift: Shift, chunk_len: usize) {
        self.streaming.reset();
        self.state = SyncState::Synced;
        self.phase = phase;
        self.shift = shift.realign(chunk_len);
        self.invalid_count = 0;
        self.decode_enabled = true;
        self.streaming.start(self.shift.offset());

        info!(
            "sync [{:<8}]: acquired phase {}, shift {} (ber {:0.3})",
            self.chunk_counter,
            phase,
            shift,
            self.last_ber.unwrap_or(0.0)
        );
    }

    // Monitor and decode the quantized chunk
    fn track(&mut self, output: &mut [u8]) -> usize {
        let chunk_len = self.quantized.len();

        if self.sync_check {
            match self.measure(self.phase, self.shift) {
                Some(ber) if ber > self.ber_threshold => {
                    self.invalid_count += 1;
                    debug!(
                        "sync [{:<8}]: ber {:0.3} out of tolerance ({} of {})",
                        self.chunk_counter, ber, self.invalid_count, self.outsync_after
                    );
                    if self.invalid_count > self.outsync_after {
                        info!(
                            "sync [{:<8}]: lost sync after {} bad chunks",
                            self.chunk_counter, self.invalid_count
                        );
                        self.drop_sync();
                        return 0;
                    }
                }
                Some(_) => {
                    self.invalid_count = 0;
                    self.decode_enabled = true;
                }
                None => {}
            }
        }

        let mut written = 0;
        if self.decode_enabled {
            assert!(
                output.len() >= output_capacity(chunk_len),
                "output buffer too small: {} < {}",
                output.len(),
                output_capacity(chunk_len)
            );

            self.rotated
                .rotate_from(&self.quantized, self.phase, usize::MAX);
            written = self
                .streaming
                .decode(&self.metrics, &self.rotated, output);
        }

        trace!(
            "sync [{:<8}]: decoded {} bytes, parity ({}, {})",
            self.chunk_counter,
            written,
            self.streaming.parity_syms(),
            self.streaming.parity_bits()
        );

        self.shift = self.shift.realign(chunk_len);
        written
    }

    // Trial decode of the test window under a hypothesis
    fn measure(&mut self, phase: Phase, shift: Shift) -> Option<f32> {
        self.rotated.rotate_from(&self.quantized, phase, TEST_LEN);
        let decoder = &mut self.test_decoders[phase as usize];
        let ber = self
            .tester
            .measure(decoder, &self.metrics, &self.rotated, shift)?;
        self.last_ber = Some(ber);
        Some(ber)
    }

    // Return to idle without touching telemetry
    fn drop_sync(&mut self) {
        self.streaming.reset();
        self.state = SyncState::Idle;
        self.phase = Phase::Deg0;
        self.shift = Shift::Even;
        self.invalid_count = 0;
        self.decode_enabled = false;
    }
}

impl From<&ViterbiSyncBuilder> for ViterbiSync {
    /// Create the synchronizer from its Builder
    fn from(cfg: &ViterbiSyncBuilder) -> Self {
        Self::with_decoders(
            cfg,
            RegisterExchangeDecoder::new(),
            [RegisterExchangeDecoder::new(), RegisterExchangeDecoder::new()],
        )
    }
}
