//! # ahrptsync: Viterbi sync for punctured QPSK downlinks
//!
//! This crate resolves the carrier phase ambiguity of a QPSK
//! demodulator and decodes the rate 3/4 punctured
//! convolutional code used by the
//! [AHRPT](https://en.wikipedia.org/wiki/Advanced_High-Resolution_Picture_Transmission)
//! downlink of polar-orbiting weather satellites. It accepts
//! chunks of demodulated symbols and outputs a continuous
//! decoded bitstream, ready for a frame deframer.
//!
//! ## Disclaimer
//!
//! This crate is dual-licensed MIT and Apache 2.0. Read these licenses
//! carefully as they may affect your rights.
//!
//! ## Example
//!
//! You will first need to recover *symbols* from the downlink
//! with a QPSK demodulator, at one complex sample per symbol.
//! Obtaining the symbols is beyond the scope of this crate.
//! The demodulator is free to lock to the carrier at the
//! wrong phase: that is what this crate is for.
//!
//! ```
//! use ahrptsync::{output_capacity, SyncState, ViterbiSyncBuilder};
//! use num_complex::Complex;
//!
//! # let some_symbol_source = || std::iter::once(vec![Complex::new(0.0f32, 0.0f32); 1024]);
//! #
//! // create a synchronizer
//! let mut sync = ViterbiSyncBuilder::new()
//!     .with_ber_threshold(0.17)   // lock when the trial decode is this good
//!     .with_outsync_after(5)      // bad chunks permitted before re-acquiring
//!     .build();
//!
//! // let symbols be an iterator over chunks of demodulated
//! // symbols, as Vec<Complex<f32>>
//! let symbols = some_symbol_source();
//! let mut decoded = vec![];
//! for chunk in symbols {
//!     decoded.resize(output_capacity(chunk.len()), 0u8);
//!     let len = sync.work(&chunk, &mut decoded);
//!     if sync.state() == SyncState::Synced {
//!         // hand decoded[0..len] to your deframer
//!     }
//! }
//! ```
//!
//! The synchronizer is created via a
//! [builder](struct.ViterbiSyncBuilder.html).
//!
//! The [`ViterbiSync`](struct.ViterbiSync.html) tests a
//! handful of phase and symbol-pairing hypotheses on each
//! chunk until one of them produces a clean trial decode.
//! It then decodes every following symbol, and it keeps
//! checking that the decode stays clean. If the signal is
//! lost for long enough, the synchronizer starts over.
//!
//! Bytes are only ever output while synced. The first byte
//! after each acquisition is unreliable and should be
//! discarded. There are no framing guarantees: the output
//! is a bitstream which is continuous and correctly
//! ordered, but its byte boundaries are wherever the
//! acquisition happened to put them.
//!
//! ## Background
//!
//! The downlink's data is convolutionally encoded with a
//! constraint length 7, rate 1/2 code and punctured to rate
//! 3/4. Every three input bits produce two QPSK symbols. A
//! receiver which does not know where those pairs begin, or
//! which of its axes is in-phase, cannot decode anything.
//!
//! Trial decoding sorts this out. Under the correct
//! hypothesis, re-encoding the decoded bits reproduces the
//! received bits up to the channel error rate. Under a wrong
//! one, about a fifth of them disagree.
//!
//! Only the 0° and 90° hypotheses are tested. The other two
//! rotations invert the data, which the code cannot detect;
//! the deframer is expected to resolve it.

mod builder;
mod conv;
mod hypothesis;
mod metric;
mod puncture;
mod quantize;
mod soft;
mod streaming;
mod sync;
mod trellis;
mod waveform;

pub use builder::ViterbiSyncBuilder;
pub use conv::{ConvEncoder, CONSTRAINT_LENGTH, NUM_STATES, POLY_A, POLY_B};
pub use hypothesis::{HypothesisTester, MIN_TEST_LEN, TEST_LEN};
pub use metric::{MetricTable, SOFT_AMPLITUDE, SOFT_OFFSET};
pub use puncture::{depuncture, Puncturer, ERASURE};
pub use quantize::{quantize, rotate, Phase, Shift, SoftSymbols};
pub use soft::{soft_to_complex, SampleFormat, SoftSymbolErr, UnknownSampleFormat};
pub use streaming::{output_capacity, StreamingDecoder};
pub use sync::{SyncState, ViterbiSync};
pub use trellis::{RegisterExchangeDecoder, TrellisDecoder, BRANCHES_PER_UPDATE};
pub use waveform::modulate;
