//! Decoding loop
//!
//! Reads fixed-size chunks of symbols from the input, runs
//! each of them through the synchronizer, and writes out
//! whatever it decodes. The synchronizer's state is checked
//! after every chunk so that sync changes can be reported.
//!
//! ```txt
//!   start
//!   ||
//!   \/
//! +-------------+  clean trial decode   +--------------+
//! |    Idle     | ====================> |    Synced    | ==> bytes
//! +-------------+                       +--------------+
//!        /\                                   ||
//!        ||=== too many bad chunks in a row ==||
//! ```

use std::fmt;
use std::io::{self, Read, Write};

use anyhow::{anyhow, Context};
use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, info, warn};
use num_complex::Complex;

use ahrptsync::{
    modulate, output_capacity, soft_to_complex, Phase, SampleFormat, Shift, SyncState,
    ViterbiSync,
};

use crate::cli::Args;

/// Message embedded in the `--demo` signal
const DEMO_MESSAGE: &[u8] = b"AHRPT DEMO MESSAGE";

/// Length of the `--demo` data, in bytes
const DEMO_LEN: usize = 6144;

/// Totals for one run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Chunks processed
    pub chunks: u64,

    /// Symbols read
    pub symbols: u64,

    /// Decoded bytes written
    pub bytes: u64,

    /// Number of times sync was acquired
    pub acquisitions: u32,

    /// Number of times sync was lost
    pub losses: u32,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} symbols in {} chunks, {} bytes decoded, sync acquired {} times and lost {} times",
            self.symbols, self.chunks, self.bytes, self.acquisitions, self.losses
        )
    }
}

/// Run the application
///
/// Reads symbols in the `args.format` from `input`, in chunks
/// of `args.chunk` symbols, until it is exhausted. Decoded
/// bytes are written to `output`, which is flushed before
/// returning.
pub fn run<R, W>(
    args: &Args,
    sync: &mut ViterbiSync,
    input: &mut R,
    output: &mut W,
) -> Result<Summary, anyhow::Error>
where
    R: Read,
    W: Write,
{
    let chunk_len = args.chunk as usize;
    let mut samples = Vec::with_capacity(chunk_len);
    let mut decoded = vec![0u8; output_capacity(chunk_len)];
    let mut summary = Summary::default();
    let mut last_state = sync.state();

    loop {
        read_chunk(input, args.format, chunk_len, &mut samples)?;
        if samples.is_empty() {
            break;
        }

        let len = sync.work(&samples, &mut decoded);
        output
            .write_all(&decoded[0..len])
            .context("Unable to write decoded bytes")?;

        summary.chunks += 1;
        summary.symbols += samples.len() as u64;
        summary.bytes += len as u64;

        let state = sync.state();
        if state != last_state {
            match state {
                SyncState::Synced => {
                    summary.acquisitions += 1;
                    info!(
                        "decoder [{:<14}]: sync acquired with phase {} and shift {}",
                        summary.symbols,
                        sync.phase().map(|p| p.to_string()).unwrap_or_default(),
                        sync.shift().map(|s| s.to_string()).unwrap_or_default()
                    );
                }
                SyncState::Idle => {
                    summary.losses += 1;
                    info!("decoder [{:<14}]: sync lost", summary.symbols);
                }
            }
            last_state = state;
        }

        debug!(
            "decoder [{:<14}]: {}, ber {}, {} bytes",
            summary.symbols,
            state,
            sync.last_ber()
                .map(|ber| format!("{:0.3}", ber))
                .unwrap_or_else(|| "-".to_owned()),
            len
        );
    }

    output.flush().context("Unable to flush output")?;
    Ok(summary)
}

/// Decode the demonstration signal
///
/// Modulates a demonstration message with a 90° phase error
/// and an odd shift, and decodes it with `sync` as if it had
/// been read from the input. Returns an error if the message
/// is not recovered.
pub fn demo(args: &Args, sync: &mut ViterbiSync) -> Result<(), anyhow::Error> {
    warn!("demonstration (--demo) mode: decoding a built-in signal");

    let mut input = vec![];
    for sa in modulate(&demo_data(), Phase::Deg90, Shift::Odd) {
        input.write_f32::<NativeEndian>(sa.re)?;
        input.write_f32::<NativeEndian>(sa.im)?;
    }

    let mut cfg = args.clone();
    cfg.format = SampleFormat::ComplexF32;

    let mut decoded = vec![];
    let summary = run(&cfg, sync, &mut io::Cursor::new(input), &mut decoded)?;
    let found = count_message(&decoded, DEMO_MESSAGE);
    info!("{}", summary);

    if !args.quiet {
        println!(
            "demo: decoded {} bytes, found \"{}\" {} times",
            summary.bytes,
            String::from_utf8_lossy(DEMO_MESSAGE),
            found
        );
    }

    if found > 0 {
        Ok(())
    } else {
        Err(anyhow!("demonstration message was not recovered"))
    }
}

// Read one chunk of up to `len` samples
//
// `out` is cleared first. It is left empty if the input is
// exhausted. A trailing partial `cf32` sample is discarded.
fn read_chunk<R>(
    input: &mut R,
    format: SampleFormat,
    len: usize,
    out: &mut Vec<Complex<f32>>,
) -> Result<(), anyhow::Error>
where
    R: Read,
{
    out.clear();

    let mut raw = Vec::with_capacity(len * format.bytes_per_sample());
    input
        .by_ref()
        .take((len * format.bytes_per_sample()) as u64)
        .read_to_end(&mut raw)
        .context("Unable to read input")?;

    match format {
        SampleFormat::ComplexF32 => {
            for mut sa in raw.chunks_exact(format.bytes_per_sample()) {
                out.push(read_cf32(&mut sa)?);
            }
        }
        SampleFormat::SoftI8 => {
            let soft: Vec<i8> = raw.iter().map(|val| *val as i8).collect();
            out.extend(soft_to_complex(&soft).context("Input ended in the middle of a symbol")?);
        }
    }

    Ok(())
}

#[inline]
fn read_cf32<R>(input: &mut R) -> io::Result<Complex<f32>>
where
    R: Read,
{
    let re = input.read_f32::<NativeEndian>()?;
    let im = input.read_f32::<NativeEndian>()?;
    Ok(Complex::new(re, im))
}

// Demonstration data
//
// Pseudorandom bytes with `DEMO_MESSAGE` written every 256
// bytes, starting from byte 512.
fn demo_data() -> Vec<u8> {
    let mut data: Vec<u8> = (0..DEMO_LEN).map(|i| (i * 7919 % 251) as u8).collect();
    for start in (512..DEMO_LEN - DEMO_MESSAGE.len()).step_by(256) {
        data[start..start + DEMO_MESSAGE.len()].copy_from_slice(DEMO_MESSAGE);
    }
    data
}

// Count occurrences of `needle` in a bitstream
//
// The decoded bitstream has no byte alignment, so all
// eight bit shifts of `haystack` are searched.
fn count_message(haystack: &[u8], needle: &[u8]) -> usize {
    let mut count = 0;
    for shift in 0..8u32 {
        let shifted: Vec<u8> = if shift == 0 {
            haystack.to_vec()
        } else {
            haystack
                .windows(2)
                .map(|pair| (pair[0] << shift) | (pair[1] >> (8 - shift)))
                .collect()
        };
        count += shifted
            .windows(needle.len())
            .filter(|win| *win == needle)
            .count();
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    use ahrptsync::ViterbiSyncBuilder;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["ahrptdec"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("bad args")
    }

    #[test]
    fn test_read_chunk() {
        let mut bytes = vec![];
        for val in [1.0f32, -1.0, 0.5, 0.25, 2.0] {
            bytes.write_f32::<NativeEndian>(val).expect("write");
        }

        let mut input = io::Cursor::new(bytes);
        let mut out = vec![];
        read_chunk(&mut input, SampleFormat::ComplexF32, 1, &mut out).expect("read");
        assert_eq!(vec![Complex::new(1.0f32, -1.0f32)], out);
        assert_eq!(8, input.position());

        // trailing partial sample is dropped
        read_chunk(&mut input, SampleFormat::ComplexF32, 8, &mut out).expect("read");
        assert_eq!(vec![Complex::new(0.5f32, 0.25f32)], out);

        read_chunk(&mut input, SampleFormat::ComplexF32, 8, &mut out).expect("read");
        assert!(out.is_empty());
    }

    #[test]
    fn test_read_chunk_soft() {
        let mut input = io::Cursor::new(vec![127u8, 0x81, 0, 0, 127]);
        let mut out = vec![];
        read_chunk(&mut input, SampleFormat::SoftI8, 2, &mut out).expect("read");
        assert_eq!(
            vec![Complex::new(1.0f32, -1.0f32), Complex::new(0.0f32, 0.0f32)],
            out
        );
        assert_eq!(4, input.position());

        // an unpaired trailing value is an error
        assert!(read_chunk(&mut input, SampleFormat::SoftI8, 2, &mut out).is_err());
    }

    #[test]
    fn test_count_message() {
        assert_eq!(1, count_message(b"xxABCxx", b"ABC"));
        assert_eq!(0, count_message(b"xxABxCxx", b"ABC"));

        // shifted right by three bits
        let msg = b"\x00ABC\x00";
        let shifted: Vec<u8> = msg
            .windows(2)
            .map(|pair| (pair[0] << 5) | (pair[1] >> 3))
            .collect();
        let mut prefixed = vec![msg[0] >> 3];
        prefixed.extend(shifted);
        assert_eq!(1, count_message(&prefixed, b"ABC"));
    }

    #[test]
    fn test_run_soft_symbols() {
        let cfg = args(&["--format", "i8", "--chunk", "1024"]);
        let data: Vec<u8> = demo_data();
        let mut input = vec![];
        for sa in modulate(&data, Phase::Deg0, Shift::Even) {
            input.push((sa.re * 127.0) as i8 as u8);
            input.push((sa.im * 127.0) as i8 as u8);
        }

        let mut sync = ViterbiSyncBuilder::default().build();
        let mut out = vec![];
        let summary =
            run(&cfg, &mut sync, &mut io::Cursor::new(input), &mut out).expect("run failed");
        assert_eq!(1, summary.acquisitions);
        assert_eq!(0, summary.losses);
        assert_eq!(summary.bytes as usize, out.len());

        // byte 192 onwards, minus the decoder's delay
        assert_eq!(&data[193..192 + out.len()], &out[1..]);
    }

    #[test]
    fn test_demo() {
        for chunk in ["8192", "1000"] {
            let cfg = args(&["--demo", "--chunk", chunk, "-q"]);
            let mut sync = ViterbiSyncBuilder::default().build();
            demo(&cfg, &mut sync).expect("demo failed");
            assert_eq!(SyncState::Synced, sync.state());
        }
    }

    #[test]
    fn test_demo_data() {
        let data = demo_data();
        assert_eq!(DEMO_LEN, data.len());
        assert_eq!(22, count_message(&data, DEMO_MESSAGE));
    }
}
