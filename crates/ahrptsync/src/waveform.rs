//! Reference modulator for the punctured downlink

use num_complex::Complex;

use crate::conv::ConvEncoder;
use crate::puncture::Puncturer;
use crate::quantize::{Phase, Shift};

/// Modulate bytes into baseband symbols
///
/// Encodes `data`, most significant bit first, with the
/// [reference encoder](crate::ConvEncoder), punctures it to
/// rate 3/4, and maps each symbol bit to `+1.0` (one) or
/// `-1.0` (zero). One complex sample is emitted per symbol.
///
/// The output is then distorted so that the given hypotheses
/// are the ones which recover it:
///
/// * `Phase::Deg90` rotates every sample by +90°
/// * `Shift::Odd` prefixes one filler sample
///
/// Any partial puncturing period at the end of `data` is
/// not emitted.
pub fn modulate(data: &[u8], phase: Phase, shift: Shift) -> Vec<Complex<f32>> {
    let channel = match phase {
        Phase::Deg0 => Complex::new(1.0f32, 0.0f32),
        Phase::Deg90 => Complex::new(0.0f32, 1.0f32),
    };

    let mut out = Vec::with_capacity(shift.offset() + data.len() * 16 / 3);
    for _i in 0..shift.offset() {
        out.push(Complex::new(0.0f32, 0.0f32));
    }

    let mut encoder = ConvEncoder::new();
    let mut puncturer = Puncturer::new();
    for byte in data {
        for (c0, c1) in encoder.push_byte(*byte) {
            if let Some((i, q)) = puncturer.push(c0, c1) {
                out.push(Complex::new(antipodal(i), antipodal(q)) * channel);
            }
        }
    }

    out
}

#[inline]
fn antipodal(bit: u8) -> f32 {
    if bit == 1 {
        1.0f32
    } else {
        -1.0f32
    }
}

/// Repeatable pseudorandom test data
///
/// Generates `len` bytes from a xorshift generator with the
/// given nonzero `seed`.
#[cfg(test)]
pub fn test_bytes(seed: u32, len: usize) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// Repeatable pseudorandom QPSK samples
///
/// These samples do not carry a valid codeword.
#[cfg(test)]
pub fn test_noise(seed: u32, len: usize) -> Vec<Complex<f32>> {
    test_bytes(seed, len)
        .iter()
        .map(|byte| Complex::new(antipodal(byte >> 7), antipodal((byte >> 6) & 0x01)))
        .collect()
}
