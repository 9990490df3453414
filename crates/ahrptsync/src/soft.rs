//! Input sample formats

use std::str::FromStr;

use num_complex::Complex;
use thiserror::Error;

/// Sample encoding of a demodulator's output
///
/// Formats may be converted `from_str()` or `try_from()`
/// their short names, which are also their `Display` form.
///
/// ```
/// use ahrptsync::SampleFormat;
///
/// let fmt = SampleFormat::try_from("i8").expect("bad format");
/// assert_eq!(SampleFormat::SoftI8, fmt);
/// assert_eq!(2, fmt.bytes_per_sample());
/// assert_eq!("i8", fmt.to_string());
/// ```
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
pub enum SampleFormat {
    /// Complex 32-bit float, interleaved `I, Q`
    #[strum(serialize = "cf32")]
    ComplexF32,

    /// Signed 8-bit soft symbols, interleaved `I, Q`
    ///
    /// Full scale is `±127`.
    #[strum(serialize = "i8")]
    SoftI8,
}

impl SampleFormat {
    /// Size of one complex sample, in bytes
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::ComplexF32 => 8,
            SampleFormat::SoftI8 => 2,
        }
    }
}

impl TryFrom<&str> for SampleFormat {
    type Error = UnknownSampleFormat;

    /// Convert from short name, like `cf32`
    fn try_from(inp: &str) -> Result<Self, Self::Error> {
        match inp {
            "cf32" => Ok(SampleFormat::ComplexF32),
            "i8" => Ok(SampleFormat::SoftI8),
            _ => Err(UnknownSampleFormat(inp.to_owned())),
        }
    }
}

impl FromStr for SampleFormat {
    type Err = UnknownSampleFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SampleFormat::try_from(s)
    }
}

/// Sample format was not recognized
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
#[error("unknown sample format \"{0}\": expected \"cf32\" or \"i8\"")]
pub struct UnknownSampleFormat(pub String);

/// Soft symbols could not be converted
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SoftSymbolErr {
    /// Input must contain whole `I, Q` pairs
    #[error("soft symbols must come in I/Q pairs, but {0} values were given")]
    OddLength(usize),
}

/// Convert interleaved soft symbols to complex samples
///
/// `soft` contains `I, Q, I, Q, …` signed soft symbols with
/// a full scale of `±127`. Each pair is scaled to a complex
/// sample with a nominal amplitude of `1.0` on each axis.
pub fn soft_to_complex(soft: &[i8]) -> Result<Vec<Complex<f32>>, SoftSymbolErr> {
    if soft.len() % 2 != 0 {
        return Err(SoftSymbolErr::OddLength(soft.len()));
    }

    Ok(soft
        .chunks_exact(2)
        .map(|iq| Complex::new(iq[0] as f32 / 127.0f32, iq[1] as f32 / 127.0f32))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;
    use strum::IntoEnumIterator;

    use crate::quantize::quantize;

    #[test]
    fn test_sample_format() {
        assert_eq!(Ok(SampleFormat::ComplexF32), SampleFormat::try_from("cf32"));
        assert_eq!(
            Err(UnknownSampleFormat("u8".to_owned())),
            SampleFormat::try_from("u8")
        );
        assert_eq!(Ok(SampleFormat::SoftI8), "i8".parse());
        assert_eq!(
            Err(UnknownSampleFormat("CF32".to_owned())),
            SampleFormat::from_str("CF32")
        );

        for fmt in SampleFormat::iter() {
            let name: &'static str = fmt.into();
            assert_eq!(Ok(fmt), SampleFormat::try_from(name));
            assert_eq!(name, fmt.to_string());
        }
    }

    #[test]
    fn test_soft_to_complex() {
        let out = soft_to_complex(&[127, -127, 0, 64]).expect("bad conversion");
        assert_eq!(2, out.len());
        assert_approx_eq!(1.0f32, out[0].re);
        assert_approx_eq!(-1.0f32, out[0].im);
        assert_approx_eq!(0.0f32, out[1].re);
        assert_approx_eq!(0.5039f32, out[1].im, 1.0e-3f32);

        // full-scale soft symbols quantize like ideal samples
        assert_eq!((228, 28), quantize(out[0]));

        assert_eq!(Ok(vec![]), soft_to_complex(&[]));
        assert_eq!(
            Err(SoftSymbolErr::OddLength(3)),
            soft_to_complex(&[1, 2, 3])
        );
    }
}
