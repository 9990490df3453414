//! Soft-decision branch metrics

/// Soft symbol value which represents "no information"
///
/// Soft symbols are unsigned bytes centered on this value.
/// Values above it lean towards a `1` bit, and values below
/// it lean towards a `0` bit.
pub const SOFT_OFFSET: i32 = 128;

/// Symbol amplitude of the quantizer, in soft symbol units
pub const SOFT_AMPLITUDE: f64 = 100.0;

// Floor for log-likelihoods, in bits
//
// Keeps every table entry finite even when the noise
// assumption makes some soft values all but impossible.
const MIN_LOG_LIKELIHOOD: f64 = -32.0;

/// Branch metric table for 8-bit soft symbols
///
/// The table maps every possible soft symbol value to a
/// pair of integer costs: one for the hypothesis that a
/// `0` bit was transmitted, and one for a `1` bit. Costs are
/// scaled log-likelihoods, so *larger is better*.
///
/// The table is computed once from an assumed signal
/// quality and is immutable afterwards. It is provided by
/// reference to every [`TrellisDecoder`](crate::TrellisDecoder)
/// operation, and it may be shared between any number of
/// decoders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricTable {
    table: Box<[[i32; 256]; 2]>,
}

impl MetricTable {
    /// Compute metric table
    ///
    /// Models a binary antipodal channel with symbols of
    /// `±amplitude` (in soft symbol units, around
    /// [`SOFT_OFFSET`]) and additive gaussian noise at the
    /// given per-symbol signal-to-noise ratio `esn0`
    /// (linear, not dB). Each soft value is treated as a bin
    /// one unit wide. The log-likelihood, minus `bias`, is
    /// multiplied by `scale` and rounded to an integer.
    pub fn new(amplitude: f64, esn0: f64, bias: f64, scale: f64) -> Self {
        let noise = f64::sqrt(0.5 / esn0);
        let mut table = Box::new([[0i32; 256]; 2]);

        for soft in 0..256usize {
            // bin edges, in units of the symbol amplitude
            let lower = match soft {
                0 => f64::NEG_INFINITY,
                _ => (soft as f64 - SOFT_OFFSET as f64 - 0.5) / amplitude,
            };
            let upper = match soft {
                255 => f64::INFINITY,
                _ => (soft as f64 - SOFT_OFFSET as f64 + 0.5) / amplitude,
            };

            // P(soft | bit) for a transmitted -1.0 and +1.0
            let prob = [
                normal_mass((lower + 1.0) / noise, (upper + 1.0) / noise),
                normal_mass((lower - 1.0) / noise, (upper - 1.0) / noise),
            ];
            let total = prob[0] + prob[1];

            for (bit, p) in prob.iter().enumerate() {
                let llr = if total > 0.0 && *p > 0.0 {
                    f64::max(f64::log2(2.0 * p / total), MIN_LOG_LIKELIHOOD)
                } else {
                    MIN_LOG_LIKELIHOOD
                };
                table[bit][soft] = f64::floor((llr - bias) * scale + 0.5) as i32;
            }
        }

        Self { table }
    }

    /// Compute metric table from link parameters
    ///
    /// The per-symbol signal to noise ratio is derived from
    /// the convolutional `code_rate` (i.e., `0.75` for a
    /// rate 3/4 punctured code) and the expected Eb/N0, in dB.
    pub fn from_code_rate(code_rate: f32, ebn0_db: f32) -> Self {
        let esn0 = code_rate as f64 * f64::powf(10.0, ebn0_db as f64 / 10.0);
        Self::new(SOFT_AMPLITUDE, esn0, 0.0, 256.0)
    }

    /// Branch cost of receiving `soft` when `bit` was sent
    #[inline]
    pub fn metric(&self, bit: u8, soft: u8) -> i32 {
        self.table[(bit & 0x01) as usize][soft as usize]
    }
}

// Probability mass of the unit normal distribution in [lower, upper)
//
// Evaluates whichever tail keeps the most precision.
fn normal_mass(lower: f64, upper: f64) -> f64 {
    if lower >= 0.0 {
        upper_tail(lower) - upper_tail(upper)
    } else {
        upper_tail(-upper) - upper_tail(-lower)
    }
}

// Q-function: P(X > x) for a unit normal X
#[inline]
fn upper_tail(x: f64) -> f64 {
    0.5 * libm::erfc(x / std::f64::consts::SQRT_2)
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_normal_mass() {
        assert_approx_eq!(normal_mass(f64::NEG_INFINITY, f64::INFINITY), 1.0f64);
        assert_approx_eq!(normal_mass(f64::NEG_INFINITY, 0.0), 0.5f64);
        assert_approx_eq!(normal_mass(0.0, f64::INFINITY), 0.5f64);
        assert_approx_eq!(normal_mass(-1.0, 1.0), 0.6826894921f64);
        assert_approx_eq!(normal_mass(1.0, 2.0), normal_mass(-2.0, -1.0));
    }

    #[test]
    fn test_metric_table() {
        let table = MetricTable::from_code_rate(0.75, 5.0);

        // strong symbols agree with their bits
        assert_eq!(256, table.metric(1, 255));
        assert_eq!(256, table.metric(0, 0));
        assert_eq!(256, table.metric(1, 228));
        assert!(table.metric(0, 228) < -1000);
        assert!(table.metric(1, 28) < -1000);

        // the erasure value carries no information
        assert_eq!(table.metric(0, 128), table.metric(1, 128));

        // costs are monotonic in the soft value
        for soft in 1..=255u8 {
            assert!(table.metric(1, soft) >= table.metric(1, soft - 1));
            assert!(table.metric(0, soft) <= table.metric(0, soft - 1));
        }
    }

    #[test]
    fn test_metric_table_extreme_snr() {
        // very clean channel: every entry must stay finite
        let table = MetricTable::from_code_rate(0.75, 60.0);
        for soft in 0..=255u8 {
            assert!(table.metric(0, soft) >= (MIN_LOG_LIKELIHOOD * 256.0) as i32);
            assert!(table.metric(1, soft) <= 256);
        }
    }
}
