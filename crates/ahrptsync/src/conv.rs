//! Reference convolutional encoder
//!
//! The downlink uses the constraint length 7, rate 1/2
//! code with generator polynomials 171 and 133 (octal).
//! Here, the polynomials are written for a shift register
//! which accepts new bits at the least significant end.

/// First generator polynomial
pub const POLY_A: u32 = 0x4f;

/// Second generator polynomial
pub const POLY_B: u32 = 0x6d;

/// Constraint length, in bits
pub const CONSTRAINT_LENGTH: u32 = 7;

/// Number of trellis states
pub const NUM_STATES: usize = 1 << (CONSTRAINT_LENGTH - 1);

// Mask for the encoder shift register
const REGISTER_MASK: u32 = (1 << CONSTRAINT_LENGTH) - 1;

// Encoder outputs for every shift register value
//
// Bit 1 holds the output of `POLY_A`, and bit 0 holds the
// output of `POLY_B`.
const BRANCH_TABLE: [u8; 1 << CONSTRAINT_LENGTH] = make_branch_table();

/// Encoder outputs for the given shift register contents
///
/// Returns the pair of encoded bits `(c0, c1)` which the
/// encoder emits when its shift register contains
/// `register`. The newest input bit is the least
/// significant bit of `register`.
#[inline]
pub fn branch_outputs(register: u32) -> (u8, u8) {
    let out = BRANCH_TABLE[(register & REGISTER_MASK) as usize];
    (out >> 1, out & 0x01)
}

/// Convolutional encoder
///
/// Emits two encoded bits for every input bit. The encoder
/// is a simple shift register, so it may be fed bit-by-bit
/// across any number of calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConvEncoder {
    register: u32,
}

impl ConvEncoder {
    /// New encoder with an all-zero shift register
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        self.register = 0;
    }

    /// Encode one bit
    ///
    /// Shifts the least significant bit of `bit` into the
    /// register and returns the encoded pair `(c0, c1)`.
    #[inline]
    pub fn push(&mut self, bit: u8) -> (u8, u8) {
        self.register = ((self.register << 1) | (bit & 0x01) as u32) & REGISTER_MASK;
        branch_outputs(self.register)
    }

    /// Encode one byte, most significant bit first
    pub fn push_byte(&mut self, byte: u8) -> [(u8, u8); 8] {
        let mut out = [(0u8, 0u8); 8];
        for (i, o) in out.iter_mut().enumerate() {
            *o = self.push(byte >> (7 - i));
        }
        out
    }
}

const fn make_branch_table() -> [u8; 1 << CONSTRAINT_LENGTH] {
    let mut out = [0u8; 1 << CONSTRAINT_LENGTH];
    let mut i = 0;
    while i < out.len() {
        let a = (i as u32 & POLY_A).count_ones() & 0x01;
        let b = (i as u32 & POLY_B).count_ones() & 0x01;
        out[i] = ((a << 1) | b) as u8;
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impulse_response() {
        // a single one bit walks through the register and
        // reads out the polynomial taps
        let mut enc = ConvEncoder::new();
        let mut c0 = vec![];
        let mut c1 = vec![];
        for i in 0..CONSTRAINT_LENGTH {
            let (a, b) = enc.push((i == 0) as u8);
            c0.push(a);
            c1.push(b);
        }
        assert_eq!(c0, vec![1, 1, 1, 1, 0, 0, 1]);
        assert_eq!(c1, vec![1, 0, 1, 1, 0, 1, 1]);

        // and then it is flushed
        assert_eq!((0, 0), enc.push(0));
    }

    #[test]
    fn test_push_byte() {
        let mut enc = ConvEncoder::new();
        assert_eq!([(0, 0); 8], enc.push_byte(0x00));

        // bytes are encoded MSB first
        let mut enc = ConvEncoder::new();
        let out = enc.push_byte(0x80);
        assert_eq!((1, 1), out[0]);
        assert_eq!((1, 0), out[1]);
        assert_eq!((1, 1), out[6]);
        assert_eq!((0, 0), out[7]);

        enc.reset();
        assert_eq!(ConvEncoder::new(), enc);
    }

    #[test]
    fn test_complement_transparency() {
        // both polynomials have odd weight, so inverting the
        // input inverts both outputs once the register is full
        let mut enc = ConvEncoder::new();
        let mut enc_inv = ConvEncoder::new();
        for _i in 0..CONSTRAINT_LENGTH {
            enc.push(0);
            enc_inv.push(1);
        }
        for bit in [1u8, 0, 0, 1, 1, 1, 0, 1] {
            let (a, b) = enc.push(bit);
            let (ai, bi) = enc_inv.push(bit ^ 1);
            assert_eq!((a ^ 1, b ^ 1), (ai, bi));
        }
    }
}
