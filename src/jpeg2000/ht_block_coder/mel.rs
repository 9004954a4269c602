/// Magnitude Exponent Logic (MEL) encoder.
/// Adaptive run-length coder for the significance of quads in the all-zero
/// context, per ISO/IEC 15444-15.

/// Run-length exponent for each of the 13 MEL states.
const MEL_EXPONENTS: [u8; 13] = [0, 0, 0, 1, 1, 1, 2, 2, 2, 3, 3, 4, 5];

pub struct MelEncoder {
    buffer: Vec<u8>,
    current_byte: u8,
    bits_in_byte: u8,
    /// 8, or 7 after a 0xFF byte.
    byte_capacity: u8,
    k: usize, // State index
    run: u32, // Zeros accumulated in the current run
}

impl MelEncoder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            current_byte: 0,
            bits_in_byte: 0,
            byte_capacity: 8,
            k: 0,
            run: 0,
        }
    }

    fn write_bit(&mut self, bit: u8) {
        self.current_byte = (self.current_byte << 1) | (bit & 1);
        self.bits_in_byte += 1;
        if self.bits_in_byte == self.byte_capacity {
            self.push_byte();
        }
    }

    fn push_byte(&mut self) {
        self.buffer.push(self.current_byte);
        self.byte_capacity = if self.current_byte == 0xFF { 7 } else { 8 };
        self.current_byte = 0;
        self.bits_in_byte = 0;
    }

    /// Encode one MEL symbol; `significant` is true when the quad holds at
    /// least one non-zero sample.
    pub fn encode(&mut self, significant: bool) {
        let exponent = MEL_EXPONENTS[self.k];
        if !significant {
            self.run += 1;
            if self.run == 1 << exponent {
                // Full run
                self.write_bit(1);
                self.run = 0;
                self.k = (self.k + 1).min(12);
            }
        } else {
            // Broken run: 0 followed by the run length
            self.write_bit(0);
            for i in (0..exponent).rev() {
                self.write_bit(((self.run >> i) & 1) as u8);
            }
            self.run = 0;
            self.k = self.k.saturating_sub(1);
        }
    }

    /// Terminates a pending run and returns the byte stream.
    pub fn finish(mut self) -> Vec<u8> {
        if self.run > 0 {
            self.write_bit(1);
        }
        if self.bits_in_byte > 0 {
            self.current_byte <<= self.byte_capacity - self.bits_in_byte;
            self.push_byte();
        }
        self.buffer
    }
}

impl Default for MelEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mel_runs_adapt_state() {
        let mut mel = MelEncoder::new();
        // k=0..2 have exponent 0: every zero completes a run.
        mel.encode(false);
        mel.encode(false);
        mel.encode(false);
        assert_eq!(mel.k, 3);
        // Exponent 1: two zeros per run.
        mel.encode(false);
        assert_eq!(mel.k, 3);
        mel.encode(true);
        assert_eq!(mel.k, 2);
        // Bits: 1 1 1 | 0 1
        assert_eq!(mel.finish(), vec![0b1110_1000]);
    }

    #[test]
    fn test_pending_run_is_terminated() {
        let mut mel = MelEncoder::new();
        for _ in 0..3 {
            mel.encode(false);
        }
        mel.encode(false);
        assert_eq!(mel.finish(), vec![0b1111_0000]);
    }

    #[test]
    fn test_empty_stream() {
        assert!(MelEncoder::new().finish().is_empty());
    }
}
