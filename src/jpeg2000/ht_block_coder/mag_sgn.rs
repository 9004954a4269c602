/// Magnitude and sign (MagSgn) stream.
/// Grows forward from the start of the code-block segment; bits are packed
/// MSB first with a 7-bit byte after every 0xFF.
pub struct MagSgnEncoder {
    buffer: Vec<u8>,
    current_byte: u8,
    bits_in_byte: u8,
    byte_capacity: u8,
}

impl MagSgnEncoder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            current_byte: 0,
            bits_in_byte: 0,
            byte_capacity: 8,
        }
    }

    pub fn write_bit(&mut self, bit: u8) {
        self.current_byte = (self.current_byte << 1) | (bit & 1);
        self.bits_in_byte += 1;
        if self.bits_in_byte == self.byte_capacity {
            self.buffer.push(self.current_byte);
            self.byte_capacity = if self.current_byte == 0xFF { 7 } else { 8 };
            self.current_byte = 0;
            self.bits_in_byte = 0;
        }
    }

    /// Write multiple bits (MSB first)
    pub fn write_bits(&mut self, value: u32, count: u8) {
        for i in (0..count).rev() {
            self.write_bit(((value >> i) & 1) as u8);
        }
    }

    /// Emits one significant sample: `magnitude - 1` in `u` bits, then the
    /// sign (1 for negative).
    pub fn encode_sample(&mut self, magnitude: u32, negative: bool, u: u8) {
        self.write_bits(magnitude.saturating_sub(1), u);
        self.write_bit(u8::from(negative));
    }

    pub fn finish(mut self) -> Vec<u8> {
        if self.bits_in_byte > 0 {
            self.current_byte <<= self.byte_capacity - self.bits_in_byte;
            self.buffer.push(self.current_byte);
        }
        self.buffer
    }
}

impl Default for MagSgnEncoder {
    fn default() -> Self {
        Self::new()
    }
}
