/// Bit writer for packet headers.
///
/// Bits are packed MSB first. A byte following 0xFF carries only seven bits
/// (its MSB is forced to zero) so no marker code can appear inside a header.
pub struct J2kBitWriter {
    data: Vec<u8>,
    bit_buffer: u8,
    bits_count: u8,
    /// Bits available in the current byte: 8, or 7 after 0xFF.
    capacity: u8,
}

impl J2kBitWriter {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            bit_buffer: 0,
            bits_count: 0,
            capacity: 8,
        }
    }

    pub fn write_bit(&mut self, bit: u8) {
        self.bit_buffer = (self.bit_buffer << 1) | (bit & 1);
        self.bits_count += 1;
        if self.bits_count == self.capacity {
            self.flush_byte();
        }
    }

    /// Writes the `count` low bits of `value`, MSB first.
    pub fn write_bits(&mut self, value: u32, count: u8) {
        for i in (0..count).rev() {
            self.write_bit(((value >> i) & 1) as u8);
        }
    }

    fn flush_byte(&mut self) {
        let b = self.bit_buffer;
        self.data.push(b);
        self.capacity = if b == 0xFF { 7 } else { 8 };
        self.bit_buffer = 0;
        self.bits_count = 0;
    }

    /// Pads the last byte with zeros and returns the header bytes. A header
    /// never ends on 0xFF.
    pub fn finish(mut self) -> Vec<u8> {
        if self.bits_count > 0 {
            self.bit_buffer <<= self.capacity - self.bits_count;
            self.flush_byte();
        }
        if self.data.last() == Some(&0xFF) {
            self.data.push(0x00);
        }
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.bits_count == 0
    }
}

impl Default for J2kBitWriter {
    fn default() -> Self {
        Self::new()
    }
}
