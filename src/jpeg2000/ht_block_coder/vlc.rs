/// VLC stream for HTJ2K quad significance and exponent bounds.
///
/// The stream grows backward from the end of the code-block segment: bits
/// are packed LSB first and bytes are emitted in reverse order by
/// [`VlcEncoder::finish`]. A byte following one greater than 0x8F carries
/// only seven bits.
pub struct VlcEncoder {
    buffer: Vec<u8>,
    current_byte: u8,
    bits_in_byte: u8,
    byte_capacity: u8,
}

impl VlcEncoder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            current_byte: 0,
            bits_in_byte: 0,
            byte_capacity: 8,
        }
    }

    pub fn write_bit(&mut self, bit: u8) {
        self.current_byte |= (bit & 1) << self.bits_in_byte;
        self.bits_in_byte += 1;
        if self.bits_in_byte == self.byte_capacity {
            self.push_byte();
        }
    }

    /// Writes the `count` low bits of `value`, LSB first.
    pub fn write_bits(&mut self, value: u32, count: u8) {
        for i in 0..count {
            self.write_bit(((value >> i) & 1) as u8);
        }
    }

    fn push_byte(&mut self) {
        self.buffer.push(self.current_byte);
        self.byte_capacity = if self.current_byte > 0x8F { 7 } else { 8 };
        self.current_byte = 0;
        self.bits_in_byte = 0;
    }

    /// Significance pattern of a quad, one bit per sample.
    pub fn encode_rho(&mut self, rho: u8) {
        self.write_bits(u32::from(rho), 4);
    }

    /// Exponent bound `u >= 1` of a significant quad as an order-0
    /// Exp-Golomb code of `u - 1`.
    pub fn encode_u(&mut self, u: u32) {
        let value = u.saturating_sub(1) + 1;
        let len = 32 - value.leading_zeros();
        for _ in 1..len {
            self.write_bit(0);
        }
        for i in (0..len).rev() {
            self.write_bit(((value >> i) & 1) as u8);
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        if self.bits_in_byte > 0 {
            self.push_byte();
        }
        self.buffer.reverse();
        self.buffer
    }
}

impl Default for VlcEncoder {
    fn default() -> Self {
        Self::new()
    }
}
