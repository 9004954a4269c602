//! HTJ2K (High-Throughput JPEG 2000) cleanup-pass block encoder.
//!
//! Samples are visited in 2x2 quads, row pair by row pair. For each quad the
//! significance pattern goes to MEL (when both the left and upper quads are
//! insignificant) or VLC, the exponent bound of a significant quad goes to
//! VLC, and magnitudes and signs go to MagSgn. The segment is laid out as
//! `MagSgn | MEL | VLC (reversed) | suffix`, where the two suffix bytes
//! carry the combined MEL+VLC length in seven bits each.

pub mod mag_sgn;
pub mod mel;
pub mod vlc;

use mag_sgn::MagSgnEncoder;
use mel::MelEncoder;
use vlc::VlcEncoder;

/// Largest MEL+VLC length representable in the segment suffix.
const MAX_SUFFIX_LENGTH: usize = (1 << 14) - 1;

/// Result of coding one code-block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtCodedBlock {
    pub data: Vec<u8>,
    /// Missing most significant bit-planes relative to the subband maximum.
    pub zero_bit_planes: u32,
    /// Coding passes contributed; 0 for an all-zero block.
    pub passes: u8,
}

impl HtCodedBlock {
    pub fn is_empty(&self) -> bool {
        self.passes == 0
    }
}

/// High Throughput Block Encoder (HTJ2K Part 15)
pub struct HtBlockEncoder {
    width: usize,
    height: usize,
}

impl HtBlockEncoder {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Codes `coefficients` (row-major, `width * height` quantized values).
    /// `max_bit_planes` is the magnitude bit-plane bound of the subband.
    pub fn encode(&self, coefficients: &[i32], max_bit_planes: u32) -> HtCodedBlock {
        let max_magnitude = coefficients
            .iter()
            .map(|c| c.unsigned_abs())
            .max()
            .unwrap_or(0);
        if max_magnitude == 0 {
            return HtCodedBlock::default();
        }
        let used_planes = 32 - max_magnitude.leading_zeros();

        let mut mel = MelEncoder::new();
        let mut vlc = VlcEncoder::new();
        let mut mag_sgn = MagSgnEncoder::new();

        let quads_wide = self.width.div_ceil(2);
        let mut above_sig = vec![false; quads_wide];

        for qy in 0..self.height.div_ceil(2) {
            let mut left_sig = false;
            for qx in 0..quads_wide {
                let samples = self.quad(coefficients, qx, qy);
                let rho = samples
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.is_some_and(|v| v != 0))
                    .fold(0u8, |acc, (i, _)| acc | (1 << i));

                let context = u8::from(left_sig) | (u8::from(above_sig[qx]) << 1);
                if context == 0 {
                    mel.encode(rho != 0);
                    if rho != 0 {
                        vlc.encode_rho(rho);
                    }
                } else {
                    vlc.encode_rho(rho);
                }

                if rho != 0 {
                    let u = samples
                        .iter()
                        .flatten()
                        .map(|v| 32 - v.unsigned_abs().leading_zeros())
                        .max()
                        .unwrap_or(1);
                    vlc.encode_u(u);
                    for v in samples.iter().flatten().filter(|v| **v != 0) {
                        mag_sgn.encode_sample(v.unsigned_abs(), *v < 0, u as u8);
                    }
                }

                left_sig = rho != 0;
                above_sig[qx] = rho != 0;
            }
        }

        let mag_sgn = mag_sgn.finish();
        let mel = mel.finish();
        let vlc = vlc.finish();
        let suffix_length = (mel.len() + vlc.len() + 2).min(MAX_SUFFIX_LENGTH);

        let mut data = Vec::with_capacity(mag_sgn.len() + suffix_length);
        data.extend_from_slice(&mag_sgn);
        data.extend_from_slice(&mel);
        data.extend_from_slice(&vlc);
        data.push(((suffix_length >> 7) & 0x7F) as u8);
        data.push((suffix_length & 0x7F) as u8);

        HtCodedBlock {
            data,
            zero_bit_planes: max_bit_planes.saturating_sub(used_planes),
            passes: 1,
        }
    }

    /// Samples of quad (qx, qy) in column order: top-left, bottom-left,
    /// top-right, bottom-right. Positions outside the block are `None`.
    fn quad(&self, coefficients: &[i32], qx: usize, qy: usize) -> [Option<i32>; 4] {
        let mut out = [None; 4];
        for (i, (dx, dy)) in [(0, 0), (0, 1), (1, 0), (1, 1)].into_iter().enumerate() {
            let x = 2 * qx + dx;
            let y = 2 * qy + dy;
            if x < self.width && y < self.height {
                out[i] = Some(coefficients[y * self.width + x]);
            }
        }
        out
    }
}
