//! Step sizes and scalar quantization for the QCD marker.

use super::dwt::SubbandOrientation;

pub const GUARD_BITS: u8 = 2;

/// Sqcd quantization style (lower five bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantStyle {
    /// Reversible path: exponents only.
    NoQuantization = 0,
    /// Irreversible path: one exponent/mantissa pair per subband.
    ScalarExpounded = 2,
}

/// Quantization of one subband.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandQuant {
    pub exponent: u8,
    pub mantissa: u16,
    /// Step size in sample units; 1.0 on the reversible path.
    pub step: f32,
}

/// Per-subband quantization for a whole tile-component, in QCD order:
/// LL first, then HL, LH, HH from the lowest resolution up.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizationPlan {
    pub style: QuantStyle,
    pub guard_bits: u8,
    bands: Vec<BandQuant>,
}

impl QuantizationPlan {
    pub fn reversible(bit_depth: u32, decompositions: u32, color_transform: bool) -> Self {
        let extra = u32::from(color_transform);
        let bands = band_gains(decompositions)
            .map(|gain| BandQuant {
                exponent: (bit_depth + gain + extra).min(31) as u8,
                mantissa: 0,
                step: 1.0,
            })
            .collect();
        Self {
            style: QuantStyle::NoQuantization,
            guard_bits: GUARD_BITS,
            bands,
        }
    }

    pub fn irreversible(bit_depth: u32, decompositions: u32, base_step: f32) -> Self {
        let bands = band_gains(decompositions)
            .map(|gain| expound(base_step, bit_depth + gain))
            .collect();
        Self {
            style: QuantStyle::ScalarExpounded,
            guard_bits: GUARD_BITS,
            bands,
        }
    }

    pub fn bands(&self) -> &[BandQuant] {
        &self.bands
    }

    /// Quantization of the subband `orientation` at `resolution`
    /// (0 is the LL resolution).
    pub fn band(&self, resolution: usize, orientation: SubbandOrientation) -> &BandQuant {
        let index = match orientation {
            SubbandOrientation::LL => 0,
            SubbandOrientation::HL => 3 * resolution - 2,
            SubbandOrientation::LH => 3 * resolution - 1,
            SubbandOrientation::HH => 3 * resolution,
        };
        &self.bands[index]
    }

    /// Largest number of magnitude bit-planes a coefficient of the subband
    /// may occupy.
    pub fn max_bit_planes(&self, resolution: usize, orientation: SubbandOrientation) -> u32 {
        (self.guard_bits as u32 + self.band(resolution, orientation).exponent as u32)
            .saturating_sub(1)
    }
}

/// Nominal log2 gains of every subband, in QCD order.
fn band_gains(decompositions: u32) -> impl Iterator<Item = u32> {
    std::iter::once(0).chain((0..decompositions).flat_map(|_| [1, 1, 2]))
}

/// Splits `step` into the 5-bit exponent / 11-bit mantissa form relative to
/// a dynamic range of `range_bits`.
fn expound(step: f32, range_bits: u32) -> BandQuant {
    let step = step.max(f32::MIN_POSITIVE);
    let log = step.log2().floor();
    let exponent = (range_bits as f32 - log).clamp(0.0, 31.0);
    let scaled = step / log.exp2();
    let mantissa = ((scaled - 1.0) * 2048.0).round().clamp(0.0, 2047.0) as u16;
    let exponent = exponent as u8;
    BandQuant {
        exponent,
        mantissa,
        step: (range_bits as f32 - exponent as f32).exp2() * (1.0 + mantissa as f32 / 2048.0),
    }
}

/// Base step size for the irreversible path.
///
/// Without a target rate the finest step (1.0) is used; with one, the step
/// scales with the requested compression ratio.
pub fn base_step_for_rate(bit_depth: u32, components: u32, target_bpp: Option<f32>) -> f32 {
    match target_bpp {
        Some(bpp) if bpp > 0.0 => {
            let ratio = (bit_depth * components) as f32 / bpp;
            (ratio * 0.5).max(1.0)
        }
        _ => 1.0,
    }
}

/// Dead-zone scalar quantization: `sign(x) * floor(|x| / step)`.
pub fn quantize_scalar(coeff: f32, step: f32) -> i32 {
    if step <= 0.0 {
        return coeff as i32;
    }
    let magnitude = (coeff.abs() / step).floor() as i32;
    if coeff < 0.0 { -magnitude } else { magnitude }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversible_exponents() {
        let plan = QuantizationPlan::reversible(8, 2, false);
        let exps: Vec<u8> = plan.bands().iter().map(|b| b.exponent).collect();
        assert_eq!(exps, vec![8, 9, 9, 10, 9, 9, 10]);

        let rct = QuantizationPlan::reversible(8, 1, true);
        let exps: Vec<u8> = rct.bands().iter().map(|b| b.exponent).collect();
        assert_eq!(exps, vec![9, 10, 10, 11]);
    }

    #[test]
    fn test_band_lookup() {
        let plan = QuantizationPlan::reversible(12, 3, false);
        assert_eq!(plan.bands().len(), 10);
        assert_eq!(plan.band(0, SubbandOrientation::LL).exponent, 12);
        assert_eq!(plan.band(1, SubbandOrientation::HL).exponent, 13);
        assert_eq!(plan.band(3, SubbandOrientation::HH).exponent, 14);
        assert_eq!(plan.max_bit_planes(3, SubbandOrientation::HH), 15);
    }

    #[test]
    fn test_expounded_step_is_close() {
        for step in [1.0f32, 2.5, 7.75, 60.0] {
            let band = expound(step, 9);
            assert!((band.step - step).abs() / step < 1e-3, "{step} -> {}", band.step);
        }
    }

    #[test]
    fn test_base_step() {
        assert_eq!(base_step_for_rate(8, 3, None), 1.0);
        assert!((base_step_for_rate(8, 3, Some(2.4)) - 5.0).abs() < 1e-4);
        assert_eq!(base_step_for_rate(8, 1, Some(16.0)), 1.0);
    }

    #[test]
    fn test_quantize_scalar() {
        assert_eq!(quantize_scalar(10.5, 2.0), 5);
        assert_eq!(quantize_scalar(-10.5, 2.0), -5);
        assert_eq!(quantize_scalar(1.9, 2.0), 0);
    }
}
