//! Encode parameters supplied by the caller.

use std::fmt;
use std::str::FromStr;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use tracing::warn;

use crate::error::EncodeError;

/// Highest number of wavelet decomposition levels a caller may request.
pub const MAX_DECOMPOSITIONS: u32 = 33;

/// Highest sample precision handled by the 1/2-byte sample paths.
pub const MAX_BITS_PER_SAMPLE: u32 = 16;

/// Largest component count a SIZ marker (Csiz) can carry.
pub const MAX_COMPONENTS: u32 = 16384;

/// Packet progression order. Discriminants match the caller-side constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum ProgressionOrder {
    /// Layer-Resolution-Component-Position
    #[default]
    Lrcp = 0,
    /// Resolution-Layer-Component-Position
    Rlcp = 1,
    /// Resolution-Position-Component-Layer
    Rpcl = 2,
    /// Position-Component-Resolution-Layer
    Pcrl = 3,
    /// Component-Position-Resolution-Layer
    Cprl = 4,
}

impl ProgressionOrder {
    /// Maps a raw caller value, falling back to LRCP for anything unknown.
    pub fn from_raw(value: i32) -> Self {
        Self::try_from(value).unwrap_or_else(|_| {
            warn!(value, "unrecognized progression order, using LRCP");
            Self::Lrcp
        })
    }

    /// Token understood by the codec's COD parameters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lrcp => "LRCP",
            Self::Rlcp => "RLCP",
            Self::Rpcl => "RPCL",
            Self::Pcrl => "PCRL",
            Self::Cprl => "CPRL",
        }
    }

    /// Value written to the SGcod progression field.
    pub fn marker_value(self) -> u8 {
        i32::from(self) as u8
    }
}

impl fmt::Display for ProgressionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressionOrder {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LRCP" => Ok(Self::Lrcp),
            "RLCP" => Ok(Self::Rlcp),
            "RPCL" => Ok(Self::Rpcl),
            "PCRL" => Ok(Self::Pcrl),
            "CPRL" => Ok(Self::Cprl),
            _ => Err(EncodeError::InvalidParameter(format!(
                "unknown progression order '{s}'"
            ))),
        }
    }
}

/// Parameters for a single encode call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeParameters {
    pub width: u32,
    pub height: u32,
    pub components: u32,
    pub bits_per_sample: u32,
    pub is_signed: bool,
    /// `true` selects the reversible 5/3 path (lossless).
    pub reversible: bool,
    /// Target compression ratio, e.g. 10.0 for 10:1. Ignored when reversible.
    pub compression_ratio: f32,
    pub progression_order: ProgressionOrder,
    pub decompositions: u32,
}

impl Default for EncodeParameters {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            components: 1,
            bits_per_sample: 8,
            is_signed: false,
            reversible: true,
            compression_ratio: 0.0,
            progression_order: ProgressionOrder::Lrcp,
            decompositions: 5,
        }
    }
}

impl EncodeParameters {
    pub fn new(width: u32, height: u32, components: u32, bits_per_sample: u32) -> Self {
        Self {
            width,
            height,
            components,
            bits_per_sample,
            ..Self::default()
        }
    }

    pub fn with_signed(mut self, is_signed: bool) -> Self {
        self.is_signed = is_signed;
        self
    }

    pub fn with_reversible(mut self, reversible: bool) -> Self {
        self.reversible = reversible;
        self
    }

    pub fn with_compression_ratio(mut self, ratio: f32) -> Self {
        self.compression_ratio = ratio;
        self
    }

    pub fn with_progression_order(mut self, order: ProgressionOrder) -> Self {
        self.progression_order = order;
        self
    }

    pub fn with_decompositions(mut self, levels: u32) -> Self {
        self.decompositions = levels;
        self
    }

    /// Storage size of one sample in the raw buffer.
    pub fn bytes_per_sample(&self) -> usize {
        if self.bits_per_sample <= 8 { 1 } else { 2 }
    }

    /// Checks the value invariants, before any buffer is looked at.
    pub fn validate(&self) -> Result<(), EncodeError> {
        if self.width == 0 {
            return Err(EncodeError::InvalidParameter("width must be positive".into()));
        }
        if self.height == 0 {
            return Err(EncodeError::InvalidParameter("height must be positive".into()));
        }
        if self.components == 0 {
            return Err(EncodeError::InvalidParameter(
                "component count must be positive".into(),
            ));
        }
        if self.components > MAX_COMPONENTS {
            return Err(EncodeError::InvalidParameter(format!(
                "component count must not exceed {MAX_COMPONENTS}, got {}",
                self.components
            )));
        }
        if self.bits_per_sample == 0 || self.bits_per_sample > MAX_BITS_PER_SAMPLE {
            return Err(EncodeError::InvalidParameter(format!(
                "bits per sample must be between 1 and {MAX_BITS_PER_SAMPLE}, got {}",
                self.bits_per_sample
            )));
        }
        if self.decompositions == 0 || self.decompositions > MAX_DECOMPOSITIONS {
            return Err(EncodeError::InvalidParameter(format!(
                "decomposition levels must be between 1 and {MAX_DECOMPOSITIONS}, got {}",
                self.decompositions
            )));
        }
        if !self.compression_ratio.is_finite() {
            return Err(EncodeError::InvalidParameter(
                "compression ratio must be a finite number".into(),
            ));
        }
        Ok(())
    }

    /// `width * height * components * bytes_per_sample`, overflow-checked.
    pub fn expected_raw_size(&self) -> Result<usize, EncodeError> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(self.components as usize))
            .and_then(|n| n.checked_mul(self.bytes_per_sample()))
            .ok_or_else(|| {
                EncodeError::InvalidParameter("image dimensions overflow the address space".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progression_from_raw() {
        assert_eq!(ProgressionOrder::from_raw(0), ProgressionOrder::Lrcp);
        assert_eq!(ProgressionOrder::from_raw(2), ProgressionOrder::Rpcl);
        assert_eq!(ProgressionOrder::from_raw(4), ProgressionOrder::Cprl);
        assert_eq!(ProgressionOrder::from_raw(5), ProgressionOrder::Lrcp);
        assert_eq!(ProgressionOrder::from_raw(-1), ProgressionOrder::Lrcp);
    }

    #[test]
    fn test_progression_tokens_roundtrip() {
        for order in [
            ProgressionOrder::Lrcp,
            ProgressionOrder::Rlcp,
            ProgressionOrder::Rpcl,
            ProgressionOrder::Pcrl,
            ProgressionOrder::Cprl,
        ] {
            assert_eq!(order.as_str().parse::<ProgressionOrder>().unwrap(), order);
        }
        assert_eq!("rpcl".parse::<ProgressionOrder>().unwrap(), ProgressionOrder::Rpcl);
        assert!("LRC".parse::<ProgressionOrder>().is_err());
    }

    #[test]
    fn test_bytes_per_sample() {
        assert_eq!(EncodeParameters::new(1, 1, 1, 1).bytes_per_sample(), 1);
        assert_eq!(EncodeParameters::new(1, 1, 1, 8).bytes_per_sample(), 1);
        assert_eq!(EncodeParameters::new(1, 1, 1, 9).bytes_per_sample(), 2);
        assert_eq!(EncodeParameters::new(1, 1, 1, 16).bytes_per_sample(), 2);
    }

    #[test]
    fn test_expected_raw_size() {
        let params = EncodeParameters::new(64, 32, 3, 12);
        assert_eq!(params.expected_raw_size().unwrap(), 64 * 32 * 3 * 2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(EncodeParameters::new(0, 8, 1, 8).validate().is_err());
        assert!(EncodeParameters::new(8, 0, 1, 8).validate().is_err());
        assert!(EncodeParameters::new(8, 8, 0, 8).validate().is_err());
        assert!(EncodeParameters::new(8, 8, 1, 17).validate().is_err());
        assert!(EncodeParameters::new(8, 8, 1, 8)
            .with_decompositions(34)
            .validate()
            .is_err());
        assert!(EncodeParameters::new(8, 8, 1, 8)
            .with_decompositions(33)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_component_count_limit() {
        assert!(EncodeParameters::new(1, 1, 16384, 8).validate().is_ok());
        let err = EncodeParameters::new(1, 1, 16385, 8).validate().unwrap_err();
        assert!(matches!(err, EncodeError::InvalidParameter(_)));
        assert!(EncodeParameters::new(1, 1, 21846, 8).validate().is_err());
    }
}
