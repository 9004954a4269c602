use num_enum::{IntoPrimitive, TryFromPrimitive};

pub const MARKER_START_BYTE: u8 = 0xFF;

/// Codestream markers emitted by the encoder (ISO/IEC 15444-1 Annex A,
/// 15444-15 for CAP).
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum J2kMarker {
    /// SOC: Start of codestream.
    StartOfCodestream = 0x4F,
    /// CAP: Extended capabilities.
    Capabilities = 0x50,
    /// SIZ: Image and tile size.
    ImageAndTileSize = 0x51,
    /// COD: Coding style default.
    CodingStyleDefault = 0x52,
    /// QCD: Quantization default.
    QuantizationDefault = 0x5C,
    /// SOT: Start of tile-part.
    StartOfTile = 0x90,
    /// SOD: Start of data.
    StartOfData = 0x93,
    /// EOC: End of codestream.
    EndOfCodestream = 0xD9,
}
