use super::markers::{J2kMarker, MARKER_START_BYTE};
use super::quantization::{QuantStyle, QuantizationPlan};
use crate::codestream::{CodestreamError, ParamCod, ParamSiz};

/// Rsiz value announcing HTJ2K (Part 15) capabilities in CAP.
const RSIZ_HT: u16 = 0x4000;
/// Pcap bit for Part 15.
const PCAP_HT: u32 = 0x0002_0000;
/// COD code-block style: HT code-blocks only.
const BLOCK_STYLE_HT: u8 = 0x40;
/// Csiz upper bound.
pub const MAX_COMPONENTS: usize = 16384;

/// Marker segment writer for the main header and tile-part framing.
pub struct J2kWriter {
    data: Vec<u8>,
}

impl J2kWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn write_marker(&mut self, marker: J2kMarker) {
        self.data.push(MARKER_START_BYTE);
        self.data.push(marker.into());
    }

    fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_soc(&mut self) {
        self.write_marker(J2kMarker::StartOfCodestream);
    }

    pub fn write_eoc(&mut self) {
        self.write_marker(J2kMarker::EndOfCodestream);
    }

    pub fn write_siz(&mut self, siz: &ParamSiz) -> Result<(), CodestreamError> {
        let components = siz.components();
        if components.len() > MAX_COMPONENTS {
            return Err(CodestreamError::InvalidParameter(format!(
                "{} components exceed the SIZ maximum of {MAX_COMPONENTS}",
                components.len()
            )));
        }
        // Rsiz + 8 * u32 + Csiz + 3 bytes per component, plus Lsiz itself
        let length = u16::try_from(38 + 3 * components.len()).map_err(|_| {
            CodestreamError::InvalidParameter(format!(
                "SIZ segment for {} components does not fit Lsiz",
                components.len()
            ))
        })?;

        self.write_marker(J2kMarker::ImageAndTileSize);
        self.write_u16(length);
        self.write_u16(RSIZ_HT);
        self.write_u32(siz.image_extent().x);
        self.write_u32(siz.image_extent().y);
        self.write_u32(siz.image_offset().x);
        self.write_u32(siz.image_offset().y);
        self.write_u32(siz.tile_size().w);
        self.write_u32(siz.tile_size().h);
        self.write_u32(siz.tile_offset().x);
        self.write_u32(siz.tile_offset().y);
        self.write_u16(components.len() as u16);

        for component in components {
            let sign = if component.is_signed { 0x80 } else { 0x00 };
            self.write_byte(sign | (component.bit_depth.saturating_sub(1) as u8 & 0x7F));
            self.write_byte(component.downsampling.x as u8);
            self.write_byte(component.downsampling.y as u8);
        }
        Ok(())
    }

    pub fn write_cap(&mut self, reversible: bool) {
        self.write_marker(J2kMarker::Capabilities);
        self.write_u16(8);
        self.write_u32(PCAP_HT);
        // Ccap15: flag irreversible transforms
        self.write_u16(if reversible { 0x0000 } else { 0x0020 });
    }

    /// `precincts` holds one `(PPx, PPy)` exponent pair per resolution,
    /// lowest first; empty for maximal precincts.
    pub fn write_cod(&mut self, cod: &ParamCod, precincts: &[(u8, u8)]) {
        self.write_marker(J2kMarker::CodingStyleDefault);

        let length = 12 + precincts.len() as u16;
        self.write_u16(length);

        let scod = u8::from(!precincts.is_empty());
        self.write_byte(scod);

        // SGcod
        self.write_byte(cod.progression_order().marker_value());
        self.write_u16(1); // Layers
        self.write_byte(u8::from(cod.is_color_transform()));

        // SPcod
        let blocks = cod.block_dims();
        self.write_byte(cod.num_decompositions() as u8);
        self.write_byte((blocks.w.ilog2() - 2) as u8);
        self.write_byte((blocks.h.ilog2() - 2) as u8);
        self.write_byte(BLOCK_STYLE_HT);
        self.write_byte(u8::from(cod.is_reversible())); // 1 = 5/3, 0 = 9/7
        for &(ppx, ppy) in precincts {
            self.write_byte(ppx | (ppy << 4));
        }
    }

    pub fn write_qcd(&mut self, plan: &QuantizationPlan) {
        self.write_marker(J2kMarker::QuantizationDefault);

        let bands = plan.bands();
        let sqcd = (plan.guard_bits << 5) | plan.style as u8;
        match plan.style {
            QuantStyle::NoQuantization => {
                self.write_u16(3 + bands.len() as u16);
                self.write_byte(sqcd);
                for band in bands {
                    self.write_byte(band.exponent << 3);
                }
            }
            QuantStyle::ScalarExpounded => {
                self.write_u16(3 + 2 * bands.len() as u16);
                self.write_byte(sqcd);
                for band in bands {
                    self.write_u16((u16::from(band.exponent) << 11) | band.mantissa);
                }
            }
        }
    }

    /// Tile-part header of the single tile; `tile_part_len` counts from the
    /// SOT marker to the end of the tile data.
    pub fn write_sot(&mut self, tile_part_len: u32) {
        self.write_marker(J2kMarker::StartOfTile);
        self.write_u16(10);
        self.write_u16(0); // Isot
        self.write_u32(tile_part_len);
        self.write_byte(0); // TPsot
        self.write_byte(1); // TNsot
    }

    pub fn write_sod(&mut self) {
        self.write_marker(J2kMarker::StartOfData);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.data.extend_from_slice(data);
    }
}

impl Default for J2kWriter {
    fn default() -> Self {
        Self::new()
    }
}
