//! Structured codec configuration: SIZ, COD and QCD parameter groups.

use super::CodestreamError;
use crate::params::ProgressionOrder;

/// A position on the reference grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }
}

/// Per-component entry of the SIZ marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentInfo {
    pub downsampling: Point,
    pub bit_depth: u32,
    pub is_signed: bool,
}

impl Default for ComponentInfo {
    fn default() -> Self {
        Self {
            downsampling: Point::new(1, 1),
            bit_depth: 8,
            is_signed: false,
        }
    }
}

/// Image and tile size parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSiz {
    image_extent: Point,
    image_offset: Point,
    tile_size: Size,
    tile_offset: Point,
    components: Vec<ComponentInfo>,
}

impl ParamSiz {
    pub fn set_image_extent(&mut self, extent: Point) {
        self.image_extent = extent;
    }

    pub fn set_image_offset(&mut self, offset: Point) {
        self.image_offset = offset;
    }

    pub fn set_tile_size(&mut self, size: Size) {
        self.tile_size = size;
    }

    pub fn set_tile_offset(&mut self, offset: Point) {
        self.tile_offset = offset;
    }

    pub fn set_num_components(&mut self, count: u32) {
        self.components
            .resize(count as usize, ComponentInfo::default());
    }

    pub fn set_component(
        &mut self,
        index: u32,
        downsampling: Point,
        bit_depth: u32,
        is_signed: bool,
    ) -> Result<(), CodestreamError> {
        let count = self.components.len();
        let component = self.components.get_mut(index as usize).ok_or_else(|| {
            CodestreamError::InvalidParameter(format!(
                "component index {index} out of range for {count} components"
            ))
        })?;
        *component = ComponentInfo {
            downsampling,
            bit_depth,
            is_signed,
        };
        Ok(())
    }

    pub fn image_extent(&self) -> Point {
        self.image_extent
    }

    pub fn image_offset(&self) -> Point {
        self.image_offset
    }

    pub fn tile_size(&self) -> Size {
        self.tile_size
    }

    pub fn tile_offset(&self) -> Point {
        self.tile_offset
    }

    pub fn num_components(&self) -> u32 {
        self.components.len() as u32
    }

    pub fn component(&self, index: u32) -> Option<&ComponentInfo> {
        self.components.get(index as usize)
    }

    pub fn components(&self) -> &[ComponentInfo] {
        &self.components
    }

    pub fn width(&self) -> u32 {
        self.image_extent.x.saturating_sub(self.image_offset.x)
    }

    pub fn height(&self) -> u32 {
        self.image_extent.y.saturating_sub(self.image_offset.y)
    }
}

/// Coding style parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamCod {
    num_decompositions: u32,
    reversible: bool,
    progression_order: ProgressionOrder,
    color_transform: bool,
    precinct_sizes: Vec<Size>,
    block_dims: Size,
}

impl Default for ParamCod {
    fn default() -> Self {
        Self {
            num_decompositions: 5,
            reversible: false,
            progression_order: ProgressionOrder::Rpcl,
            color_transform: false,
            precinct_sizes: Vec::new(),
            block_dims: Size::new(64, 64),
        }
    }
}

impl ParamCod {
    pub fn set_num_decomposition(&mut self, levels: u32) {
        self.num_decompositions = levels;
    }

    pub fn set_reversible(&mut self, reversible: bool) {
        self.reversible = reversible;
    }

    /// Sets the progression order from its four-letter token.
    pub fn set_progression_order(&mut self, token: &str) -> Result<(), CodestreamError> {
        self.progression_order = token.parse().map_err(|_| {
            CodestreamError::InvalidParameter(format!("unknown progression order '{token}'"))
        })?;
        Ok(())
    }

    pub fn set_color_transform(&mut self, enabled: bool) {
        self.color_transform = enabled;
    }

    /// Sets one precinct size per resolution level, lowest resolution first.
    pub fn set_precinct_size(&mut self, sizes: &[Size]) {
        self.precinct_sizes = sizes.to_vec();
    }

    pub fn set_block_dims(&mut self, width: u32, height: u32) {
        self.block_dims = Size::new(width, height);
    }

    pub fn num_decompositions(&self) -> u32 {
        self.num_decompositions
    }

    pub fn is_reversible(&self) -> bool {
        self.reversible
    }

    pub fn progression_order(&self) -> ProgressionOrder {
        self.progression_order
    }

    pub fn is_color_transform(&self) -> bool {
        self.color_transform
    }

    pub fn precinct_sizes(&self) -> &[Size] {
        &self.precinct_sizes
    }

    pub fn block_dims(&self) -> Size {
        self.block_dims
    }
}

/// Quantization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParamQcd {
    irrev_quant: Option<f32>,
}

impl ParamQcd {
    /// Target rate, in bits per pixel, for the irreversible path. Ignored by
    /// reversible encodes.
    pub fn set_irrev_quant(&mut self, bits_per_pixel: f32) {
        self.irrev_quant = Some(bits_per_pixel);
    }

    pub fn irrev_quant(&self) -> Option<f32> {
        self.irrev_quant
    }
}
