//! Single-tile HTJ2K codestream producer.
//!
//! [`J2kCodestream`] implements the [`Codestream`] line protocol: it buffers
//! every exchanged line, and on `flush` runs the colour transform, the DWT,
//! quantization, HT block coding and packet assembly in one go.

use tracing::debug;

use super::dwt::{Dwt53, Dwt97, SubbandRect, forward_2d, resolution_sizes, subband_layout};
use super::ht_block_coder::{HtBlockEncoder, HtCodedBlock};
use super::packet::{PacketId, PrecinctBand, encode_packet, sort_packets};
use super::quantization::{QuantizationPlan, base_step_for_rate, quantize_scalar};
use super::writer::{J2kWriter, MAX_COMPONENTS};
use crate::codestream::{
    Codestream, CodestreamError, LineBuf, OutFile, ParamCod, ParamQcd, ParamSiz, Point,
};

/// Largest number of decomposition levels the COD marker can carry.
pub const MAX_CODEC_DECOMPOSITIONS: u32 = 32;

/// Precinct exponent used when no precinct sizes are configured.
const MAX_PRECINCT_EXPONENT: u32 = 15;

/// Bytes of the SOT segment plus the SOD marker.
const TILE_PART_HEADER_LEN: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Configuring,
    Pushing {
        row: usize,
        component: usize,
        lent: bool,
    },
    Complete,
    Flushed,
    Closed,
}

/// Reference HTJ2K encoder behind the [`Codestream`] interface.
///
/// The marker segments (SIZ with the Part 15 Rsiz bit, CAP, COD, QCD,
/// SOT/SOD) and the packet headers follow ISO/IEC 15444-1/-15, but the
/// cleanup pass is simplified: significance patterns are sent as raw 4-bit
/// rho values and exponent bounds as Exp-Golomb codes, not through the
/// CxtVLC and U-VLC tables of 15444-15. A conformant HT decoder cannot
/// read the code-block data this type produces. Single tile, single
/// quality layer.
#[derive(Debug)]
pub struct J2kCodestream {
    siz: ParamSiz,
    cod: ParamCod,
    qcd: ParamQcd,
    state: State,
    width: usize,
    height: usize,
    /// One `(PPx, PPy)` pair per resolution, lowest first.
    precinct_exponents: Vec<(u32, u32)>,
    plan: Option<QuantizationPlan>,
    /// Samples as exchanged, one plane per component.
    planes: Vec<Vec<i32>>,
}

impl Default for J2kCodestream {
    fn default() -> Self {
        Self::new()
    }
}

impl J2kCodestream {
    pub fn new() -> Self {
        Self {
            siz: ParamSiz::default(),
            cod: ParamCod::default(),
            qcd: ParamQcd::default(),
            state: State::Configuring,
            width: 0,
            height: 0,
            precinct_exponents: Vec::new(),
            plan: None,
            planes: Vec::new(),
        }
    }

    fn validate(&self) -> Result<(), CodestreamError> {
        let invalid = |msg: String| Err(CodestreamError::InvalidParameter(msg));

        if self.siz.image_offset() != Point::new(0, 0) || self.siz.tile_offset() != Point::new(0, 0)
        {
            return invalid("image and tile offsets must be zero".into());
        }
        let (w, h) = (self.siz.width(), self.siz.height());
        if w == 0 || h == 0 {
            return invalid(format!("image extent {w}x{h} is empty"));
        }
        let tile = self.siz.tile_size();
        if tile.w != w || tile.h != h {
            return invalid(format!(
                "tile size {}x{} must equal the image extent {w}x{h}",
                tile.w, tile.h
            ));
        }

        let components = self.siz.components();
        let Some(first) = components.first() else {
            return invalid("at least one component is required".into());
        };
        if components.len() > MAX_COMPONENTS {
            return invalid(format!(
                "{} components exceed the maximum of {MAX_COMPONENTS}",
                components.len()
            ));
        }
        if !(1..=30).contains(&first.bit_depth) {
            return invalid(format!("unsupported bit depth {}", first.bit_depth));
        }
        if components
            .iter()
            .any(|c| c.bit_depth != first.bit_depth || c.is_signed != first.is_signed)
        {
            return invalid("all components must share bit depth and signedness".into());
        }
        if components.iter().any(|c| c.downsampling != Point::new(1, 1)) {
            return invalid("component subsampling is not supported".into());
        }

        if self.cod.num_decompositions() > MAX_CODEC_DECOMPOSITIONS {
            return invalid(format!(
                "{} decomposition levels exceed the maximum of {MAX_CODEC_DECOMPOSITIONS}",
                self.cod.num_decompositions()
            ));
        }
        if self.cod.is_color_transform() && components.len() < 3 {
            return invalid("colour transform requires at least three components".into());
        }

        let blocks = self.cod.block_dims();
        let valid_side = |s: u32| s.is_power_of_two() && (4..=1024).contains(&s);
        if !valid_side(blocks.w) || !valid_side(blocks.h) || blocks.w * blocks.h > 4096 {
            return invalid(format!(
                "code-block size {}x{} is not allowed",
                blocks.w, blocks.h
            ));
        }
        Ok(())
    }

    fn derive_precinct_exponents(&self) -> Result<Vec<(u32, u32)>, CodestreamError> {
        let levels = self.cod.num_decompositions() as usize;
        let sizes = self.cod.precinct_sizes();
        let Some(last) = sizes.last() else {
            return Ok(vec![(MAX_PRECINCT_EXPONENT, MAX_PRECINCT_EXPONENT); levels + 1]);
        };

        (0..=levels)
            .map(|r| -> Result<(u32, u32), CodestreamError> {
                let size = sizes.get(r).unwrap_or(last);
                let min = if r == 0 { 1 } else { 2 };
                let exponent = |side: u32| {
                    if side.is_power_of_two()
                        && side >= min
                        && side.ilog2() <= MAX_PRECINCT_EXPONENT
                    {
                        Ok(side.ilog2())
                    } else {
                        Err(CodestreamError::InvalidParameter(format!(
                            "precinct size {}x{} at resolution {r} is not allowed",
                            size.w, size.h
                        )))
                    }
                };
                Ok((exponent(size.w)?, exponent(size.h)?))
            })
            .collect()
    }

    fn quantization_plan(&self) -> QuantizationPlan {
        let bit_depth = self.siz.components()[0].bit_depth;
        let levels = self.cod.num_decompositions();
        if self.cod.is_reversible() {
            QuantizationPlan::reversible(bit_depth, levels, self.cod.is_color_transform())
        } else {
            let components = self.siz.num_components();
            let step = base_step_for_rate(bit_depth, components, self.qcd.irrev_quant());
            QuantizationPlan::irreversible(bit_depth, levels, step)
        }
    }

    fn level_shift(&mut self) {
        for (plane, info) in self.planes.iter_mut().zip(self.siz.components()) {
            if !info.is_signed {
                let offset = 1i32 << (info.bit_depth - 1);
                plane.iter_mut().for_each(|v| *v -= offset);
            }
        }
    }

    /// Wavelet coefficients of every component, quantized to integers.
    fn transform(&mut self, plan: &QuantizationPlan) -> Vec<Vec<i32>> {
        let (w, h) = (self.width, self.height);
        let levels = self.cod.num_decompositions() as usize;
        let color = self.cod.is_color_transform();
        let mut planes = std::mem::take(&mut self.planes);

        if self.cod.is_reversible() {
            if color {
                forward_rct(&mut planes);
            }
            for plane in &mut planes {
                forward_2d(plane, w, h, levels, Dwt53::forward);
            }
            return planes;
        }

        let mut float_planes: Vec<Vec<f32>> = planes
            .into_iter()
            .map(|p| p.into_iter().map(|v| v as f32).collect())
            .collect();
        if color {
            forward_ict(&mut float_planes);
        }
        let rects = subband_layout(w, h, levels);
        float_planes
            .into_iter()
            .map(|mut plane| {
                forward_2d(&mut plane, w, h, levels, Dwt97::forward);
                let mut quantized = vec![0i32; plane.len()];
                for rect in &rects {
                    let step = plan.band(rect.resolution, rect.orientation).step;
                    for y in rect.y0..rect.y0 + rect.height {
                        let row = y * w;
                        for x in rect.x0..rect.x0 + rect.width {
                            quantized[row + x] = quantize_scalar(plane[row + x], step);
                        }
                    }
                }
                quantized
            })
            .collect()
    }

    /// Codes all packets of the tile and concatenates them in progression
    /// order.
    fn encode_tile(&self, coefficients: &[Vec<i32>], plan: &QuantizationPlan) -> Vec<u8> {
        let (w, h) = (self.width, self.height);
        let levels = self.cod.num_decompositions() as usize;
        let sizes = resolution_sizes(w, h, levels);
        let rects = subband_layout(w, h, levels);
        let blocks = self.cod.block_dims();
        let (xcb, ycb) = (blocks.w.ilog2(), blocks.h.ilog2());

        let mut ids = Vec::new();
        let mut bodies: Vec<Vec<Vec<Vec<u8>>>> = Vec::with_capacity(coefficients.len());

        for (component, coeffs) in coefficients.iter().enumerate() {
            let mut per_resolution = Vec::with_capacity(levels + 1);
            for (resolution, &(res_w, res_h)) in sizes.iter().enumerate() {
                let (ppx, ppy) = self.precinct_exponents[resolution];
                let precincts_wide = res_w.div_ceil(1 << ppx);
                let precincts_high = res_h.div_ceil(1 << ppy);
                let band_exp = if resolution == 0 {
                    (ppx, ppy)
                } else {
                    (ppx - 1, ppy - 1)
                };
                let block_exp = (xcb.min(band_exp.0), ycb.min(band_exp.1));
                let bands: Vec<&SubbandRect> = rects
                    .iter()
                    .filter(|r| r.resolution == resolution)
                    .collect();

                let mut per_precinct = Vec::with_capacity(precincts_wide * precincts_high);
                for py in 0..precincts_high {
                    for px in 0..precincts_wide {
                        let precinct_bands: Vec<PrecinctBand> = bands
                            .iter()
                            .map(|band| {
                                let max_bit_planes =
                                    plan.max_bit_planes(resolution, band.orientation);
                                code_precinct_band(
                                    coeffs,
                                    w,
                                    band,
                                    (px, py),
                                    band_exp,
                                    block_exp,
                                    max_bit_planes,
                                )
                            })
                            .collect();

                        let shift = (levels - resolution) as u32;
                        ids.push(PacketId {
                            component,
                            resolution,
                            precinct: py * precincts_wide + px,
                            x: (px as u64) << (ppx + shift),
                            y: (py as u64) << (ppy + shift),
                        });
                        per_precinct.push(encode_packet(&precinct_bands));
                    }
                }
                per_resolution.push(per_precinct);
            }
            bodies.push(per_resolution);
        }

        sort_packets(&mut ids, self.cod.progression_order());
        let mut tile = Vec::new();
        for id in &ids {
            tile.extend_from_slice(&bodies[id.component][id.resolution][id.precinct]);
        }
        tile
    }
}

/// Codes the code-blocks of `band` that fall inside precinct `precinct`.
fn code_precinct_band(
    coeffs: &[i32],
    stride: usize,
    band: &SubbandRect,
    precinct: (usize, usize),
    precinct_exp: (u32, u32),
    block_exp: (u32, u32),
    max_bit_planes: u32,
) -> PrecinctBand {
    let (cb_w, cb_h) = (1usize << block_exp.0, 1usize << block_exp.1);
    let span = |index: usize, p_exp: u32, b_exp: u32, extent: usize, side: usize| {
        let start = (index << p_exp) >> b_exp;
        let end = (((index + 1) << p_exp) >> b_exp).min(extent.div_ceil(side));
        start..end.max(start)
    };
    let xs = span(precinct.0, precinct_exp.0, block_exp.0, band.width, cb_w);
    let ys = span(precinct.1, precinct_exp.1, block_exp.1, band.height, cb_h);
    if xs.is_empty() || ys.is_empty() {
        return PrecinctBand::default();
    }

    let mut blocks: Vec<HtCodedBlock> = Vec::with_capacity(xs.len() * ys.len());
    for by in ys.clone() {
        for bx in xs.clone() {
            let (x0, y0) = (bx * cb_w, by * cb_h);
            let bw = cb_w.min(band.width - x0);
            let bh = cb_h.min(band.height - y0);
            let mut samples = Vec::with_capacity(bw * bh);
            for y in y0..y0 + bh {
                let start = (band.y0 + y) * stride + band.x0 + x0;
                samples.extend_from_slice(&coeffs[start..start + bw]);
            }
            blocks.push(HtBlockEncoder::new(bw, bh).encode(&samples, max_bit_planes));
        }
    }

    PrecinctBand {
        blocks_wide: xs.len(),
        blocks_high: ys.len(),
        blocks,
    }
}

/// Reversible colour transform on the first three components.
fn forward_rct(planes: &mut [Vec<i32>]) {
    let [r, g, b, ..] = planes else {
        return;
    };
    for ((r, g), b) in r.iter_mut().zip(g.iter_mut()).zip(b.iter_mut()) {
        let y = (*r + 2 * *g + *b) >> 2;
        let u = *b - *g;
        let v = *r - *g;
        (*r, *g, *b) = (y, u, v);
    }
}

/// Irreversible colour transform on the first three components.
fn forward_ict(planes: &mut [Vec<f32>]) {
    let [r, g, b, ..] = planes else {
        return;
    };
    for ((r, g), b) in r.iter_mut().zip(g.iter_mut()).zip(b.iter_mut()) {
        let y = 0.299 * *r + 0.587 * *g + 0.114 * *b;
        let cb = -0.168_75 * *r - 0.331_26 * *g + 0.5 * *b;
        let cr = 0.5 * *r - 0.418_69 * *g - 0.081_31 * *b;
        (*r, *g, *b) = (y, cb, cr);
    }
}

impl Codestream for J2kCodestream {
    fn access_siz(&mut self) -> &mut ParamSiz {
        &mut self.siz
    }

    fn access_cod(&mut self) -> &mut ParamCod {
        &mut self.cod
    }

    fn access_qcd(&mut self) -> &mut ParamQcd {
        &mut self.qcd
    }

    fn write_headers(&mut self, out: &mut dyn OutFile) -> Result<(), CodestreamError> {
        if self.state != State::Configuring {
            return Err(CodestreamError::InvalidState("headers already written"));
        }
        self.validate()?;
        self.precinct_exponents = self.derive_precinct_exponents()?;
        self.width = self.siz.width() as usize;
        self.height = self.siz.height() as usize;

        let samples = self
            .width
            .checked_mul(self.height)
            .ok_or(CodestreamError::Allocation("Image too large"))?;
        let mut planes = Vec::with_capacity(self.siz.components().len());
        for _ in self.siz.components() {
            let mut plane = Vec::new();
            plane
                .try_reserve_exact(samples)
                .map_err(|_| CodestreamError::Allocation("Failed to allocate tile buffer"))?;
            plane.resize(samples, 0);
            planes.push(plane);
        }
        self.planes = planes;

        let plan = self.quantization_plan();
        let precincts: Vec<(u8, u8)> = if self.cod.precinct_sizes().is_empty() {
            Vec::new()
        } else {
            self.precinct_exponents
                .iter()
                .map(|&(x, y)| (x as u8, y as u8))
                .collect()
        };

        let mut header = J2kWriter::new();
        header.write_soc();
        header.write_siz(&self.siz)?;
        header.write_cap(self.cod.is_reversible());
        header.write_cod(&self.cod, &precincts);
        header.write_qcd(&plan);
        out.write(&header.into_bytes())?;

        self.plan = Some(plan);
        self.state = State::Pushing {
            row: 0,
            component: 0,
            lent: false,
        };
        Ok(())
    }

    fn exchange(
        &mut self,
        filled: Option<LineBuf>,
    ) -> Result<Option<(LineBuf, u32)>, CodestreamError> {
        let State::Pushing {
            row,
            component,
            lent,
        } = self.state
        else {
            return Err(CodestreamError::InvalidState("not accepting lines"));
        };

        let Some(line) = filled else {
            if lent {
                return Err(CodestreamError::InvalidState("a line is already lent out"));
            }
            self.state = State::Pushing {
                row,
                component,
                lent: true,
            };
            return Ok(Some((LineBuf::new(self.width), component as u32)));
        };

        if !lent {
            return Err(CodestreamError::InvalidState("no line was lent out"));
        }
        if line.len() != self.width {
            return Err(CodestreamError::LineLength {
                expected: self.width,
                actual: line.len(),
            });
        }

        let start = row * self.width;
        self.planes[component][start..start + self.width].copy_from_slice(line.i32());

        let (mut row, mut component) = (row, component + 1);
        if component == self.planes.len() {
            component = 0;
            row += 1;
        }
        if row == self.height {
            self.state = State::Complete;
            return Ok(None);
        }
        self.state = State::Pushing {
            row,
            component,
            lent: true,
        };
        Ok(Some((line, component as u32)))
    }

    fn flush(&mut self, out: &mut dyn OutFile) -> Result<(), CodestreamError> {
        if self.state != State::Complete {
            return Err(CodestreamError::InvalidState("image data incomplete"));
        }
        let plan = self
            .plan
            .take()
            .ok_or(CodestreamError::InvalidState("headers not written"))?;

        self.level_shift();
        let coefficients = self.transform(&plan);
        let tile = self.encode_tile(&coefficients, &plan);

        let tile_part_len = u32::try_from(tile.len() + TILE_PART_HEADER_LEN).map_err(|_| {
            CodestreamError::InvalidParameter(format!(
                "tile data of {} bytes does not fit one tile-part",
                tile.len()
            ))
        })?;
        let mut framing = J2kWriter::new();
        framing.write_sot(tile_part_len);
        framing.write_sod();
        out.write(&framing.into_bytes())?;
        out.write(&tile)?;

        debug!(tile_bytes = tile.len(), total = out.tell(), "tile flushed");
        self.state = State::Flushed;
        Ok(())
    }

    fn close(&mut self, out: &mut dyn OutFile) -> Result<(), CodestreamError> {
        if self.state != State::Flushed {
            return Err(CodestreamError::InvalidState("codestream not flushed"));
        }
        let mut trailer = J2kWriter::new();
        trailer.write_eoc();
        out.write(&trailer.into_bytes())?;
        out.close();
        self.state = State::Closed;
        Ok(())
    }
}
