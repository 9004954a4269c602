//! Pixel feeding through the codec's line-exchange handshake.
//!
//! The raw buffer is pixel-interleaved (`row, column, component`); the codec
//! pulls one line per component per row and decides which component it
//! wants next. [`LineExchange`] wraps the handshake as a cursor and
//! [`SampleLayout`] turns interleaved bytes into `i32` samples.

use tracing::trace;

use crate::codestream::{Codestream, CodestreamError, LineBuf};
use crate::error::Result;
use crate::params::EncodeParameters;

/// An empty line lent by the codec, tagged with the component it expects.
#[derive(Debug)]
pub struct Line {
    pub buf: LineBuf,
    pub component: u32,
}

/// Cursor over [`Codestream::exchange`].
pub struct LineExchange<'c, C: Codestream + ?Sized> {
    codestream: &'c mut C,
    pending: Option<Line>,
    submitted: usize,
}

impl<'c, C: Codestream + ?Sized> LineExchange<'c, C> {
    /// Requests the first line from the codec.
    pub fn begin(codestream: &'c mut C) -> Result<Self> {
        let pending = codestream
            .exchange(None)?
            .map(|(buf, component)| Line { buf, component });
        Ok(Self {
            codestream,
            pending,
            submitted: 0,
        })
    }

    /// Takes the line the codec currently expects.
    pub fn next_line(&mut self) -> Result<Line> {
        self.pending.take().ok_or_else(|| {
            CodestreamError::InvalidState("codec stopped requesting lines").into()
        })
    }

    /// Hands a filled line back and fetches the next one.
    pub fn submit_line(&mut self, line: Line) -> Result<()> {
        self.pending = self
            .codestream
            .exchange(Some(line.buf))?
            .map(|(buf, component)| Line { buf, component });
        self.submitted += 1;
        Ok(())
    }

    /// Number of lines handed back so far.
    pub fn submitted(&self) -> usize {
        self.submitted
    }
}

/// Location and format of samples inside the interleaved raw buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLayout {
    pub width: usize,
    pub components: usize,
    pub bytes_per_sample: usize,
    pub is_signed: bool,
}

impl SampleLayout {
    pub fn from_params(params: &EncodeParameters) -> Self {
        Self {
            width: params.width as usize,
            components: params.components as usize,
            bytes_per_sample: params.bytes_per_sample(),
            is_signed: params.is_signed,
        }
    }

    fn row_stride(&self) -> usize {
        self.width * self.components * self.bytes_per_sample
    }

    /// Decodes component `component` of row `row` into `out`.
    ///
    /// `raw` must hold at least `row + 1` complete rows.
    pub fn fill_line(&self, raw: &[u8], row: usize, component: usize, out: &mut [i32]) {
        let stride = self.row_stride();
        let src = &raw[row * stride..(row + 1) * stride];
        let step = self.components * self.bytes_per_sample;
        let first = component * self.bytes_per_sample;

        if self.bytes_per_sample == 1 {
            let samples = src[first..].iter().step_by(step);
            for (dst, &byte) in out.iter_mut().zip(samples) {
                *dst = if self.is_signed {
                    byte as i8 as i32
                } else {
                    byte as i32
                };
            }
        } else {
            let pairs = src[first..].chunks(step);
            for (dst, pair) in out.iter_mut().zip(pairs) {
                let value = u16::from_le_bytes([pair[0], pair[1]]);
                *dst = if self.is_signed {
                    value as i16 as i32
                } else {
                    value as i32
                };
            }
        }
    }
}

/// Pushes every line of `raw` into `codestream`.
///
/// Exactly `height * components` lines are submitted, row-major and
/// component-minor, each filled for the component the codec asked for.
pub fn feed_pixels<C: Codestream + ?Sized>(
    codestream: &mut C,
    raw: &[u8],
    params: &EncodeParameters,
) -> Result<usize> {
    let layout = SampleLayout::from_params(params);
    let mut exchange = LineExchange::begin(codestream)?;

    for row in 0..params.height as usize {
        for _ in 0..params.components {
            let mut line = exchange.next_line()?;
            let component = line.component as usize;
            if component >= layout.components {
                return Err(CodestreamError::InvalidParameter(format!(
                    "codec requested component {component} of {}",
                    layout.components
                ))
                .into());
            }
            if line.buf.len() != layout.width {
                return Err(CodestreamError::LineLength {
                    expected: layout.width,
                    actual: line.buf.len(),
                }
                .into());
            }
            layout.fill_line(raw, row, component, line.buf.i32_mut());
            exchange.submit_line(line)?;
        }
    }

    trace!(lines = exchange.submitted(), "pixel feed complete");
    Ok(exchange.submitted())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codestream::{OutFile, ParamCod, ParamQcd, ParamSiz};
    use proptest::prelude::*;

    /// Codec double that records every submitted line and can request
    /// components in a non-sequential order.
    struct RecordingCodestream {
        siz: ParamSiz,
        cod: ParamCod,
        qcd: ParamQcd,
        width: usize,
        order: Vec<u32>,
        lines: Vec<(u32, Vec<i32>)>,
        total: usize,
        calls: usize,
    }

    impl RecordingCodestream {
        fn new(width: usize, height: usize, order: Vec<u32>) -> Self {
            let total = height * order.len();
            Self {
                siz: ParamSiz::default(),
                cod: ParamCod::default(),
                qcd: ParamQcd::default(),
                width,
                order,
                lines: Vec::new(),
                total,
                calls: 0,
            }
        }

        fn component_for(&self, index: usize) -> u32 {
            self.order[index % self.order.len()]
        }
    }

    impl Codestream for RecordingCodestream {
        fn access_siz(&mut self) -> &mut ParamSiz {
            &mut self.siz
        }

        fn access_cod(&mut self) -> &mut ParamCod {
            &mut self.cod
        }

        fn access_qcd(&mut self) -> &mut ParamQcd {
            &mut self.qcd
        }

        fn write_headers(&mut self, _out: &mut dyn OutFile) -> Result<(), CodestreamError> {
            Ok(())
        }

        fn exchange(
            &mut self,
            filled: Option<LineBuf>,
        ) -> Result<Option<(LineBuf, u32)>, CodestreamError> {
            self.calls += 1;
            if let Some(buf) = filled {
                let component = self.component_for(self.lines.len());
                self.lines.push((component, buf.i32().to_vec()));
            }
            if self.lines.len() == self.total {
                return Ok(None);
            }
            Ok(Some((
                LineBuf::new(self.width),
                self.component_for(self.lines.len()),
            )))
        }

        fn flush(&mut self, _out: &mut dyn OutFile) -> Result<(), CodestreamError> {
            Ok(())
        }

        fn close(&mut self, _out: &mut dyn OutFile) -> Result<(), CodestreamError> {
            Ok(())
        }
    }

    #[test]
    fn test_one_submission_per_component_per_row() {
        let params = EncodeParameters::new(3, 4, 3, 8);
        let raw: Vec<u8> = (0..36).collect();
        let mut codec = RecordingCodestream::new(3, 4, vec![0, 1, 2]);

        let submitted = feed_pixels(&mut codec, &raw, &params).unwrap();
        assert_eq!(submitted, 12);
        assert_eq!(codec.lines.len(), 12);
        // One initial request plus one call per submitted line.
        assert_eq!(codec.calls, 13);

        // Row 1, component 2: bytes 9+2, 9+5, 9+8.
        assert_eq!(codec.lines[5], (2, vec![11, 14, 17]));
    }

    #[test]
    fn test_codec_component_index_is_authoritative() {
        let params = EncodeParameters::new(2, 2, 3, 8);
        let raw = vec![
            10, 20, 30, 11, 21, 31, //
            12, 22, 32, 13, 23, 33,
        ];
        let mut codec = RecordingCodestream::new(2, 2, vec![2, 0, 1]);
        feed_pixels(&mut codec, &raw, &params).unwrap();

        assert_eq!(codec.lines[0], (2, vec![30, 31]));
        assert_eq!(codec.lines[1], (0, vec![10, 11]));
        assert_eq!(codec.lines[2], (1, vec![20, 21]));
        assert_eq!(codec.lines[3], (2, vec![32, 33]));
    }

    #[test]
    fn test_out_of_range_component_is_rejected() {
        let params = EncodeParameters::new(2, 1, 1, 8);
        let mut codec = RecordingCodestream::new(2, 1, vec![3]);
        let err = feed_pixels(&mut codec, &[0, 0], &params).unwrap_err();
        assert!(err.to_string().contains("component 3"));
    }

    #[test]
    fn test_codec_stopping_early_is_an_error() {
        let params = EncodeParameters::new(2, 3, 1, 8);
        let mut codec = RecordingCodestream::new(2, 1, vec![0]);
        assert!(feed_pixels(&mut codec, &[0; 6], &params).is_err());
    }

    #[test]
    fn test_signed_8bit() {
        let layout = SampleLayout {
            width: 4,
            components: 1,
            bytes_per_sample: 1,
            is_signed: true,
        };
        let mut out = [0i32; 4];
        layout.fill_line(&[0x00, 0x7F, 0x80, 0xFF], 0, 0, &mut out);
        assert_eq!(out, [0, 127, -128, -1]);

        let unsigned = SampleLayout {
            is_signed: false,
            ..layout
        };
        unsigned.fill_line(&[0x00, 0x7F, 0x80, 0xFF], 0, 0, &mut out);
        assert_eq!(out, [0, 127, 128, 255]);
    }

    #[test]
    fn test_16bit_little_endian() {
        let layout = SampleLayout {
            width: 2,
            components: 2,
            bytes_per_sample: 2,
            is_signed: false,
        };
        // Pixel 0: c0=0x0102, c1=0xFFFF. Pixel 1: c0=0x8000, c1=0x0010.
        let raw = [0x02, 0x01, 0xFF, 0xFF, 0x00, 0x80, 0x10, 0x00];
        let mut out = [0i32; 2];
        layout.fill_line(&raw, 0, 0, &mut out);
        assert_eq!(out, [0x0102, 0x8000]);
        layout.fill_line(&raw, 0, 1, &mut out);
        assert_eq!(out, [0xFFFF, 0x0010]);

        let signed = SampleLayout {
            is_signed: true,
            ..layout
        };
        signed.fill_line(&raw, 0, 0, &mut out);
        assert_eq!(out, [0x0102, -32768]);
        signed.fill_line(&raw, 0, 1, &mut out);
        assert_eq!(out, [-1, 16]);
    }

    #[test]
    fn test_second_row_offset() {
        let layout = SampleLayout {
            width: 2,
            components: 1,
            bytes_per_sample: 2,
            is_signed: false,
        };
        let raw = [0, 0, 0, 0, 0x34, 0x12, 0x78, 0x56];
        let mut out = [0i32; 2];
        layout.fill_line(&raw, 1, 0, &mut out);
        assert_eq!(out, [0x1234, 0x5678]);
    }

    proptest! {
        #[test]
        fn prop_8bit_matches_index_formula(
            width in 1usize..8,
            components in 1usize..5,
            row in 0usize..3,
            signed in any::<bool>(),
            seed in any::<u8>(),
        ) {
            let rows = 3;
            let raw: Vec<u8> = (0..width * components * rows)
                .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
                .collect();
            let layout = SampleLayout { width, components, bytes_per_sample: 1, is_signed: signed };
            let mut out = vec![0i32; width];
            for c in 0..components {
                layout.fill_line(&raw, row, c, &mut out);
                for x in 0..width {
                    let byte = raw[row * width * components + x * components + c];
                    let expected = if signed { byte as i8 as i32 } else { byte as i32 };
                    prop_assert_eq!(out[x], expected);
                }
            }
        }

        #[test]
        fn prop_16bit_matches_index_formula(
            width in 1usize..6,
            components in 1usize..4,
            signed in any::<bool>(),
            seed in any::<u16>(),
        ) {
            let raw: Vec<u8> = (0..width * components)
                .flat_map(|i| (seed.wrapping_add((i as u16).wrapping_mul(4099))).to_le_bytes())
                .collect();
            let layout = SampleLayout { width, components, bytes_per_sample: 2, is_signed: signed };
            let mut out = vec![0i32; width];
            for c in 0..components {
                layout.fill_line(&raw, 0, c, &mut out);
                for x in 0..width {
                    let offset = (x * components + c) * 2;
                    let value = raw[offset] as u16 | (raw[offset + 1] as u16) << 8;
                    let expected = if signed { value as i16 as i32 } else { value as i32 };
                    prop_assert_eq!(out[x], expected);
                }
            }
        }
    }
}
