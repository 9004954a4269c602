//! Codec collaborator interface.
//!
//! The encode pipeline talks to the block coder exclusively through the
//! [`Codestream`] trait: it configures the three parameter groups, asks the
//! codec to write its main header into an [`OutFile`], pushes one line per
//! component per row through [`Codestream::exchange`], then flushes and
//! closes. The reference implementation lives in [`crate::jpeg2000`].

pub mod params;

pub use params::{ComponentInfo, ParamCod, ParamQcd, ParamSiz, Point, Size};

use thiserror::Error;

/// Errors raised by a codec implementation or by the sink it writes into.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodestreamError {
    #[error("Invalid codestream state: {0}")]
    InvalidState(&'static str),
    #[error("Invalid codestream parameter: {0}")]
    InvalidParameter(String),
    #[error("Line buffer has {actual} samples, expected {expected}")]
    LineLength { expected: usize, actual: usize },
    #[error("{0}")]
    Allocation(&'static str),
}

/// Output target for a codestream.
///
/// `tell` reports a signed offset because codec position arithmetic is
/// signed, even though a sink never has a negative length.
pub trait OutFile {
    fn write(&mut self, data: &[u8]) -> Result<usize, CodestreamError>;
    fn tell(&self) -> i64;
    fn close(&mut self);
}

/// A single line of samples for one component, as 32-bit signed integers.
///
/// Line buffers are owned by the codec and lent to the caller for filling;
/// ownership goes back to the codec on the next [`Codestream::exchange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuf {
    samples: Vec<i32>,
}

impl LineBuf {
    pub fn new(width: usize) -> Self {
        Self {
            samples: vec![0; width],
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn i32(&self) -> &[i32] {
        &self.samples
    }

    pub fn i32_mut(&mut self) -> &mut [i32] {
        &mut self.samples
    }
}

/// The black-box codec consumed by the encode orchestrator.
pub trait Codestream {
    /// Image and tile size parameters (SIZ).
    fn access_siz(&mut self) -> &mut ParamSiz;

    /// Coding style parameters (COD).
    fn access_cod(&mut self) -> &mut ParamCod;

    /// Quantization parameters (QCD).
    fn access_qcd(&mut self) -> &mut ParamQcd;

    /// Validates the configuration and writes the main header.
    fn write_headers(&mut self, out: &mut dyn OutFile) -> Result<(), CodestreamError>;

    /// Line handshake.
    ///
    /// Called with `None` once to obtain the first empty line and the index
    /// of the component it belongs to. Every subsequent call submits a
    /// filled line and returns the next one, or `None` once the codec has
    /// received every line of the image.
    fn exchange(
        &mut self,
        filled: Option<LineBuf>,
    ) -> Result<Option<(LineBuf, u32)>, CodestreamError>;

    /// Encodes everything that was exchanged and writes the tile data.
    fn flush(&mut self, out: &mut dyn OutFile) -> Result<(), CodestreamError>;

    /// Terminates the codestream.
    fn close(&mut self, out: &mut dyn OutFile) -> Result<(), CodestreamError>;
}
