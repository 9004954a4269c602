//! In-memory codestream sink.

use crate::codestream::{CodestreamError, OutFile};

/// Capacity reserved by [`MemSink::open`].
pub const INITIAL_CAPACITY: usize = 64 * 1024;

/// Append-only output buffer that doubles its capacity on demand.
///
/// The finished codestream is moved out with [`MemSink::release`], which
/// leaves the sink empty with no storage, so the bytes have exactly one
/// owner at any time.
#[derive(Debug, Default)]
pub struct MemSink {
    buf: Vec<u8>,
}

impl MemSink {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Resets to an empty buffer with [`INITIAL_CAPACITY`] reserved.
    pub fn open(&mut self) -> Result<(), CodestreamError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(INITIAL_CAPACITY)
            .map_err(|_| CodestreamError::Allocation("Failed to allocate output buffer"))?;
        self.buf = buf;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Moves the written bytes out and resets the sink to zero capacity.
    pub fn release(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    fn grow_for(&mut self, additional: usize) -> Result<(), CodestreamError> {
        let required = self
            .buf
            .len()
            .checked_add(additional)
            .ok_or(CodestreamError::Allocation("Failed to grow output buffer"))?;
        if required <= self.buf.capacity() {
            return Ok(());
        }

        let mut capacity = self.buf.capacity().max(INITIAL_CAPACITY);
        while capacity < required {
            capacity = capacity
                .checked_mul(2)
                .ok_or(CodestreamError::Allocation("Failed to grow output buffer"))?;
        }
        self.buf
            .try_reserve_exact(capacity - self.buf.len())
            .map_err(|_| CodestreamError::Allocation("Failed to grow output buffer"))
    }
}

impl OutFile for MemSink {
    fn write(&mut self, data: &[u8]) -> Result<usize, CodestreamError> {
        self.grow_for(data.len())?;
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn tell(&self) -> i64 {
        self.buf.len() as i64
    }

    fn close(&mut self) {}
}
