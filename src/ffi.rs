//! C Foreign Function Interface for htj2kenc-rs.
//!
//! Mirrors a small C wrapper API: one encode call returning a result
//! struct by value, and one function releasing it.

use std::ffi::{CString, c_char, c_float, c_int};
use std::ptr;

use crate::encoder::encode;
use crate::params::{EncodeParameters, ProgressionOrder};

/// Progression order constants accepted in `progression_order`.
pub const HTJ2K_PROG_LRCP: c_int = 0;
pub const HTJ2K_PROG_RLCP: c_int = 1;
pub const HTJ2K_PROG_RPCL: c_int = 2;
pub const HTJ2K_PROG_PCRL: c_int = 3;
pub const HTJ2K_PROG_CPRL: c_int = 4;

/// Encode parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Htj2kEncodeParams {
    pub width: c_int,
    pub height: c_int,
    pub components: c_int,
    pub bits_per_sample: c_int,
    pub is_signed: c_int,
    /// 1 for lossless (5/3), 0 for lossy (9/7)
    pub reversible: c_int,
    /// e.g. 10.0 for 10:1; 0 for lossless
    pub compression_ratio: c_float,
    /// One of the `HTJ2K_PROG_*` constants
    pub progression_order: c_int,
    pub decompositions: c_int,
}

/// Result of [`htj2k_encode`]. Exactly one of `data` and `error` is set.
#[repr(C)]
#[derive(Debug)]
pub struct Htj2kEncodeResult {
    pub data: *mut u8,
    pub size: usize,
    pub error: *mut c_char,
}

impl Htj2kEncodeResult {
    fn success(bytes: Vec<u8>) -> Self {
        let boxed = bytes.into_boxed_slice();
        let size = boxed.len();
        Self {
            data: Box::into_raw(boxed) as *mut u8,
            size,
            error: ptr::null_mut(),
        }
    }

    fn failure(message: &str) -> Self {
        // Interior NULs would truncate the message on the C side anyway.
        let message = CString::new(message.replace('\0', " ")).unwrap_or_default();
        Self {
            data: ptr::null_mut(),
            size: 0,
            error: message.into_raw(),
        }
    }
}

fn non_negative(value: c_int) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

impl From<&Htj2kEncodeParams> for EncodeParameters {
    fn from(p: &Htj2kEncodeParams) -> Self {
        EncodeParameters::new(
            non_negative(p.width),
            non_negative(p.height),
            non_negative(p.components),
            non_negative(p.bits_per_sample),
        )
        .with_signed(p.is_signed != 0)
        .with_reversible(p.reversible != 0)
        .with_compression_ratio(p.compression_ratio)
        .with_progression_order(ProgressionOrder::from_raw(p.progression_order))
        .with_decompositions(non_negative(p.decompositions))
    }
}

/// Encode pixel-interleaved raw samples to an HTJ2K codestream.
///
/// 16-bit samples are little-endian byte pairs.
///
/// # Safety
/// `raw_data` must point to `raw_size` readable bytes (or be null with
/// `raw_size == 0`); `params` must point to a valid parameter struct. The
/// result must be released with [`htj2k_free_result`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn htj2k_encode(
    raw_data: *const u8,
    raw_size: usize,
    params: *const Htj2kEncodeParams,
) -> Htj2kEncodeResult {
    if params.is_null() {
        return Htj2kEncodeResult::failure("params must not be null");
    }
    let params = EncodeParameters::from(unsafe { &*params });
    let raw = if raw_data.is_null() {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(raw_data, raw_size) }
    };

    match encode(raw, &params) {
        Ok(bytes) => Htj2kEncodeResult::success(bytes),
        Err(e) => Htj2kEncodeResult::failure(&e.to_string()),
    }
}

/// Free memory held by a result. Safe to call more than once.
///
/// # Safety
/// `result` must be null or point to a result returned by
/// [`htj2k_encode`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn htj2k_free_result(result: *mut Htj2kEncodeResult) {
    let Some(result) = (unsafe { result.as_mut() }) else {
        return;
    };
    if !result.data.is_null() {
        let slice = ptr::slice_from_raw_parts_mut(result.data, result.size);
        drop(unsafe { Box::from_raw(slice) });
        result.data = ptr::null_mut();
        result.size = 0;
    }
    if !result.error.is_null() {
        drop(unsafe { CString::from_raw(result.error) });
        result.error = ptr::null_mut();
    }
}
