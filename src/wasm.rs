//! WebAssembly bindings for htj2kenc-rs.
//!
//! This module provides JavaScript-compatible functions via wasm-bindgen
//! for use in browsers and Node.js.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use crate::params::{EncodeParameters, ProgressionOrder};

/// Encode pixel-interleaved raw samples to an HTJ2K codestream.
///
/// # Arguments
/// * `pixels` - Raw samples; 16-bit samples as little-endian byte pairs
/// * `progression_order` - 0=LRCP, 1=RLCP, 2=RPCL, 3=PCRL, 4=CPRL
///
/// # Returns
/// The codestream as Uint8Array
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn encode_htj2k(
    pixels: &[u8],
    width: u32,
    height: u32,
    components: u32,
    bits_per_sample: u32,
    is_signed: bool,
    reversible: bool,
    compression_ratio: f32,
    progression_order: i32,
    decompositions: u32,
) -> Result<Vec<u8>, JsValue> {
    let params = EncodeParameters::new(width, height, components, bits_per_sample)
        .with_signed(is_signed)
        .with_reversible(reversible)
        .with_compression_ratio(compression_ratio)
        .with_progression_order(ProgressionOrder::from_raw(progression_order))
        .with_decompositions(decompositions);

    crate::encoder::encode(pixels, &params).map_err(|e| JsValue::from_str(&e.to_string()))
}
