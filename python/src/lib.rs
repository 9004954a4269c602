//! Python bindings for htj2kenc-rs using PyO3.

use htj2kenc_rs::bridge::{CallerRuntime, encode_for_caller};
use htj2kenc_rs::{BridgeError, EncodeParameters, ProgressionOrder};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBytes;

/// Bridge runtime backed by the GIL-holding interpreter.
struct PyRuntime<'py> {
    py: Python<'py>,
    error: Option<String>,
}

impl CallerRuntime for PyRuntime<'_> {
    type Array = [u8];
    type Output = Py<PyBytes>;

    fn throw_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }

    fn borrow_critical<R>(
        &mut self,
        array: &[u8],
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, BridgeError> {
        Ok(f(array))
    }

    fn new_byte_array(&mut self, data: &[u8]) -> Result<Py<PyBytes>, BridgeError> {
        Ok(PyBytes::new(self.py, data).into())
    }
}

#[allow(clippy::too_many_arguments)]
fn build_params(
    width: u32,
    height: u32,
    components: u32,
    bits_per_sample: u32,
    is_signed: bool,
    reversible: bool,
    compression_ratio: f32,
    progression_order: i32,
    decompositions: u32,
) -> EncodeParameters {
    EncodeParameters::new(width, height, components, bits_per_sample)
        .with_signed(is_signed)
        .with_reversible(reversible)
        .with_compression_ratio(compression_ratio)
        .with_progression_order(ProgressionOrder::from_raw(progression_order))
        .with_decompositions(decompositions)
}

fn run(py: Python<'_>, data: &[u8], params: &EncodeParameters) -> PyResult<Py<PyBytes>> {
    let mut runtime = PyRuntime { py, error: None };
    match encode_for_caller(&mut runtime, Some(data), params) {
        Some(bytes) => Ok(bytes),
        None => Err(PyValueError::new_err(
            runtime.error.unwrap_or_else(|| "HTJ2K encoding failed".to_string()),
        )),
    }
}

/// Encode raw pixels to an HTJ2K codestream.
///
/// Args:
///     data: Pixel-interleaved samples (16-bit as little-endian pairs)
///     width: Image width
///     height: Image height
///     components: Number of components (1 or 3)
///     bits_per_sample: Bits per sample (1-16)
///     progression_order: 0=LRCP, 1=RLCP, 2=RPCL, 3=PCRL, 4=CPRL
///
/// Returns:
///     Codestream bytes
#[pyfunction]
#[pyo3(signature = (data, width, height, components=1, bits_per_sample=8, is_signed=false, reversible=true, compression_ratio=0.0, progression_order=0, decompositions=5))]
#[allow(clippy::too_many_arguments)]
fn encode(
    py: Python<'_>,
    data: &[u8],
    width: u32,
    height: u32,
    components: u32,
    bits_per_sample: u32,
    is_signed: bool,
    reversible: bool,
    compression_ratio: f32,
    progression_order: i32,
    decompositions: u32,
) -> PyResult<Py<PyBytes>> {
    let params = build_params(
        width,
        height,
        components,
        bits_per_sample,
        is_signed,
        reversible,
        compression_ratio,
        progression_order,
        decompositions,
    );
    run(py, data, &params)
}

/// Encode a raw pixel file and write the codestream to `output`.
#[pyfunction]
#[pyo3(signature = (input, output, width, height, components=1, bits_per_sample=8, is_signed=false, reversible=true, compression_ratio=0.0, progression_order=0, decompositions=5))]
#[allow(clippy::too_many_arguments)]
fn encode_file(
    py: Python<'_>,
    input: &str,
    output: &str,
    width: u32,
    height: u32,
    components: u32,
    bits_per_sample: u32,
    is_signed: bool,
    reversible: bool,
    compression_ratio: f32,
    progression_order: i32,
    decompositions: u32,
) -> PyResult<usize> {
    let data = std::fs::read(input).map_err(|e| PyIOError::new_err(e.to_string()))?;
    let params = build_params(
        width,
        height,
        components,
        bits_per_sample,
        is_signed,
        reversible,
        compression_ratio,
        progression_order,
        decompositions,
    );
    let encoded = run(py, &data, &params)?;
    let bytes = encoded.as_ref(py).as_bytes();
    std::fs::write(output, bytes).map_err(|e| PyIOError::new_err(e.to_string()))?;
    Ok(bytes.len())
}

#[pymodule]
fn htj2kenc(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(encode, m)?)?;
    m.add_function(wrap_pyfunction!(encode_file, m)?)?;
    Ok(())
}
