//! Boundary between a managed caller runtime and [`crate::encoder`].
//!
//! A runtime adapter (JNI, C ABI, Python) implements [`CallerRuntime`];
//! [`encode_for_caller`] then enforces the boundary rules: the input array
//! is borrowed read-only for the shortest possible scope, every failure is
//! reported through the runtime's error channel exactly once, and the
//! result is copied into a runtime-owned byte array.

use tracing::debug;

use crate::encoder::encode;
use crate::error::BridgeError;
use crate::params::EncodeParameters;

/// Size of the message buffer used by the caller-side error channel,
/// terminator included.
pub const MAX_ERROR_MESSAGE_LEN: usize = 512;

/// Services a caller runtime provides to the bridge.
pub trait CallerRuntime {
    /// Runtime handle for the input byte array.
    type Array: ?Sized;
    /// Runtime-owned byte array handed back to the caller.
    type Output;

    /// Raises a runtime error carrying `message`.
    fn throw_error(&mut self, message: &str);

    /// Runs `f` over a read-only view of `array`. The view is released
    /// without copying back when `f` returns, on success or failure.
    fn borrow_critical<R>(
        &mut self,
        array: &Self::Array,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, BridgeError>;

    /// Allocates a runtime byte array holding `data`.
    fn new_byte_array(&mut self, data: &[u8]) -> Result<Self::Output, BridgeError>;
}

/// Encodes the caller's pixels, reporting failures through `rt`.
///
/// Returns `None` once an error has been thrown.
pub fn encode_for_caller<R: CallerRuntime>(
    rt: &mut R,
    raw: Option<&R::Array>,
    params: &EncodeParameters,
) -> Option<R::Output> {
    match run(rt, raw, params) {
        Ok(output) => Some(output),
        Err(err) => {
            debug!(error = %err, "encode failed at caller boundary");
            rt.throw_error(&bounded_message(&err.to_string()));
            None
        }
    }
}

fn run<R: CallerRuntime>(
    rt: &mut R,
    raw: Option<&R::Array>,
    params: &EncodeParameters,
) -> Result<R::Output, BridgeError> {
    let raw = raw.ok_or(BridgeError::MissingInput)?;
    // The borrow ends before the runtime is touched again.
    let encoded = rt.borrow_critical(raw, |bytes| encode(bytes, params))??;
    rt.new_byte_array(&encoded)
}

/// Truncates `message` to fit the caller's error buffer.
fn bounded_message(message: &str) -> String {
    let limit = MAX_ERROR_MESSAGE_LEN - 1;
    if message.len() <= limit {
        return message.to_string();
    }
    let mut end = limit;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_string()
}
