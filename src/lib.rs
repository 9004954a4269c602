//! HTJ2K (High-Throughput JPEG 2000) encoding of raw pixel buffers.
//!
//! [`encode`] turns pixel-interleaved samples plus [`EncodeParameters`] into
//! a complete codestream held in memory. The codec sits behind the
//! [`Codestream`] trait; [`J2kCodestream`] is the built-in backend.

pub mod bridge;
pub mod codestream;
pub mod encoder;
pub mod error;
pub mod feeder;
pub mod jpeg2000;
pub mod params;
pub mod sink;
pub mod translator;

#[cfg(feature = "ffi")]
pub mod ffi;
#[cfg(feature = "jni")]
pub mod java;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use bridge::{CallerRuntime, encode_for_caller};
pub use codestream::Codestream;
pub use encoder::{encode, encode_with};
pub use error::{BridgeError, EncodeError};
pub use jpeg2000::J2kCodestream;
pub use params::{EncodeParameters, ProgressionOrder};
pub use sink::MemSink;
