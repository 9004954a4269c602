//! Reference HTJ2K encoder (ISO/IEC 15444-1 codestream, 15444-15 block coder)
//!
//! Everything here sits behind [`crate::codestream::Codestream`]:
//!
//! - `codestream`: The [`J2kCodestream`] state machine driving the pipeline.
//! - `writer` / `markers`: Main header and tile-part marker segments.
//! - `dwt`: Forward Discrete Wavelet Transform (5-3 and 9-7).
//! - `quantization`: Step sizes and scalar quantization.
//! - `ht_block_coder`: HT cleanup-pass coding of code-blocks (MEL, VLC, MagSgn).
//! - `packet` / `tag_tree` / `bit_io`: Packet headers and progression ordering.

pub mod bit_io;
pub mod codestream;
pub mod dwt;
pub mod ht_block_coder;
pub mod markers;
pub mod packet;
pub mod quantization;
pub mod tag_tree;
pub mod writer;

pub use codestream::{J2kCodestream, MAX_CODEC_DECOMPOSITIONS};
