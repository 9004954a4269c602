//! One-shot encode orchestration.
//!
//! A call runs the stages Configure, OpenSink, WriteHeaders, FeedPixels,
//! Flush, Close and Release in order. Any failure drops the session and the
//! sink and surfaces as an [`EncodeError`]; partial output never escapes.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::codestream::Codestream;
use crate::error::{EncodeError, Result};
use crate::feeder::feed_pixels;
use crate::jpeg2000::J2kCodestream;
use crate::params::EncodeParameters;
use crate::sink::MemSink;
use crate::translator::{check_raw_size, configure, derive_config};

/// Encodes `raw` with the built-in HTJ2K codec.
///
/// `raw` holds pixel-interleaved samples, one byte per sample up to 8 bits
/// and two little-endian bytes above. Trailing bytes beyond the expected
/// size are ignored.
pub fn encode(raw: &[u8], params: &EncodeParameters) -> Result<Vec<u8>> {
    encode_with(raw, params, J2kCodestream::new)
}

/// Encodes `raw` through a codec produced by `factory`.
///
/// The factory is only invoked once the parameters and the input size have
/// been checked.
///
/// A panic inside the codec is returned as an error, but the process-wide
/// panic hook still runs first and, by default, prints the panic to stderr.
/// Hosts that need silent failures install their own hook with
/// [`std::panic::set_hook`]; the hook is global, so it is not swapped per
/// call here.
pub fn encode_with<C, F>(raw: &[u8], params: &EncodeParameters, factory: F) -> Result<Vec<u8>>
where
    C: Codestream,
    F: FnOnce() -> C,
{
    panic::catch_unwind(AssertUnwindSafe(|| run_pipeline(raw, params, factory)))
        .unwrap_or_else(|payload| Err(panic_to_error(payload)))
}

fn run_pipeline<C, F>(raw: &[u8], params: &EncodeParameters, factory: F) -> Result<Vec<u8>>
where
    C: Codestream,
    F: FnOnce() -> C,
{
    let config = derive_config(params)?;
    check_raw_size(params, raw.len())?;

    let mut codestream = factory();
    configure(&config, &mut codestream)?;

    let mut sink = MemSink::new();
    sink.open()?;
    debug!(capacity = sink.capacity(), "sink opened");

    codestream.write_headers(&mut sink)?;
    debug!(bytes = sink.len(), "headers written");

    let lines = feed_pixels(&mut codestream, raw, params)?;
    debug!(lines, "pixels fed");

    codestream.flush(&mut sink)?;
    debug!(bytes = sink.len(), "codestream flushed");

    codestream.close(&mut sink)?;
    let output = sink.release();
    if output.is_empty() {
        return Err(EncodeError::EmptyOutput);
    }
    debug!(bytes = output.len(), "encode complete");
    Ok(output)
}

fn panic_to_error(payload: Box<dyn Any + Send>) -> EncodeError {
    if let Some(message) = payload.downcast_ref::<&str>() {
        EncodeError::Codec((*message).to_string())
    } else if let Some(message) = payload.downcast_ref::<String>() {
        EncodeError::Codec(message.clone())
    } else {
        EncodeError::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codestream::{CodestreamError, LineBuf, OutFile, ParamCod, ParamQcd, ParamSiz};
    use crate::params::ProgressionOrder;
    use std::cell::Cell;

    /// Codec stand-in with scripted behaviour.
    #[derive(Default)]
    struct ScriptedCodestream {
        siz: ParamSiz,
        cod: ParamCod,
        qcd: ParamQcd,
        lines_left: usize,
        width: usize,
        emit_nothing: bool,
        panic_with: Option<Box<dyn Fn() + Send>>,
    }

    impl Codestream for ScriptedCodestream {
        fn access_siz(&mut self) -> &mut ParamSiz {
            &mut self.siz
        }
        fn access_cod(&mut self) -> &mut ParamCod {
            &mut self.cod
        }
        fn access_qcd(&mut self) -> &mut ParamQcd {
            &mut self.qcd
        }
        fn write_headers(&mut self, out: &mut dyn OutFile) -> std::result::Result<(), CodestreamError> {
            self.width = self.siz.width() as usize;
            self.lines_left = (self.siz.height() * self.siz.num_components()) as usize;
            if !self.emit_nothing {
                out.write(&[0xFF, 0x4F])?;
            }
            Ok(())
        }
        fn exchange(
            &mut self,
            filled: Option<LineBuf>,
        ) -> std::result::Result<Option<(LineBuf, u32)>, CodestreamError> {
            if let Some(trigger) = &self.panic_with {
                trigger();
            }
            if filled.is_some() {
                self.lines_left -= 1;
            }
            Ok((self.lines_left > 0).then(|| (LineBuf::new(self.width), 0)))
        }
        fn flush(&mut self, _out: &mut dyn OutFile) -> std::result::Result<(), CodestreamError> {
            Ok(())
        }
        fn close(&mut self, out: &mut dyn OutFile) -> std::result::Result<(), CodestreamError> {
            if !self.emit_nothing {
                out.write(&[0xFF, 0xD9])?;
            }
            Ok(())
        }
    }

    fn gradient(params: &EncodeParameters) -> Vec<u8> {
        let size = params.expected_raw_size().unwrap();
        (0..size).map(|i| (i * 7 % 251) as u8).collect()
    }

    #[test]
    fn test_grayscale_lossless() {
        let params = EncodeParameters::new(256, 256, 1, 8);
        let out = encode(&gradient(&params), &params).unwrap();
        assert_eq!(&out[..2], &[0xFF, 0x4F]);
        assert_eq!(&out[out.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_rgb_lossy() {
        let params = EncodeParameters::new(64, 64, 3, 8)
            .with_reversible(false)
            .with_compression_ratio(10.0);
        let out = encode(&gradient(&params), &params).unwrap();
        assert!(!out.is_empty());
    }

    #[test]
    fn test_short_buffer_never_builds_codec() {
        let params = EncodeParameters::new(16, 16, 1, 8);
        let raw = vec![0u8; 255];
        let built = Cell::new(false);
        let err = encode_with(&raw, &params, || {
            built.set(true);
            ScriptedCodestream::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("Raw data size is smaller than expected"));
        assert!(!built.get());
    }

    #[test]
    fn test_invalid_params_fail_before_codec() {
        let params = EncodeParameters::new(0, 16, 1, 8);
        let err = encode_with(&[], &params, || -> ScriptedCodestream {
            panic!("factory must not run")
        })
        .unwrap_err();
        assert!(matches!(err, EncodeError::InvalidParameter(_)));
    }

    #[test]
    fn test_reversible_is_deterministic() {
        let params = EncodeParameters::new(40, 24, 3, 16)
            .with_progression_order(ProgressionOrder::Rpcl);
        let raw = gradient(&params);
        assert_eq!(encode(&raw, &params).unwrap(), encode(&raw, &params).unwrap());
    }

    #[test]
    fn test_every_progression_order_encodes() {
        for order in [
            ProgressionOrder::Lrcp,
            ProgressionOrder::Rlcp,
            ProgressionOrder::Rpcl,
            ProgressionOrder::Pcrl,
            ProgressionOrder::Cprl,
        ] {
            let params = EncodeParameters::new(33, 17, 3, 8).with_progression_order(order);
            let out = encode(&gradient(&params), &params).unwrap();
            assert_eq!(out[out.len() - 1], 0xD9, "{order}");
        }
    }

    #[test]
    fn test_too_many_levels_is_codec_error() {
        let params = EncodeParameters::new(8, 8, 1, 8).with_decompositions(33);
        let err = encode(&gradient(&params), &params).unwrap_err();
        assert!(matches!(err, EncodeError::Codec(_)), "{err:?}");
    }

    #[test]
    fn test_codec_stopping_early_is_error() {
        let params = EncodeParameters::new(4, 4, 2, 8);

        struct Truncated(ScriptedCodestream);
        impl Codestream for Truncated {
            fn access_siz(&mut self) -> &mut ParamSiz {
                self.0.access_siz()
            }
            fn access_cod(&mut self) -> &mut ParamCod {
                self.0.access_cod()
            }
            fn access_qcd(&mut self) -> &mut ParamQcd {
                self.0.access_qcd()
            }
            fn write_headers(
                &mut self,
                out: &mut dyn OutFile,
            ) -> std::result::Result<(), CodestreamError> {
                self.0.write_headers(out)?;
                self.0.lines_left = 3;
                Ok(())
            }
            fn exchange(
                &mut self,
                filled: Option<LineBuf>,
            ) -> std::result::Result<Option<(LineBuf, u32)>, CodestreamError> {
                self.0.exchange(filled)
            }
            fn flush(&mut self, out: &mut dyn OutFile) -> std::result::Result<(), CodestreamError> {
                self.0.flush(out)
            }
            fn close(&mut self, out: &mut dyn OutFile) -> std::result::Result<(), CodestreamError> {
                self.0.close(out)
            }
        }

        let err = encode_with(&gradient(&params), &params, || {
            Truncated(ScriptedCodestream::default())
        })
        .unwrap_err();
        assert!(err.to_string().contains("stopped requesting lines"));
    }

    #[test]
    fn test_empty_output_is_error() {
        let params = EncodeParameters::new(2, 2, 1, 8);
        let err = encode_with(&gradient(&params), &params, || ScriptedCodestream {
            emit_nothing: true,
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, EncodeError::EmptyOutput);
    }

    #[test]
    fn test_panic_with_message_becomes_codec_error() {
        let params = EncodeParameters::new(2, 2, 1, 8);
        let err = encode_with(&gradient(&params), &params, || ScriptedCodestream {
            panic_with: Some(Box::new(|| panic!("tile buffer exhausted"))),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, EncodeError::Codec("tile buffer exhausted".into()));
    }

    #[test]
    fn test_opaque_panic_becomes_unknown() {
        let params = EncodeParameters::new(2, 2, 1, 8);
        let err = encode_with(&gradient(&params), &params, || ScriptedCodestream {
            panic_with: Some(Box::new(|| std::panic::panic_any(42u32))),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, EncodeError::Unknown);
        assert_eq!(err.to_string(), "Unknown error during HTJ2K encoding");
    }
}
