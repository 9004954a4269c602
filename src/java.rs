//! JNI entry point for `org.dcm4che3.openjph.OpenJPH.encode` (feature `jni`).
//!
//! Java signature: `static native byte[] encode(byte[] rawPixelData,
//! int width, int height, int components, int bitsPerSample,
//! boolean isSigned, boolean reversible, float compressionRatio,
//! int progressionOrder, int decompositions)`, i.e. `([BIIIIZZFII)[B`.

use jni::JNIEnv;
use jni::objects::{JByteArray, JClass, ReleaseMode};
use jni::sys::{JNI_FALSE, jboolean, jbyteArray, jfloat, jint};
use tracing::warn;

use crate::bridge::{CallerRuntime, encode_for_caller};
use crate::error::BridgeError;
use crate::params::{EncodeParameters, ProgressionOrder};

/// Exception class raised on every failure.
pub const EXCEPTION_CLASS: &str = "org/dcm4che3/openjph/OpenJPHException";

struct JniRuntime<'a, 'local> {
    env: &'a mut JNIEnv<'local>,
}

impl<'local> CallerRuntime for JniRuntime<'_, 'local> {
    type Array = JByteArray<'local>;
    type Output = JByteArray<'local>;

    fn throw_error(&mut self, message: &str) {
        if let Err(e) = self.env.throw_new(EXCEPTION_CLASS, message) {
            warn!(error = %e, "failed to raise {EXCEPTION_CLASS}");
        }
    }

    fn borrow_critical<R>(
        &mut self,
        array: &JByteArray<'local>,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, BridgeError> {
        // SAFETY: `f` cannot reach the JNIEnv while the critical region is
        // held, and the elements are released (without copy-back) on drop.
        let elements = unsafe {
            self.env
                .get_array_elements_critical(array, ReleaseMode::NoCopyBack)
        }
        .map_err(|_| BridgeError::InputAccess)?;
        // SAFETY: jbyte and u8 share size and alignment.
        let bytes = unsafe {
            std::slice::from_raw_parts(elements.as_ptr() as *const u8, elements.len())
        };
        Ok(f(bytes))
    }

    fn new_byte_array(&mut self, data: &[u8]) -> Result<JByteArray<'local>, BridgeError> {
        self.env
            .byte_array_from_slice(data)
            .map_err(|_| BridgeError::OutputAllocation)
    }
}

fn non_negative(value: jint) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub extern "system" fn Java_org_dcm4che3_openjph_OpenJPH_encode<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    raw_pixel_data: JByteArray<'local>,
    width: jint,
    height: jint,
    components: jint,
    bits_per_sample: jint,
    is_signed: jboolean,
    reversible: jboolean,
    compression_ratio: jfloat,
    progression_order: jint,
    decompositions: jint,
) -> jbyteArray {
    let params = EncodeParameters::new(
        non_negative(width),
        non_negative(height),
        non_negative(components),
        non_negative(bits_per_sample),
    )
    .with_signed(is_signed != JNI_FALSE)
    .with_reversible(reversible != JNI_FALSE)
    .with_compression_ratio(compression_ratio)
    .with_progression_order(ProgressionOrder::from_raw(progression_order))
    .with_decompositions(non_negative(decompositions));

    let raw = (!raw_pixel_data.is_null()).then_some(&raw_pixel_data);
    let mut runtime = JniRuntime { env: &mut env };
    match encode_for_caller(&mut runtime, raw, &params) {
        Some(array) => array.into_raw(),
        None => std::ptr::null_mut(),
    }
}
