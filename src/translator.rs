//! Translation of [`EncodeParameters`] into codec configuration.
//!
//! Derivation happens in two steps so the policy can be inspected without a
//! codec: [`derive_config`] computes a [`CodecConfig`] value, and
//! [`configure`] applies it to a fresh [`Codestream`].

use tracing::debug;

use crate::codestream::{Codestream, Point, Size};
use crate::error::{EncodeError, Result};
use crate::params::{EncodeParameters, ProgressionOrder};

/// Code-block width and height. Not exposed as a parameter.
pub const CODE_BLOCK_SIZE: u32 = 64;

/// Precinct width and height used for RPCL. Not exposed as a parameter.
pub const PRECINCT_SIZE: u32 = 256;

/// Fully derived codec configuration for one encode call.
#[derive(Debug, Clone, PartialEq)]
pub struct CodecConfig {
    pub width: u32,
    pub height: u32,
    pub components: u32,
    pub bits_per_sample: u32,
    pub is_signed: bool,
    pub decompositions: u32,
    pub reversible: bool,
    pub progression_order: ProgressionOrder,
    pub color_transform: bool,
    /// One entry per resolution level, `None` to keep the codec default.
    pub precincts: Option<Vec<Size>>,
    pub block_dims: Size,
    /// Target bits per pixel handed to the irreversible quantizer.
    pub target_bpp: Option<f32>,
}

/// Fails with [`EncodeError::RawDataTooSmall`] unless `raw_len` covers the
/// geometry described by `params`.
pub fn check_raw_size(params: &EncodeParameters, raw_len: usize) -> Result<()> {
    let expected = params.expected_raw_size()?;
    if raw_len < expected {
        return Err(EncodeError::RawDataTooSmall {
            expected,
            actual: raw_len,
        });
    }
    Ok(())
}

/// Applies the derivation policies to `params`.
pub fn derive_config(params: &EncodeParameters) -> Result<CodecConfig> {
    params.validate()?;

    let precincts = (params.progression_order == ProgressionOrder::Rpcl).then(|| {
        vec![Size::new(PRECINCT_SIZE, PRECINCT_SIZE); params.decompositions as usize + 1]
    });

    let target_bpp = (!params.reversible && params.compression_ratio > 0.0).then(|| {
        (params.bits_per_sample * params.components) as f32 / params.compression_ratio
    });

    Ok(CodecConfig {
        width: params.width,
        height: params.height,
        components: params.components,
        bits_per_sample: params.bits_per_sample,
        is_signed: params.is_signed,
        decompositions: params.decompositions,
        reversible: params.reversible,
        progression_order: params.progression_order,
        color_transform: params.components >= 3,
        precincts,
        block_dims: Size::new(CODE_BLOCK_SIZE, CODE_BLOCK_SIZE),
        target_bpp,
    })
}

/// Writes `config` into the parameter groups of `codestream`.
pub fn configure<C: Codestream + ?Sized>(config: &CodecConfig, codestream: &mut C) -> Result<()> {
    let siz = codestream.access_siz();
    siz.set_image_extent(Point::new(config.width, config.height));
    siz.set_num_components(config.components);
    for c in 0..config.components {
        siz.set_component(c, Point::new(1, 1), config.bits_per_sample, config.is_signed)?;
    }
    siz.set_image_offset(Point::new(0, 0));
    siz.set_tile_size(Size::new(config.width, config.height));
    siz.set_tile_offset(Point::new(0, 0));

    let cod = codestream.access_cod();
    cod.set_num_decomposition(config.decompositions);
    cod.set_reversible(config.reversible);
    cod.set_progression_order(config.progression_order.as_str())?;
    cod.set_color_transform(config.color_transform);
    if let Some(precincts) = &config.precincts {
        cod.set_precinct_size(precincts);
    }
    cod.set_block_dims(config.block_dims.w, config.block_dims.h);

    if let Some(bpp) = config.target_bpp {
        codestream.access_qcd().set_irrev_quant(bpp);
    }

    debug!(
        width = config.width,
        height = config.height,
        components = config.components,
        progression = %config.progression_order,
        reversible = config.reversible,
        color_transform = config.color_transform,
        target_bpp = ?config.target_bpp,
        "codec configured"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg2000::J2kCodestream;

    fn rgb(order: ProgressionOrder) -> EncodeParameters {
        EncodeParameters::new(64, 64, 3, 8).with_progression_order(order)
    }

    #[test]
    fn test_rpcl_precincts() {
        let config = derive_config(&rgb(ProgressionOrder::Rpcl).with_decompositions(5)).unwrap();
        let precincts = config.precincts.unwrap();
        assert_eq!(precincts.len(), 6);
        assert!(precincts.iter().all(|p| *p == Size::new(256, 256)));
    }

    #[test]
    fn test_precincts_only_for_rpcl() {
        for order in [
            ProgressionOrder::Lrcp,
            ProgressionOrder::Rlcp,
            ProgressionOrder::Pcrl,
            ProgressionOrder::Cprl,
        ] {
            assert!(derive_config(&rgb(order)).unwrap().precincts.is_none());
        }
    }

    #[test]
    fn test_color_transform_follows_component_count() {
        for reversible in [true, false] {
            for components in 1..=4 {
                let params = EncodeParameters::new(8, 8, components, 8)
                    .with_reversible(reversible)
                    .with_compression_ratio(5.0);
                let config = derive_config(&params).unwrap();
                assert_eq!(config.color_transform, components >= 3);
            }
        }
    }

    #[test]
    fn test_target_bpp() {
        let lossy = rgb(ProgressionOrder::Lrcp)
            .with_reversible(false)
            .with_compression_ratio(10.0);
        let bpp = derive_config(&lossy).unwrap().target_bpp.unwrap();
        assert!((bpp - 2.4).abs() < 1e-6);

        let lossless = lossy.with_reversible(true);
        assert!(derive_config(&lossless).unwrap().target_bpp.is_none());

        let no_ratio = lossy.with_compression_ratio(0.0);
        assert!(derive_config(&no_ratio).unwrap().target_bpp.is_none());

        let negative = lossy.with_compression_ratio(-3.0);
        assert!(derive_config(&negative).unwrap().target_bpp.is_none());
    }

    #[test]
    fn test_block_dims_fixed() {
        let config = derive_config(&EncodeParameters::new(5, 7, 1, 12)).unwrap();
        assert_eq!(config.block_dims, Size::new(64, 64));
    }

    #[test]
    fn test_raw_size_check() {
        let params = EncodeParameters::new(4, 4, 3, 16);
        assert!(check_raw_size(&params, 96).is_ok());
        let err = check_raw_size(&params, 95).unwrap_err();
        assert!(err.to_string().contains("smaller than expected"));
    }

    #[test]
    fn test_configure_populates_codestream() {
        let params = rgb(ProgressionOrder::Rpcl)
            .with_decompositions(3)
            .with_reversible(false)
            .with_compression_ratio(12.0)
            .with_signed(true);
        let config = derive_config(&params).unwrap();
        let mut codestream = J2kCodestream::new();
        configure(&config, &mut codestream).unwrap();

        let siz = codestream.access_siz();
        assert_eq!(siz.image_extent(), Point::new(64, 64));
        assert_eq!(siz.tile_size(), Size::new(64, 64));
        assert_eq!(siz.num_components(), 3);
        assert!(siz.components().iter().all(|c| c.is_signed && c.bit_depth == 8));

        let cod = codestream.access_cod();
        assert_eq!(cod.num_decompositions(), 3);
        assert!(!cod.is_reversible());
        assert!(cod.is_color_transform());
        assert_eq!(cod.progression_order(), ProgressionOrder::Rpcl);
        assert_eq!(cod.precinct_sizes().len(), 4);
        assert_eq!(cod.block_dims(), Size::new(64, 64));

        let bpp = codestream.access_qcd().irrev_quant().unwrap();
        assert!((bpp - 2.0).abs() < 1e-6);
    }
}
