//! Gated field decoder.
//!
//! Mirrors the encoder: the latent is split back into its X and H halves,
//! the halves are re-projected and gated with the roles swapped (X becomes
//! the column factor, H the row factor), and the gated field is projected
//! to the reconstruction of stream Y.

use candle_core::{bail, Module, Result, Tensor};
use candle_nn::VarBuilder;
use gfn_core::GatedFieldConfig;

use crate::factor::{factor_projection, gated_interaction, DenseStack};

/// Decoder half of the gated field autoencoder
pub struct GatedFieldDecoder {
    x_factor: DenseStack,
    h_factor: DenseStack,
    y_factor: DenseStack,
    config: GatedFieldConfig,
}

impl GatedFieldDecoder {
    pub fn new(config: GatedFieldConfig, vb: VarBuilder) -> Result<Self> {
        config.validate().map_err(crate::config_error)?;

        let latent = config.latent_dim;
        let h_width = config.latent_width() - latent;

        let x_factor = DenseStack::uniform(latent, latent, vb.pp("x_factor"))?;
        let h_factor = DenseStack::uniform(h_width, latent, vb.pp("h_factor"))?;

        // Last layer widens to the reconstruction
        let y_factor = factor_projection(
            config.factor_type,
            config.gated_width(),
            latent,
            config.reconstruction_width(),
            vb.pp("y_factor"),
        )?;

        tracing::debug!(
            layout = config.layout().name(),
            factor_type = %config.factor_type,
            latent_dim = latent,
            reconstruction_width = y_factor.output_dim(),
            "built gated field decoder"
        );

        Ok(Self {
            x_factor,
            h_factor,
            y_factor,
            config,
        })
    }

    /// Split an encoder latent [batch, 1, 2 * latent_dim] into its X and H halves.
    pub fn split_latent(&self, latent: &Tensor) -> Result<(Tensor, Tensor)> {
        let expected = self.config.latent_width();
        let (_, rows, width) = latent.dims3()?;

        if rows != 1 || width != expected {
            bail!(
                "gated field decoder expects latent [batch, 1, {}], got {:?}",
                expected,
                latent.dims()
            );
        }

        let split = self.config.latent_dim;
        let x_half = latent.narrow(2, 0, split)?;
        let h_half = latent.narrow(2, split, width - split)?;
        Ok((x_half, h_half))
    }

    /// Forward pass through the decoder
    ///
    /// # Arguments
    /// * `latent` - Encoder output of shape [batch, 1, 2 * latent_dim]
    ///
    /// # Returns
    /// Reconstruction of shape [batch, 1, reconstruction_width]
    pub fn forward(&self, latent: &Tensor) -> Result<Tensor> {
        let (x_half, h_half) = self.split_latent(latent)?;

        let batch = latent.dim(0)?;
        let size = self.config.latent_dim;

        let fx = self.x_factor.forward(&x_half.flatten_from(1)?)?;
        let fx = fx.reshape((batch, size, 1))?;

        let fh = self.h_factor.forward(&h_half.flatten_from(1)?)?;
        let fh = fh.reshape((batch, 1, size))?;

        let gated = gated_interaction(&fx, &fh)?;

        let fy = self.y_factor.forward(&gated.flatten_from(1)?)?;
        fy.reshape((batch, 1, self.config.reconstruction_width()))
    }

    pub fn output_width(&self) -> usize {
        self.config.reconstruction_width()
    }

    pub fn config(&self) -> &GatedFieldConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;
    use gfn_core::{FactorType, InputType};

    fn build(config: GatedFieldConfig) -> Result<(GatedFieldDecoder, Device)> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        Ok((GatedFieldDecoder::new(config, vb)?, device))
    }

    #[test]
    fn test_posture_decoder_shapes() -> Result<()> {
        let config = GatedFieldConfig::new(InputType::posture_posture(), vec![2, 10], 4);
        let (decoder, device) = build(config)?;

        let latent = Tensor::randn(0f32, 1.0, (3, 1, 8), &device)?;
        let out = decoder.forward(&latent)?;

        assert_eq!(out.dims(), &[3, 1, 10]);
        assert_eq!(decoder.output_width(), 10);
        Ok(())
    }

    #[test]
    fn test_image_decoder_shapes() -> Result<()> {
        let config = GatedFieldConfig::new(InputType::image_image(), vec![2, 8, 8], 4);
        let (decoder, device) = build(config)?;

        let latent = Tensor::randn(0f32, 1.0, (2, 1, 8), &device)?;
        assert_eq!(decoder.forward(&latent)?.dims(), &[2, 1, 64]);
        Ok(())
    }

    #[test]
    fn test_mixed_decoder_reconstructs_image_width() -> Result<()> {
        let config = GatedFieldConfig::new(InputType::image_posture(), vec![2, 6, 6], 3);
        let (decoder, device) = build(config)?;

        let latent = Tensor::randn(0f32, 1.0, (1, 1, 6), &device)?;
        assert_eq!(decoder.forward(&latent)?.dims(), &[1, 1, 36]);
        Ok(())
    }

    #[test]
    fn test_split_latent_halves() -> Result<()> {
        let config = GatedFieldConfig::new(InputType::posture_posture(), vec![2, 10], 2);
        let (decoder, device) = build(config)?;

        let latent = Tensor::new(&[[[1f32, 2.0, 3.0, 4.0]]], &device)?;
        let (x_half, h_half) = decoder.split_latent(&latent)?;

        assert_eq!(x_half.flatten_all()?.to_vec1::<f32>()?, vec![1.0, 2.0]);
        assert_eq!(h_half.flatten_all()?.to_vec1::<f32>()?, vec![3.0, 4.0]);
        Ok(())
    }

    #[test]
    fn test_rejects_mismatched_latent_width() -> Result<()> {
        let config = GatedFieldConfig::new(InputType::posture_posture(), vec![2, 10], 4);
        let (decoder, device) = build(config)?;

        let latent = Tensor::zeros((2, 1, 6), DType::F32, &device)?;
        assert!(decoder.forward(&latent).is_err());
        Ok(())
    }

    #[test]
    fn test_factor_type_does_not_change_shape() -> Result<()> {
        let config = GatedFieldConfig::new(InputType::posture_posture(), vec![2, 10], 4);
        let (dense, device) = build(config.clone())?;
        let (fallback, _) = build(config.with_factor_type(FactorType::Fallback))?;

        let latent = Tensor::randn(0f32, 1.0, (2, 1, 8), &device)?;
        assert_eq!(dense.forward(&latent)?.dims(), fallback.forward(&latent)?.dims());
        Ok(())
    }
}
