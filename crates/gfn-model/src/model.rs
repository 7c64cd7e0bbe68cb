//! Complete gated field autoencoder.

use candle_core::{Result, Tensor};
use candle_nn::VarBuilder;
use gfn_core::GatedFieldConfig;

use crate::decoder::GatedFieldDecoder;
use crate::encoder::GatedFieldEncoder;
use crate::factor::DenseStack;

/// Encoder and decoder built from one configuration, applied back to back
pub struct GatedFieldAutoencoder {
    encoder: GatedFieldEncoder,
    decoder: GatedFieldDecoder,
    config: GatedFieldConfig,
}

impl GatedFieldAutoencoder {
    pub fn new(config: GatedFieldConfig, vb: VarBuilder) -> Result<Self> {
        let encoder = GatedFieldEncoder::new(config.clone(), vb.pp("encoder"))?;
        let decoder = GatedFieldDecoder::new(config.clone(), vb.pp("decoder"))?;

        tracing::debug!(
            input_type = %config.input_type,
            input_shape = %config.input_shape,
            parameters = parameter_count(&config),
            "built gated field autoencoder"
        );

        Ok(Self {
            encoder,
            decoder,
            config,
        })
    }

    /// Forward pass through the complete model
    ///
    /// # Arguments
    /// * `inputs` - Stacked pair [batch, 2, ...stream shape]
    ///
    /// # Returns
    /// Reconstruction of shape [batch, 1, reconstruction_width]
    pub fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        let latent = self.encoder.forward(inputs)?;
        self.decoder.forward(&latent)
    }

    pub fn encode(&self, inputs: &Tensor) -> Result<Tensor> {
        self.encoder.forward(inputs)
    }

    pub fn decode(&self, latent: &Tensor) -> Result<Tensor> {
        self.decoder.forward(latent)
    }

    pub fn encoder(&self) -> &GatedFieldEncoder {
        &self.encoder
    }

    pub fn decoder(&self) -> &GatedFieldDecoder {
        &self.decoder
    }

    pub fn config(&self) -> &GatedFieldConfig {
        &self.config
    }
}

/// Trainable scalars of an autoencoder built from `config`.
pub fn parameter_count(config: &GatedFieldConfig) -> usize {
    let latent = config.latent_dim;

    let encoder = DenseStack::parameter_count(config.stream_width(0), latent, latent)
        + DenseStack::parameter_count(config.stream_width(1), latent, latent)
        + DenseStack::parameter_count(config.gated_width(), latent, latent);

    let decoder = DenseStack::parameter_count(latent, latent, latent)
        + DenseStack::parameter_count(config.latent_width() - latent, latent, latent)
        + DenseStack::parameter_count(
            config.gated_width(),
            latent,
            config.reconstruction_width(),
        );

    encoder + decoder
}
