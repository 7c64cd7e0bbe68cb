//! Gated field encoder.
//!
//! The encoder splits a stacked pair into stream X and stream Y, projects
//! each stream into the latent space, gates the two projections against
//! each other and projects the gated field once more:
//!
//! ```text
//! X ─ flatten ─ x_factor ─ fx [1, L] ──────────────┬─ concat ─ [1, 2L]
//!                                   └─┐            │
//!                                     ⊙ ─ h_factor ─ fh [1, L]
//!                                   ┌─┘
//! Y ─ flatten ─ y_factor ─ fy [L, 1]
//! ```

use candle_core::{bail, IndexOp, Module, Result, Tensor};
use candle_nn::VarBuilder;
use gfn_core::{GatedFieldConfig, StreamLayout, StreamSlice, POSTURE_COMPONENTS};

use crate::factor::{factor_projection, gated_interaction, DenseStack};

/// Encoder half of the gated field autoencoder
pub struct GatedFieldEncoder {
    x_factor: DenseStack,
    y_factor: DenseStack,
    h_factor: DenseStack,
    layout: StreamLayout,
    config: GatedFieldConfig,
}

impl GatedFieldEncoder {
    pub fn new(config: GatedFieldConfig, vb: VarBuilder) -> Result<Self> {
        config.validate().map_err(crate::config_error)?;

        let latent = config.latent_dim;
        let layout = config.layout();

        let x_factor = factor_projection(
            config.factor_type,
            config.stream_width(0),
            latent,
            latent,
            vb.pp("x_factor"),
        )?;
        let y_factor = factor_projection(
            config.factor_type,
            config.stream_width(1),
            latent,
            latent,
            vb.pp("y_factor"),
        )?;
        let h_factor = DenseStack::uniform(config.gated_width(), latent, vb.pp("h_factor"))?;

        tracing::debug!(
            layout = layout.name(),
            factor_type = %config.factor_type,
            x_width = x_factor.input_dim(),
            y_width = y_factor.input_dim(),
            gated_width = h_factor.input_dim(),
            latent_dim = latent,
            "built gated field encoder"
        );

        Ok(Self {
            x_factor,
            y_factor,
            h_factor,
            layout,
            config,
        })
    }

    /// Encode a stacked pair into its two latent pieces.
    ///
    /// # Arguments
    /// * `inputs` - Tensor of shape [batch, 2, ...stream shape]
    ///
    /// # Returns
    /// `(fx, fh)`, the X-latent and the gated H-latent, each [batch, 1, latent_dim]
    pub fn encode_parts(&self, inputs: &Tensor) -> Result<(Tensor, Tensor)> {
        self.check_input(inputs)?;

        let batch = inputs.dim(0)?;
        let latent = self.config.latent_dim;

        let x = self.slice_stream(inputs, 0)?;
        let y = self.slice_stream(inputs, 1)?;

        // Row and column orientation so the product broadcasts to [latent, latent]
        let fx = self.x_factor.forward(&x)?.reshape((batch, 1, latent))?;
        let fy = self.y_factor.forward(&y)?.reshape((batch, latent, 1))?;

        let gated = gated_interaction(&fy, &fx)?;

        let fh = self.h_factor.forward(&gated.flatten_from(1)?)?;
        let fh = fh.reshape((batch, 1, latent))?;

        Ok((fx, fh))
    }

    /// Forward pass through the encoder
    ///
    /// # Arguments
    /// * `inputs` - Tensor of shape [batch, 2, ...stream shape]
    ///
    /// # Returns
    /// Latent representation of shape [batch, 1, 2 * latent_dim]
    pub fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        let (fx, fh) = self.encode_parts(inputs)?;
        Tensor::cat(&[&fx, &fh], 2)
    }

    /// Cut stream `index` out of the stacked input and flatten it to [batch, width].
    fn slice_stream(&self, inputs: &Tensor, index: usize) -> Result<Tensor> {
        let stream = match self.layout.slice(index) {
            StreamSlice::Full => inputs.i((.., index))?,
            StreamSlice::Reduced => inputs.i((.., index, ..POSTURE_COMPONENTS, 0))?,
        };
        stream.contiguous()?.flatten_from(1)
    }

    fn check_input(&self, inputs: &Tensor) -> Result<()> {
        let expected = self.config.input_shape.dims();
        let dims = inputs.dims();

        if dims.len() != expected.len() + 1 || &dims[1..] != expected {
            bail!(
                "gated field encoder expects input [batch, {}], got {:?}",
                expected
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                dims
            );
        }
        Ok(())
    }

    pub fn output_width(&self) -> usize {
        self.config.latent_width()
    }

    pub fn config(&self) -> &GatedFieldConfig {
        &self.config
    }
}
