//! Factor branches and the multiplicative gating between them.
//!
//! Every projection in the network is a [`DenseStack`]: three linear layers,
//! each followed by ReLU. Two latent factors are combined by broadcasting a
//! column `[batch, latent, 1]` against a row `[batch, 1, latent]`, which
//! yields the outer product of the two factors for every sample.

use candle_core::{Module, Result, Tensor};
use candle_nn::{linear, Linear, VarBuilder};
use gfn_core::FactorType;

/// Number of linear layers in a [`DenseStack`].
pub const STACK_DEPTH: usize = 3;

/// Linear + ReLU, three times.
///
/// The first two layers map to `hidden_dim`, the last to `output_dim`.
/// Weights live under `layer_1`, `layer_2` and `layer_3` of the given
/// [`VarBuilder`] prefix.
pub struct DenseStack {
    layers: [Linear; STACK_DEPTH],
    input_dim: usize,
    output_dim: usize,
}

impl DenseStack {
    pub fn new(
        input_dim: usize,
        hidden_dim: usize,
        output_dim: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let layers = [
            linear(input_dim, hidden_dim, vb.pp("layer_1"))?,
            linear(hidden_dim, hidden_dim, vb.pp("layer_2"))?,
            linear(hidden_dim, output_dim, vb.pp("layer_3"))?,
        ];

        Ok(Self {
            layers,
            input_dim,
            output_dim,
        })
    }

    /// Stack whose every layer is `width` wide.
    pub fn uniform(input_dim: usize, width: usize, vb: VarBuilder) -> Result<Self> {
        Self::new(input_dim, width, width, vb)
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Trainable scalars held by a stack of the given widths.
    pub fn parameter_count(input_dim: usize, hidden_dim: usize, output_dim: usize) -> usize {
        (input_dim + 1) * hidden_dim + (hidden_dim + 1) * hidden_dim + (hidden_dim + 1) * output_dim
    }
}

impl Module for DenseStack {
    /// Input shape `[batch, input_dim]`, output shape `[batch, output_dim]`.
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mut x = x.clone();
        for layer in &self.layers {
            x = layer.forward(&x)?.relu()?;
        }
        Ok(x)
    }
}

/// Build the projection of a factor branch for the configured factor type.
pub fn factor_projection(
    factor_type: FactorType,
    input_dim: usize,
    hidden_dim: usize,
    output_dim: usize,
    vb: VarBuilder,
) -> Result<DenseStack> {
    match factor_type {
        // The fallback branch has no projection of its own yet.
        FactorType::Dense | FactorType::Fallback => {
            DenseStack::new(input_dim, hidden_dim, output_dim, vb)
        }
    }
}

/// Element-wise product of a column factor and a row factor.
///
/// `column` is `[batch, n, 1]`, `row` is `[batch, 1, m]`; the result is
/// `[batch, n, m]` with `out[b, i, j] = column[b, i] * row[b, j]`.
pub fn gated_interaction(column: &Tensor, row: &Tensor) -> Result<Tensor> {
    column.broadcast_mul(row)
}
