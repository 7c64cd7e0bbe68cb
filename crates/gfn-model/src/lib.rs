//! # GFN-Model
//!
//! Gated Field Network autoencoder on candle.
//!
//! The network learns a joint latent representation of two paired streams
//! (image/image, image/posture or posture/posture) through a factored
//! bilinear gating: each stream is projected into a latent factor and the
//! factors interact multiplicatively.
//!
//! ## Architecture Overview
//!
//! 1. **Encoder**: splits the stacked pair, projects X and Y, gates them into
//!    an H factor and emits `[X-latent | H-latent]`
//! 2. **Decoder**: splits the latent, re-projects both halves, gates them and
//!    projects the result to the reconstruction of stream Y
//! 3. **Autoencoder**: decoder applied to the encoder output
//!
//! Every projection is a three-layer dense stack with ReLU activations.

pub mod decoder;
pub mod encoder;
pub mod factor;
pub mod inference;
pub mod model;

pub use decoder::*;
pub use encoder::*;
pub use factor::*;
pub use inference::*;
pub use model::*;

/// Surface an invalid configuration through candle's error type.
pub(crate) fn config_error(e: gfn_core::Error) -> candle_core::Error {
    candle_core::Error::Msg(format!("invalid gated field configuration: {e}"))
}
