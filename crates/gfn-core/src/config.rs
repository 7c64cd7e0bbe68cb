//! Model configuration shared by the encoder, decoder and autoencoder.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{
    FactorType, InputShape, InputType, StreamLayout, StreamSlice, PAIRED_STREAMS,
    POSTURE_COMPONENTS,
};

/// Prefix of environment variables read by [`GatedFieldConfig::from_env`].
pub const ENV_PREFIX: &str = "GFN";

/// Complete Gated Field Network configuration.
///
/// The encoder and decoder of one autoencoder must be built from the same
/// configuration: the decoder splits its input at `latent_dim`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatedFieldConfig {
    /// Modality of stream X and stream Y
    pub input_type: InputType,

    /// Per-sample input shape, pairing axis first
    pub input_shape: InputShape,

    /// Width of each factor's latent space
    pub latent_dim: usize,

    /// Projection style of the factor branches
    #[serde(default)]
    pub factor_type: FactorType,
}

impl Default for GatedFieldConfig {
    fn default() -> Self {
        Self {
            input_type: InputType::image_image(),
            input_shape: InputShape::new(vec![2, 28, 28]),
            latent_dim: 64,
            factor_type: FactorType::Dense,
        }
    }
}

impl GatedFieldConfig {
    pub fn new(
        input_type: InputType,
        input_shape: impl Into<InputShape>,
        latent_dim: usize,
    ) -> Self {
        Self {
            input_type,
            input_shape: input_shape.into(),
            latent_dim,
            factor_type: FactorType::default(),
        }
    }

    pub fn with_factor_type(mut self, factor_type: FactorType) -> Self {
        self.factor_type = factor_type;
        self
    }

    /// Load configuration from file, with `GFN_*` environment overrides
    pub fn from_file(path: &str) -> Result<Self> {
        Self::load(Some(path), ENV_PREFIX)
    }

    /// Load from `GFN_*` environment variables; lists are comma separated
    pub fn from_env() -> Result<Self> {
        Self::load(None, ENV_PREFIX)
    }

    fn load(path: Option<&str>, env_prefix: &str) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(env_prefix)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("input_type")
                    .with_list_parse_key("input_shape")
                    .with_list_parse_key("factor_type"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that the shape is usable with the configured pairing.
    pub fn validate(&self) -> Result<()> {
        if self.latent_dim == 0 {
            return Err(Error::Config("latent_dim must be positive".to_string()));
        }

        let layout = self.layout();
        let dims = self.input_shape.dims();

        if dims.len() != layout.expected_rank() {
            return Err(Error::RankMismatch {
                layout: layout.name(),
                expected: layout.expected_rank(),
                actual: dims.len(),
            });
        }

        if dims[0] != PAIRED_STREAMS {
            return Err(Error::Config(format!(
                "pairing axis must hold {} streams, input shape is {}",
                PAIRED_STREAMS, self.input_shape
            )));
        }

        if dims.contains(&0) {
            return Err(Error::Config(format!(
                "input shape {} has an empty axis",
                self.input_shape
            )));
        }

        if !layout.is_posture_only() && dims[1] != dims[2] {
            // Image reconstructions are side * side wide
            return Err(Error::ShapeMismatch {
                expected: vec![PAIRED_STREAMS, dims[1], dims[1]],
                actual: dims.to_vec(),
            });
        }

        if matches!(layout, StreamLayout::ImagePosture { .. }) && dims[1] < POSTURE_COMPONENTS {
            return Err(Error::Config(format!(
                "posture stream needs at least {} rows, input shape is {}",
                POSTURE_COMPONENTS, self.input_shape
            )));
        }

        Ok(())
    }

    pub fn layout(&self) -> StreamLayout {
        self.input_type.layout()
    }

    /// Flattened width of stream `index` (0 = X, 1 = Y) after slicing.
    pub fn stream_width(&self, index: usize) -> usize {
        match self.layout().slice(index) {
            StreamSlice::Full => self.input_shape.stream_dims().iter().product(),
            StreamSlice::Reduced => POSTURE_COMPONENTS,
        }
    }

    /// Width of the flattened outer-product interaction.
    pub fn gated_width(&self) -> usize {
        self.latent_dim * self.latent_dim
    }

    /// Width of the encoder output (X-latent then H-latent).
    pub fn latent_width(&self) -> usize {
        2 * self.latent_dim
    }

    pub fn reconstruction_width(&self) -> usize {
        let side = self.input_shape.dim(1).unwrap_or(0);
        if self.layout().is_posture_only() {
            side
        } else {
            side * side
        }
    }

    pub fn sample_len(&self) -> usize {
        self.input_shape.sample_len()
    }
}
