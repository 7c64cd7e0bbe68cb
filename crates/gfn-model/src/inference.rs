//! Batched inference over flat paired samples.

use std::path::Path;
use std::time::Instant;

use candle_core::{bail, DType, Device, Result, Tensor};
use candle_nn::{VarBuilder, VarMap};
use gfn_core::GatedFieldConfig;

use crate::model::{parameter_count, GatedFieldAutoencoder};

/// Backend an [`InferenceEngine`] places its weights and activations on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComputeDevice {
    #[default]
    Cpu,
    /// CUDA device ordinal
    Cuda(usize),
    /// Metal device ordinal
    Metal(usize),
}

impl ComputeDevice {
    /// Open the candle device. Fails when the backend is not compiled in.
    pub fn open(self) -> Result<Device> {
        match self {
            ComputeDevice::Cpu => Ok(Device::Cpu),
            ComputeDevice::Cuda(ordinal) => Device::new_cuda(ordinal),
            ComputeDevice::Metal(ordinal) => Device::new_metal(ordinal),
        }
    }
}

/// Model shape plus how samples are scheduled onto the device
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model: GatedFieldConfig,
    pub device: ComputeDevice,
    /// Samples per forward pass; longer inputs are split into chunks
    pub max_batch: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(GatedFieldConfig::default())
    }
}

impl EngineConfig {
    pub fn new(model: GatedFieldConfig) -> Self {
        Self {
            model,
            device: ComputeDevice::Cpu,
            max_batch: 32,
        }
    }

    pub fn with_device(mut self, device: ComputeDevice) -> Self {
        self.device = device;
        self
    }

    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }
}

/// Owns a device and an autoencoder, and turns flat samples into tensors.
///
/// A sample is one stacked pair laid out row-major with the configured
/// `input_shape`, i.e. `input_shape.iter().product()` scalars.
pub struct InferenceEngine {
    model: GatedFieldAutoencoder,
    varmap: Option<VarMap>,
    device: Device,
    config: EngineConfig,
}

impl InferenceEngine {
    /// Untrained engine; its variables stay reachable through [`Self::varmap`]
    /// so a training driver can optimize and save them.
    pub fn with_random_weights(config: EngineConfig) -> Result<Self> {
        let device = config.device.open()?;
        let varmap = VarMap::new();
        let model = GatedFieldAutoencoder::new(
            config.model.clone(),
            VarBuilder::from_varmap(&varmap, DType::F32, &device),
        )?;

        tracing::info!(
            device = ?config.device,
            parameters = parameter_count(&config.model),
            "initialized gated field autoencoder with random weights"
        );

        Ok(Self {
            model,
            varmap: Some(varmap),
            device,
            config,
        })
    }

    /// Engine over frozen weights from a safetensors file.
    ///
    /// Tensor names follow the variable layout of the autoencoder
    /// (`encoder.x_factor.layer_1.weight`, ...), which is what saving the
    /// [`VarMap`] of a randomly initialized engine produces.
    pub fn from_safetensors<P: AsRef<Path>>(path: P, config: EngineConfig) -> Result<Self> {
        let device = config.device.open()?;

        // SAFETY: the file must not be modified while the engine maps it
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[path.as_ref()], DType::F32, &device)?
        };
        let model = GatedFieldAutoencoder::new(config.model.clone(), vb)?;

        tracing::info!(
            path = %path.as_ref().display(),
            device = ?config.device,
            "loaded gated field autoencoder weights"
        );

        Ok(Self {
            model,
            varmap: None,
            device,
            config,
        })
    }

    /// Reconstruct stream Y for every sample
    pub fn reconstruct(&self, samples: &[Vec<f32>]) -> Result<InferenceResult> {
        self.run(samples, |input| self.model.forward(input))
    }

    /// Latent representation (X-latent then H-latent) for every sample
    pub fn encode(&self, samples: &[Vec<f32>]) -> Result<InferenceResult> {
        self.run(samples, |input| self.model.encode(input))
    }

    fn run<F>(&self, samples: &[Vec<f32>], forward: F) -> Result<InferenceResult>
    where
        F: Fn(&Tensor) -> Result<Tensor>,
    {
        if samples.is_empty() {
            return Ok(InferenceResult::empty());
        }

        let start = Instant::now();
        let mut outputs = Vec::with_capacity(samples.len());

        for chunk in samples.chunks(self.config.max_batch.max(1)) {
            let input = self.prepare_input(chunk)?;
            let output = forward(&input)?;
            outputs.extend(output.flatten_from(1)?.to_vec2::<f32>()?);
        }

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(samples = samples.len(), latency_ms, "gated field inference");

        Ok(InferenceResult {
            outputs,
            latency_ms,
        })
    }

    /// Stack flat samples into [batch, ...input_shape]
    fn prepare_input(&self, samples: &[Vec<f32>]) -> Result<Tensor> {
        let sample_len = self.config.model.sample_len();

        let mut data = Vec::with_capacity(samples.len() * sample_len);
        for (i, sample) in samples.iter().enumerate() {
            if sample.len() != sample_len {
                bail!(
                    "sample {} has {} values, input shape {} needs {}",
                    i,
                    sample.len(),
                    self.config.model.input_shape,
                    sample_len
                );
            }
            data.extend_from_slice(sample);
        }

        let mut dims = Vec::with_capacity(self.config.model.input_shape.rank() + 1);
        dims.push(samples.len());
        dims.extend_from_slice(self.config.model.input_shape.dims());

        Tensor::from_vec(data, dims, &self.device)
    }

    pub fn model(&self) -> &GatedFieldAutoencoder {
        &self.model
    }

    /// Trainable variables, when the engine was created with random weights
    pub fn varmap(&self) -> Option<&VarMap> {
        self.varmap.as_ref()
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn num_parameters(&self) -> usize {
        parameter_count(&self.config.model)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Result from inference
#[derive(Debug, Clone)]
pub struct InferenceResult {
    /// One flat output row per input sample, in input order
    pub outputs: Vec<Vec<f32>>,
    pub latency_ms: f64,
}

impl InferenceResult {
    pub fn empty() -> Self {
        Self {
            outputs: Vec::new(),
            latency_ms: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}
