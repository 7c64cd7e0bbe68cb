//! End-to-end shape properties of the gated field autoencoder.

use candle_core::{DType, Device, Result, Tensor};
use candle_nn::{VarBuilder, VarMap};
use gfn_core::{FactorType, GatedFieldConfig, InputType};
use gfn_model::{GatedFieldAutoencoder, GatedFieldDecoder, GatedFieldEncoder};

fn configs() -> Vec<GatedFieldConfig> {
    let mut configs = Vec::new();
    for latent_dim in [1, 4, 7] {
        for side in [3, 5, 8] {
            configs.push(GatedFieldConfig::new(
                InputType::posture_posture(),
                vec![2, side],
                latent_dim,
            ));
            configs.push(GatedFieldConfig::new(
                InputType::image_image(),
                vec![2, side, side],
                latent_dim,
            ));
            configs.push(GatedFieldConfig::new(
                InputType::image_posture(),
                vec![2, side, side],
                latent_dim,
            ));
            configs.push(GatedFieldConfig::new(
                InputType::parse(&["posture", "image"]).expect("valid tags"),
                vec![2, side, side],
                latent_dim,
            ));
        }
    }
    configs
}

fn input_for(config: &GatedFieldConfig, batch: usize, device: &Device) -> Result<Tensor> {
    let mut dims = vec![batch];
    dims.extend_from_slice(config.input_shape.dims());
    Tensor::randn(0f32, 1.0, dims, device)
}

fn expected_reconstruction_width(config: &GatedFieldConfig) -> usize {
    let side = config.input_shape.dims()[1];
    if config.input_type == InputType::posture_posture() {
        side
    } else {
        side * side
    }
}

#[test]
fn encoder_output_is_twice_latent_dim() -> Result<()> {
    let device = Device::Cpu;

    for config in configs() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let encoder = GatedFieldEncoder::new(config.clone(), vb)?;

        let out = encoder.forward(&input_for(&config, 2, &device)?)?;
        assert_eq!(out.dims(), &[2, 1, 2 * config.latent_dim], "{config:?}");
    }
    Ok(())
}

#[test]
fn decoder_output_matches_reconstruction_width() -> Result<()> {
    let device = Device::Cpu;

    for config in configs() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let decoder = GatedFieldDecoder::new(config.clone(), vb)?;

        let latent = Tensor::randn(0f32, 1.0, (3, 1, 2 * config.latent_dim), &device)?;
        let out = decoder.forward(&latent)?;
        assert_eq!(
            out.dims(),
            &[3, 1, expected_reconstruction_width(&config)],
            "{config:?}"
        );
    }
    Ok(())
}

#[test]
fn autoencoder_composes_encoder_and_decoder() -> Result<()> {
    let device = Device::Cpu;

    for config in configs() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = GatedFieldAutoencoder::new(config.clone(), vb)?;

        let x = input_for(&config, 2, &device)?;
        let direct = model.forward(&x)?;
        let composed = model.decoder().forward(&model.encoder().forward(&x)?)?;

        assert_eq!(direct.dims(), composed.dims());
        let direct: Vec<f32> = direct.flatten_all()?.to_vec1()?;
        let composed: Vec<f32> = composed.flatten_all()?.to_vec1()?;
        assert_eq!(direct, composed, "{config:?}");
    }
    Ok(())
}

#[test]
fn posture_pair_shapes() -> Result<()> {
    let device = Device::Cpu;
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

    let config = GatedFieldConfig::new(InputType::posture_posture(), vec![2, 10], 4);
    let model = GatedFieldAutoencoder::new(config.clone(), vb)?;

    let x = input_for(&config, 5, &device)?;
    let latent = model.encode(&x)?;
    assert_eq!(latent.dims(), &[5, 1, 8]);
    assert_eq!(model.decode(&latent)?.dims(), &[5, 1, 10]);
    Ok(())
}

#[test]
fn image_pair_shapes() -> Result<()> {
    let device = Device::Cpu;
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

    let config = GatedFieldConfig::new(InputType::image_image(), vec![2, 8, 8], 4);
    let model = GatedFieldAutoencoder::new(config.clone(), vb)?;

    let x = input_for(&config, 5, &device)?;
    assert_eq!(model.forward(&x)?.dims(), &[5, 1, 64]);
    Ok(())
}

#[test]
fn factor_type_is_shape_neutral() -> Result<()> {
    let device = Device::Cpu;

    for config in configs() {
        let mut shapes = Vec::new();
        for factor_type in [FactorType::Dense, FactorType::Fallback] {
            let varmap = VarMap::new();
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            let model = GatedFieldAutoencoder::new(config.clone().with_factor_type(factor_type), vb)?;

            let x = input_for(&config, 2, &device)?;
            shapes.push((
                model.encode(&x)?.dims().to_vec(),
                model.forward(&x)?.dims().to_vec(),
            ));
        }
        assert_eq!(shapes[0], shapes[1], "{config:?}");
    }
    Ok(())
}

#[test]
fn mismatched_decoder_latent_fails_fast() -> Result<()> {
    let device = Device::Cpu;
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

    let encoder_config = GatedFieldConfig::new(InputType::posture_posture(), vec![2, 10], 4);
    let decoder_config = GatedFieldConfig::new(InputType::posture_posture(), vec![2, 10], 5);

    let encoder = GatedFieldEncoder::new(encoder_config.clone(), vb.pp("encoder"))?;
    let decoder = GatedFieldDecoder::new(decoder_config, vb.pp("decoder"))?;

    let latent = encoder.forward(&input_for(&encoder_config, 2, &device)?)?;
    assert!(decoder.forward(&latent).is_err());
    Ok(())
}
