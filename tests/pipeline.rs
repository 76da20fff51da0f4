//! End-to-end exercises of `run_pipeline` against fake VAE/DiT/text
//! embedding collaborators, covering the scenarios spec.md §8 calls out:
//! non-4n+1 input, RGBA compositing, disabled color correction, and
//! interruption mid-phase.

use burn::backend::NdArray;
use burn::tensor::{backend::Backend, Distribution, Tensor};

use upscale_pipeline::config::PipelineConfig;
use upscale_pipeline::error::PipelineError;
use upscale_pipeline::models::{
    AlphaUpscaler, DitModel, MemoryManager, NoiseSchedule, Stageable, TextEmbeddingSource, VaeCodec,
};
use upscale_pipeline::orchestrator::{run_pipeline, PipelineModels};
use upscale_pipeline::{ColorCorrection, PipelineResult};

type TB = NdArray<f32>;

struct PassthroughVae {
    device: <TB as Backend>::Device,
}

impl Stageable<TB> for PassthroughVae {
    fn device(&self) -> <TB as Backend>::Device {
        self.device.clone()
    }
    fn to_device(&mut self, device: &<TB as Backend>::Device) -> PipelineResult<()> {
        self.device = device.clone();
        Ok(())
    }
}

impl VaeCodec<TB> for PassthroughVae {
    fn encode(&self, video: Tensor<TB, 4>) -> PipelineResult<Tensor<TB, 4>> {
        Ok(video)
    }
    fn decode(&self, latent: Tensor<TB, 4>) -> PipelineResult<Tensor<TB, 4>> {
        Ok(latent)
    }
}

struct PassthroughDit {
    device: <TB as Backend>::Device,
}

impl Stageable<TB> for PassthroughDit {
    fn device(&self) -> <TB as Backend>::Device {
        self.device.clone()
    }
    fn to_device(&mut self, device: &<TB as Backend>::Device) -> PipelineResult<()> {
        self.device = device.clone();
        Ok(())
    }
}

impl DitModel<TB> for PassthroughDit {
    fn get_condition(
        &self,
        _noise: Tensor<TB, 4>,
        _task: &str,
        latent_blur: Tensor<TB, 4>,
    ) -> PipelineResult<Tensor<TB, 4>> {
        Ok(latent_blur)
    }
    fn inference(
        &self,
        _noise: Tensor<TB, 4>,
        condition: Tensor<TB, 4>,
        _text_pos: Tensor<TB, 3>,
        _text_neg: Tensor<TB, 3>,
        _cfg_scale: f32,
    ) -> PipelineResult<Tensor<TB, 4>> {
        Ok(condition)
    }
}

struct PassthroughSchedule;
impl NoiseSchedule<TB> for PassthroughSchedule {
    fn forward(&self, x: Tensor<TB, 4>, _noise: Tensor<TB, 4>, _t: Tensor<TB, 1>) -> Tensor<TB, 4> {
        x
    }
    fn timestep_transform(&self, t: Tensor<TB, 1>, _shape: &[usize]) -> Tensor<TB, 1> {
        t
    }
}

struct FakeTextEmbeddings;
impl TextEmbeddingSource<TB> for FakeTextEmbeddings {
    fn embedding_positive(&self, device: &<TB as Backend>::Device) -> PipelineResult<Tensor<TB, 3>> {
        Ok(Tensor::random([1, 4, 8], Distribution::Uniform(0.0, 1.0), device))
    }
    fn embedding_negative(&self, device: &<TB as Backend>::Device) -> PipelineResult<Tensor<TB, 3>> {
        Ok(Tensor::random([1, 4, 8], Distribution::Uniform(0.0, 1.0), device))
    }
}

struct PassthroughAlpha;
impl AlphaUpscaler<TB> for PassthroughAlpha {
    fn process_alpha_for_batch(
        &self,
        _rgb_sample: Tensor<TB, 4>,
        alpha: Tensor<TB, 4>,
        _input_rgb: Tensor<TB, 4>,
    ) -> PipelineResult<Tensor<TB, 4>> {
        Ok(alpha)
    }
}

struct NoopMemory;
impl MemoryManager<TB> for NoopMemory {
    fn clear_memory(&mut self, _deep: bool) {}
}

fn base_config(batch_size: usize, res_w: usize) -> PipelineConfig {
    PipelineConfig {
        batch_size,
        temporal_overlap: 0,
        preserve_vram: true,
        res_w,
        input_noise_scale: 0.0,
        cfg_scale: 1.0,
        seed: 7,
        latent_noise_scale: 0.0,
        color_correction: ColorCorrection::None,
        dit_cache: false,
        vae_cache: false,
        encode_tiled: false,
        encode_tile_size: None,
        decode_tiled: false,
        decode_tile_size: None,
        dit_device_ordinal: None,
    }
}

#[test]
fn non_4n_plus_1_input_pads_and_truncates_back_to_original_length() {
    let device = Default::default();
    let video = Tensor::<TB, 4>::random([7, 3, 32, 32], Distribution::Uniform(0.0, 1.0), &device);
    let config = base_config(7, 32);

    let mut vae = PassthroughVae { device: device.clone() };
    let mut dit = PassthroughDit { device: device.clone() };
    let schedule = PassthroughSchedule;
    let text = FakeTextEmbeddings;
    let mut memory = NoopMemory;

    let out = run_pipeline(
        &config,
        video,
        false,
        device.clone(),
        device,
        PipelineModels {
            vae: &mut vae,
            dit: &mut dit,
            noise_schedule: &schedule,
            text_embeddings: &text,
            alpha_upscaler: None,
            memory: Some(&mut memory),
        },
        &|| false,
    )
    .expect("pipeline should succeed");

    assert_eq!(out.dims()[0], 7);
    assert_eq!(out.dims()[1], 3);
}

#[test]
fn rgba_input_recombines_alpha_in_output() {
    let device = Default::default();
    let video = Tensor::<TB, 4>::random([5, 4, 32, 32], Distribution::Uniform(0.0, 1.0), &device);
    let config = base_config(5, 32);

    let mut vae = PassthroughVae { device: device.clone() };
    let mut dit = PassthroughDit { device: device.clone() };
    let schedule = PassthroughSchedule;
    let text = FakeTextEmbeddings;
    let alpha = PassthroughAlpha;

    let out = run_pipeline(
        &config,
        video,
        true,
        device.clone(),
        device,
        PipelineModels {
            vae: &mut vae,
            dit: &mut dit,
            noise_schedule: &schedule,
            text_embeddings: &text,
            alpha_upscaler: Some(&alpha),
            memory: None,
        },
        &|| false,
    )
    .expect("pipeline should succeed");

    assert_eq!(out.dims()[0], 5);
    assert_eq!(out.dims()[1], 4);
}

#[test]
fn color_correction_runs_end_to_end_without_panicking() {
    let device = Default::default();
    let video = Tensor::<TB, 4>::random([5, 3, 32, 32], Distribution::Uniform(0.0, 1.0), &device);
    let mut config = base_config(5, 32);
    config.color_correction = ColorCorrection::Adain;

    let mut vae = PassthroughVae { device: device.clone() };
    let mut dit = PassthroughDit { device: device.clone() };
    let schedule = PassthroughSchedule;
    let text = FakeTextEmbeddings;

    let out = run_pipeline(
        &config,
        video,
        false,
        device.clone(),
        device,
        PipelineModels {
            vae: &mut vae,
            dit: &mut dit,
            noise_schedule: &schedule,
            text_embeddings: &text,
            alpha_upscaler: None,
            memory: None,
        },
        &|| false,
    )
    .expect("pipeline should succeed");

    assert_eq!(out.dims()[0], 5);
}

#[test]
fn latent_noise_scale_runs_end_to_end_without_panicking() {
    let device = Default::default();
    let video = Tensor::<TB, 4>::random([5, 3, 32, 32], Distribution::Uniform(0.0, 1.0), &device);
    let mut config = base_config(5, 32);
    config.latent_noise_scale = 0.3;
    config.input_noise_scale = 0.2;

    let mut vae = PassthroughVae { device: device.clone() };
    let mut dit = PassthroughDit { device: device.clone() };
    let schedule = PassthroughSchedule;
    let text = FakeTextEmbeddings;

    let out = run_pipeline(
        &config,
        video,
        false,
        device.clone(),
        device,
        PipelineModels {
            vae: &mut vae,
            dit: &mut dit,
            noise_schedule: &schedule,
            text_embeddings: &text,
            alpha_upscaler: None,
            memory: None,
        },
        &|| false,
    )
    .expect("pipeline should succeed");

    assert_eq!(out.dims()[0], 5);
}

#[test]
fn empty_input_is_rejected_before_any_model_call() {
    let device = Default::default();
    let video = Tensor::<TB, 4>::zeros([0, 3, 32, 32], &device);
    let config = base_config(5, 32);

    let mut vae = PassthroughVae { device: device.clone() };
    let mut dit = PassthroughDit { device: device.clone() };
    let schedule = PassthroughSchedule;
    let text = FakeTextEmbeddings;

    let result = run_pipeline(
        &config,
        video,
        false,
        device.clone(),
        device,
        PipelineModels {
            vae: &mut vae,
            dit: &mut dit,
            noise_schedule: &schedule,
            text_embeddings: &text,
            alpha_upscaler: None,
            memory: None,
        },
        &|| false,
    );

    assert!(matches!(result, Err(PipelineError::NoFrames)));
}

#[test]
fn interrupt_flag_aborts_the_running_phase() {
    let device = Default::default();
    let video = Tensor::<TB, 4>::random([9, 3, 32, 32], Distribution::Uniform(0.0, 1.0), &device);
    let config = base_config(3, 32);

    let mut vae = PassthroughVae { device: device.clone() };
    let mut dit = PassthroughDit { device: device.clone() };
    let schedule = PassthroughSchedule;
    let text = FakeTextEmbeddings;

    let result = run_pipeline(
        &config,
        video,
        false,
        device.clone(),
        device,
        PipelineModels {
            vae: &mut vae,
            dit: &mut dit,
            noise_schedule: &schedule,
            text_embeddings: &text,
            alpha_upscaler: None,
            memory: None,
        },
        &|| true,
    );

    assert!(matches!(result, Err(PipelineError::Interrupted { .. })));
}
