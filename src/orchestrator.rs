use burn::tensor::{backend::Backend, Tensor};

use crate::config::PipelineConfig;
use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{AlphaUpscaler, DitModel, MemoryManager, NoiseSchedule, TextEmbeddingSource, VaeCodec};
use crate::phases::{batch_ranges, decode, encode, postprocess, upscale};
use crate::planner::plan_batches;
use crate::precision::detect_precision;
use crate::stager::Stager;
use crate::timing::PhaseTimer;
use crate::transform::VideoTransform;

/// Runs the full four-phase pipeline over `video` (`[T, C, H, W]` in
/// `[0, 1]`, `C` is 3 or 4) and returns the final assembled video
/// (grounded on the top-level orchestration loop in
/// `examples/original_source/src/core/generation.py`, which stages each
/// model in turn and drives all four phases over the same batch plan).
///
/// `host_device` is where models rest when `preserve_vram` is set;
/// `compute_device` is where each model runs while staged. Real
/// deployments usually pass the same accelerator device for both VAE and
/// DiT, but the stager is generic over any single device type per model.
pub struct PipelineModels<'a, B: Backend> {
    pub vae: &'a mut dyn VaeCodec<B>,
    pub dit: &'a mut dyn DitModel<B>,
    pub noise_schedule: &'a dyn NoiseSchedule<B>,
    pub text_embeddings: &'a dyn TextEmbeddingSource<B>,
    pub alpha_upscaler: Option<&'a dyn AlphaUpscaler<B>>,
    pub memory: Option<&'a mut dyn MemoryManager<B>>,
}

pub fn run_pipeline<B: Backend>(
    config: &PipelineConfig,
    video: Tensor<B, 4>,
    is_rgba: bool,
    compute_device: B::Device,
    host_device: B::Device,
    models: PipelineModels<'_, B>,
    interrupt: &dyn Fn() -> bool,
) -> PipelineResult<Tensor<B, 4>> {
    let total_frames = video.dims()[0];
    if total_frames == 0 {
        return Err(PipelineError::NoFrames);
    }

    if let Some(ordinal) = config.dit_device_ordinal {
        std::env::set_var("LOCAL_RANK", ordinal.to_string());
    } else {
        std::env::set_var("LOCAL_RANK", "0");
    }

    let plan = plan_batches(total_frames, config.batch_size, config.temporal_overlap);
    if !plan.is_optimal {
        log::info!(
            "batch plan pads {} frame(s) to satisfy the 4n+1 constraint (step={}, overlap={})",
            plan.padding_waste,
            plan.step,
            plan.temporal_overlap
        );
    }
    let ranges = batch_ranges(total_frames, config.batch_size, plan.step);

    let precision = detect_precision(
        models.vae.weight_dtype_hint(),
        models.dit.weight_dtype_hint(),
    );

    let PipelineModels {
        vae,
        dit,
        noise_schedule,
        text_embeddings,
        alpha_upscaler,
        mut memory,
    } = models;
    let mut vae = vae;
    let mut dit = dit;

    let mut ctx = PipelineContext::<B>::new(total_frames, is_rgba, precision);
    let transform = VideoTransform::new(config.res_w);
    let stager = Stager::<B>::new(host_device, config.preserve_vram);
    let mut timer = PhaseTimer::default();

    timer.start("encode");
    let mem = memory.as_mut().map(|m| &mut **m as &mut dyn MemoryManager<B>);
    stager.with_staged(&mut OwnedVae(&mut *vae), &compute_device, mem, |v| {
        encode::run(
            &mut ctx,
            video,
            &ranges,
            &transform,
            v.0,
            config.color_correction,
            config.input_noise_scale,
            interrupt,
        )
    })?;
    timer.end("encode", "phase 1 (encode) complete");

    let text_pos = text_embeddings.embedding_positive(&compute_device)?;
    let text_neg = text_embeddings.embedding_negative(&compute_device)?;

    timer.start("upscale");
    let mem = memory.as_mut().map(|m| &mut **m as &mut dyn MemoryManager<B>);
    stager.with_staged(&mut OwnedDit(&mut *dit), &compute_device, mem, |d| {
        upscale::run(
            &mut ctx,
            d.0,
            noise_schedule,
            text_pos,
            text_neg,
            config.cfg_scale,
            config.seed,
            config.latent_noise_scale,
            interrupt,
        )
    })?;
    timer.end("upscale", "phase 2 (upscale) complete");

    timer.start("decode");
    let mem = memory.as_mut().map(|m| &mut **m as &mut dyn MemoryManager<B>);
    stager.with_staged(&mut OwnedVae(&mut *vae), &compute_device, mem, |v| {
        decode::run(&mut ctx, v.0, interrupt)
    })?;
    timer.end("decode", "phase 3 (decode) complete");

    timer.start("postprocess");
    postprocess::run(&mut ctx, config.color_correction, alpha_upscaler, interrupt)?;
    timer.end("postprocess", "phase 4 (postprocess) complete");

    ctx.final_video
        .ok_or(PipelineError::MissingContext("final_video was never assembled"))
}

/// Wraps a `&mut dyn VaeCodec` so it can implement [`crate::models::Stageable`]
/// for [`Stager::with_staged`] without requiring `VaeCodec` itself to be
/// `Sized`.
struct OwnedVae<'a, B: Backend>(&'a mut dyn VaeCodec<B>);

impl<'a, B: Backend> crate::models::Stageable<B> for OwnedVae<'a, B> {
    fn device(&self) -> B::Device {
        self.0.device()
    }
    fn to_device(&mut self, device: &B::Device) -> PipelineResult<()> {
        self.0.to_device(device)
    }
    fn weight_dtype_hint(&self) -> Option<crate::precision::DetectedDtype> {
        self.0.weight_dtype_hint()
    }
}

/// Same wrapper as [`OwnedVae`], for the DiT. The DiT was previously
/// called straight from `upscale::run` without ever passing through the
/// stager, so it never actually moved to the accelerator (or back to
/// host under `preserve_vram`) at phase boundaries; this wrapper lets it
/// go through `Stager::with_staged` the same way the VAE does.
struct OwnedDit<'a, B: Backend>(&'a mut dyn DitModel<B>);

impl<'a, B: Backend> crate::models::Stageable<B> for OwnedDit<'a, B> {
    fn device(&self) -> B::Device {
        self.0.device()
    }
    fn to_device(&mut self, device: &B::Device) -> PipelineResult<()> {
        self.0.to_device(device)
    }
    fn weight_dtype_hint(&self) -> Option<crate::precision::DetectedDtype> {
        self.0.weight_dtype_hint()
    }
}
