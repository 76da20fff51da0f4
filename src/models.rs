use burn::tensor::{backend::Backend, Tensor};

use crate::error::PipelineResult;
use crate::precision::DetectedDtype;

/// Anything that can be moved between host and accelerator memory under
/// the stager's `preserve_vram` policy (C5). Implemented by VAE/DiT model
/// wrappers, never by tensors directly, since a real model wrapper also
/// owns non-tensor state (tokenizers, KV caches) that must travel with it.
pub trait Stageable<B: Backend> {
    fn device(&self) -> B::Device;
    fn to_device(&mut self, device: &B::Device) -> PipelineResult<()>;
    /// Best-effort hint of the model's weight dtype, used only for the
    /// informational precision-detection log line (spec.md §4.4).
    fn weight_dtype_hint(&self) -> Option<DetectedDtype> {
        None
    }
}

/// RoPE / attention cache cleanup hook (spec.md §2, grounded on
/// `memory_manager.py`'s `cleanup_rope_cache`). Out of scope functionally
/// (spec.md §1/§6 treat model internals as opaque), but the pipeline must
/// still call it at phase boundaries so a real implementation can free
/// accelerator memory between phases.
pub trait MemoryManager<B: Backend> {
    fn clear_memory(&mut self, deep: bool);
    fn stats(&self) -> MemoryStats {
        MemoryStats::default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStats {
    pub allocated_bytes: u64,
    pub reserved_bytes: u64,
}

/// The VAE encoder/decoder (C6/C8). Spec.md §1/§6 scope the VAE's
/// internal architecture out; only the encode/decode contract matters
/// here.
pub trait VaeCodec<B: Backend>: Stageable<B> {
    /// `[C, T, H, W]` pixel-space video in `[-1, 1]` -> latent space.
    fn encode(&self, video: Tensor<B, 4>) -> PipelineResult<Tensor<B, 4>>;
    /// Latent space -> `[C, T, H, W]` pixel-space video in `[-1, 1]`.
    fn decode(&self, latent: Tensor<B, 4>) -> PipelineResult<Tensor<B, 4>>;
}

/// The scheduler's noising primitives (spec.md §6: `schedule.forward`,
/// `timestep_transform`), used by Phase 2 to build the blurred latent
/// condition from `latent_noise_scale` (spec.md §4.7 step 3).
pub trait NoiseSchedule<B: Backend> {
    /// `schedule.forward(x, noise, t) -> noisy_x`.
    fn forward(&self, x: Tensor<B, 4>, noise: Tensor<B, 4>, t: Tensor<B, 1>) -> Tensor<B, 4>;
    /// `timestep_transform(t, shape) -> t'`.
    fn timestep_transform(&self, t: Tensor<B, 1>, shape: &[usize]) -> Tensor<B, 1>;
}

/// The diffusion transformer doing the actual super-resolution denoising
/// (C7). Spec.md §1/§6 scope the DiT's internal architecture out, but
/// expose its condition-building and inference entry points directly
/// (`dit.get_condition`, `dit.inference`) since Phase 2's noise
/// augmentation (spec.md §4.7) sits between them and is this crate's
/// responsibility, not the model's.
pub trait DitModel<B: Backend>: Stageable<B> {
    /// `dit.get_condition(noise, task, latent_blur) -> condition`.
    fn get_condition(
        &self,
        noise: Tensor<B, 4>,
        task: &str,
        latent_blur: Tensor<B, 4>,
    ) -> PipelineResult<Tensor<B, 4>>;

    /// `dit.inference(noises, conditions, texts_pos, texts_neg) -> [upscaled]`,
    /// single-step (spec.md §4.7: `sampling.steps = 1`), so this pipeline
    /// always calls it with exactly one noise/condition pair and reads
    /// back exactly one result.
    fn inference(
        &self,
        noise: Tensor<B, 4>,
        condition: Tensor<B, 4>,
        text_pos: Tensor<B, 3>,
        text_neg: Tensor<B, 3>,
        cfg_scale: f32,
    ) -> PipelineResult<Tensor<B, 4>>;
}

/// Loads the two well-known text-embedding assets (spec.md §6:
/// `pos_emb.pt`, `neg_emb.pt`), reused across every batch in Phase 2.
pub trait TextEmbeddingSource<B: Backend> {
    fn embedding_positive(&self, device: &B::Device) -> PipelineResult<Tensor<B, 3>>;
    fn embedding_negative(&self, device: &B::Device) -> PipelineResult<Tensor<B, 3>>;
}

/// Edge-guided alpha upscaler for RGBA input (spec.md §4.9: "dispatch
/// each batch through the external alpha-processing operator with
/// `(rgb_samples[i], alpha_channels[i], input_rgb[i])` to produce
/// sharpened-edge alpha"). Scoped out as a black box; the pipeline only
/// needs the three-tensor contract and the upscaled alpha it returns.
pub trait AlphaUpscaler<B: Backend> {
    fn process_alpha_for_batch(
        &self,
        rgb_sample: Tensor<B, 4>,
        alpha: Tensor<B, 4>,
        input_rgb: Tensor<B, 4>,
    ) -> PipelineResult<Tensor<B, 4>>;
}
