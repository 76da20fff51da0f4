use burn::tensor::backend::Backend;

use crate::error::PipelineResult;
use crate::models::{MemoryManager, Stageable};

/// Moves a model to `target_device`, optionally evicting it back to a
/// host device once `release` runs, per the `preserve_vram` policy
/// (spec.md §4.5, grounded on the stage/unstage calls bracketing each
/// phase in `examples/original_source/src/core/generation.py`, e.g.
/// `vae.to(device)` / `vae.to("cpu")` around `vae.encode`).
pub struct Stager<B: Backend> {
    host_device: B::Device,
    preserve_vram: bool,
}

impl<B: Backend> Stager<B> {
    pub fn new(host_device: B::Device, preserve_vram: bool) -> Self {
        Self {
            host_device,
            preserve_vram,
        }
    }

    /// Stages `model` onto `target_device` for the duration of `f`, then
    /// (if `preserve_vram`) moves it back to the host device and asks any
    /// attached memory manager to free cached accelerator state.
    pub fn with_staged<M, R>(
        &self,
        model: &mut M,
        target_device: &B::Device,
        memory: Option<&mut dyn MemoryManager<B>>,
        f: impl FnOnce(&mut M) -> PipelineResult<R>,
    ) -> PipelineResult<R>
    where
        M: Stageable<B>,
    {
        model.to_device(target_device)?;
        let result = f(model);

        if self.preserve_vram {
            model.to_device(&self.host_device)?;
            if let Some(mem) = memory {
                mem.clear_memory(true);
            }
        }

        result
    }
}
