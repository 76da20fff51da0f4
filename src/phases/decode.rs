use crate::context::{PipelineContext, Slot};
use crate::error::{Phase, PipelineError, PipelineResult};
use crate::models::VaeCodec;
use burn::tensor::backend::Backend;

/// Phase 3 (C8): decodes every upscaled latent back to pixel space,
/// consuming `ctx.upscaled_latents` and filling `ctx.samples`. Alpha
/// upscaling for RGBA input happens in Phase 4 (spec.md §4.9), not here,
/// since it needs the decoded RGB sample as an edge guide.
pub fn run<B: Backend>(
    ctx: &mut PipelineContext<B>,
    vae: &dyn VaeCodec<B>,
    interrupt: &dyn Fn() -> bool,
) -> PipelineResult<()> {
    let n_batches = ctx.upscaled_latents.len();
    ctx.samples = Vec::with_capacity(n_batches);

    for batch_idx in 0..n_batches {
        if interrupt() {
            return Err(PipelineError::Interrupted {
                phase: Phase::Decode,
                batch: batch_idx,
            });
        }

        let latent = ctx.upscaled_latents[batch_idx]
            .take()
            .ok_or(PipelineError::MissingContext("upscaled latent already consumed"))?;

        let sample = vae
            .decode(latent)
            .map_err(|source| PipelineError::BatchOperator {
                phase: Phase::Decode,
                batch: batch_idx,
                source: Box::new(source),
            })?;

        ctx.samples.push(Slot::Filled(sample));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Stageable;
    use crate::precision::PrecisionInfo;
    use burn::backend::NdArray;
    use burn::tensor::{Distribution, Tensor};

    type TB = NdArray<f32>;

    struct IdentityVae;
    impl Stageable<TB> for IdentityVae {
        fn device(&self) -> <TB as Backend>::Device {
            Default::default()
        }
        fn to_device(&mut self, _device: &<TB as Backend>::Device) -> PipelineResult<()> {
            Ok(())
        }
    }
    impl VaeCodec<TB> for IdentityVae {
        fn encode(&self, video: Tensor<TB, 4>) -> PipelineResult<Tensor<TB, 4>> {
            Ok(video)
        }
        fn decode(&self, latent: Tensor<TB, 4>) -> PipelineResult<Tensor<TB, 4>> {
            Ok(latent)
        }
    }

    #[test]
    fn consumes_upscaled_latents_and_fills_samples() {
        let device = Default::default();
        let mut ctx = PipelineContext::<TB>::new(5, false, PrecisionInfo::default());
        ctx.upscaled_latents.push(Slot::Filled(Tensor::<TB, 4>::random(
            [4, 4, 4, 4],
            Distribution::Uniform(0.0, 1.0),
            &device,
        )));
        let vae = IdentityVae;

        run(&mut ctx, &vae, &|| false).unwrap();

        assert!(!ctx.upscaled_latents[0].is_filled());
        assert_eq!(ctx.samples.len(), 1);
    }

    #[test]
    fn missing_latent_surfaces_as_missing_context_error() {
        let mut ctx = PipelineContext::<TB>::new(5, false, PrecisionInfo::default());
        ctx.upscaled_latents.push(Slot::Consumed);
        let vae = IdentityVae;

        let result = run(&mut ctx, &vae, &|| false);
        assert!(matches!(result, Err(PipelineError::MissingContext(_))));
    }

    #[test]
    fn interrupt_before_any_batch_returns_early() {
        let device = Default::default();
        let mut ctx = PipelineContext::<TB>::new(5, false, PrecisionInfo::default());
        ctx.upscaled_latents.push(Slot::Filled(Tensor::<TB, 4>::random(
            [4, 4, 4, 4],
            Distribution::Uniform(0.0, 1.0),
            &device,
        )));
        let vae = IdentityVae;

        let result = run(&mut ctx, &vae, &|| true);
        assert!(matches!(result, Err(PipelineError::Interrupted { batch: 0, .. })));
        assert!(ctx.samples.is_empty());
    }
}
