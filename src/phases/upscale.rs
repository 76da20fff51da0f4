use burn::tensor::{backend::Backend, Distribution, Tensor};

use crate::context::{PipelineContext, Slot};
use crate::error::{Phase, PipelineError, PipelineResult};
use crate::models::{DitModel, NoiseSchedule};

/// Phase 2 (C7): runs the diffusion transformer over every latent batch,
/// consuming `ctx.latents` and filling `ctx.upscaled_latents` in the same
/// order (I3: once a latent is consumed its slot becomes `Consumed` and
/// cannot be read again).
///
/// Per batch (spec.md §4.7 steps 2-5): sample `base_noise` and
/// `aug_noise = base_noise*0.1 + randn*0.05`; when `latent_noise_scale >
/// 0`, blur the latent through `schedule.forward` at `timestep_transform
/// (1000 * latent_noise_scale)` to build the condition input, otherwise
/// the raw latent is the condition input; call `dit.get_condition` then
/// `dit.inference` with both positive and negative text embeddings for
/// classifier-free guidance.
#[allow(clippy::too_many_arguments)]
pub fn run<B: Backend>(
    ctx: &mut PipelineContext<B>,
    dit: &mut dyn DitModel<B>,
    schedule: &dyn NoiseSchedule<B>,
    text_pos: Tensor<B, 3>,
    text_neg: Tensor<B, 3>,
    cfg_scale: f32,
    seed: u64,
    latent_noise_scale: f32,
    interrupt: &dyn Fn() -> bool,
) -> PipelineResult<()> {
    B::seed(seed);

    let n_batches = ctx.latents.len();
    ctx.upscaled_latents = Vec::with_capacity(n_batches);

    for batch_idx in 0..n_batches {
        if interrupt() {
            return Err(PipelineError::Interrupted {
                phase: Phase::Upscale,
                batch: batch_idx,
            });
        }

        let latent = ctx.latents[batch_idx]
            .take()
            .ok_or(PipelineError::MissingContext("latent already consumed"))?;

        let device = latent.device();
        let dims = latent.dims();
        let base_noise = Tensor::<B, 4>::random(dims, Distribution::Normal(0.0, 1.0), &device);

        let latent_blur = if latent_noise_scale > 0.0 {
            let aug_noise = base_noise.clone() * 0.1
                + Tensor::<B, 4>::random(dims, Distribution::Normal(0.0, 1.0), &device) * 0.05;
            let t = Tensor::<B, 1>::from_floats([1000.0 * latent_noise_scale], &device);
            let t = schedule.timestep_transform(t, &dims);
            schedule.forward(latent.clone(), aug_noise, t)
        } else {
            latent.clone()
        };

        let condition = dit
            .get_condition(base_noise.clone(), "sr", latent_blur)
            .map_err(|source| PipelineError::BatchOperator {
                phase: Phase::Upscale,
                batch: batch_idx,
                source: Box::new(source),
            })?;

        let upscaled = dit
            .inference(base_noise, condition, text_pos.clone(), text_neg.clone(), cfg_scale)
            .map_err(|source| PipelineError::BatchOperator {
                phase: Phase::Upscale,
                batch: batch_idx,
                source: Box::new(source),
            })?;

        ctx.upscaled_latents.push(Slot::Filled(upscaled));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineResult;
    use crate::models::Stageable;
    use crate::precision::PrecisionInfo;
    use burn::backend::NdArray;

    type TB = NdArray<f32>;

    struct IdentityDit;
    impl Stageable<TB> for IdentityDit {
        fn device(&self) -> <TB as Backend>::Device {
            Default::default()
        }
        fn to_device(&mut self, _device: &<TB as Backend>::Device) -> PipelineResult<()> {
            Ok(())
        }
    }
    impl DitModel<TB> for IdentityDit {
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

    struct IdentitySchedule;
    impl NoiseSchedule<TB> for IdentitySchedule {
        fn forward(&self, x: Tensor<TB, 4>, _noise: Tensor<TB, 4>, _t: Tensor<TB, 1>) -> Tensor<TB, 4> {
            x
        }
        fn timestep_transform(&self, t: Tensor<TB, 1>, _shape: &[usize]) -> Tensor<TB, 1> {
            t
        }
    }

    fn make_ctx(n_batches: usize) -> PipelineContext<TB> {
        let device = Default::default();
        let mut ctx = PipelineContext::<TB>::new(n_batches * 5, false, PrecisionInfo::default());
        for _ in 0..n_batches {
            let latent = Tensor::<TB, 4>::random([4, 4, 4, 4], Distribution::Uniform(0.0, 1.0), &device);
            ctx.latents.push(Slot::Filled(latent));
        }
        ctx
    }

    #[test]
    fn consumes_latents_and_fills_upscaled() {
        let device = Default::default();
        let mut ctx = make_ctx(3);
        let mut dit = IdentityDit;
        let schedule = IdentitySchedule;
        let text_pos = Tensor::<TB, 3>::random([1, 4, 8], Distribution::Uniform(0.0, 1.0), &device);
        let text_neg = Tensor::<TB, 3>::random([1, 4, 8], Distribution::Uniform(0.0, 1.0), &device);

        run(&mut ctx, &mut dit, &schedule, text_pos, text_neg, 1.0, 42, 0.0, &|| false).unwrap();

        assert!(ctx.latents.iter().all(|s| !s.is_filled()));
        assert_eq!(ctx.upscaled_latents.len(), 3);
        assert!(ctx.upscaled_latents.iter().all(Slot::is_filled));
    }

    #[test]
    fn latent_noise_scale_runs_the_blur_branch() {
        let device = Default::default();
        let mut ctx = make_ctx(1);
        let mut dit = IdentityDit;
        let schedule = IdentitySchedule;
        let text_pos = Tensor::<TB, 3>::random([1, 4, 8], Distribution::Uniform(0.0, 1.0), &device);
        let text_neg = Tensor::<TB, 3>::random([1, 4, 8], Distribution::Uniform(0.0, 1.0), &device);

        run(&mut ctx, &mut dit, &schedule, text_pos, text_neg, 1.0, 42, 0.3, &|| false).unwrap();

        assert_eq!(ctx.upscaled_latents.len(), 1);
    }

    #[test]
    fn missing_latent_surfaces_as_missing_context_error() {
        let device = Default::default();
        let mut ctx = make_ctx(1);
        ctx.latents[0].take();
        let mut dit = IdentityDit;
        let schedule = IdentitySchedule;
        let text_pos = Tensor::<TB, 3>::random([1, 4, 8], Distribution::Uniform(0.0, 1.0), &device);
        let text_neg = Tensor::<TB, 3>::random([1, 4, 8], Distribution::Uniform(0.0, 1.0), &device);

        let result = run(&mut ctx, &mut dit, &schedule, text_pos, text_neg, 1.0, 42, 0.0, &|| false);
        assert!(matches!(result, Err(PipelineError::MissingContext(_))));
    }
}
