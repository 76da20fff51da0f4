use burn::tensor::{backend::Backend, Distribution, Tensor};

use crate::conform::conform;
use crate::config::ColorCorrection;
use crate::context::{PipelineContext, Slot};
use crate::error::{Phase, PipelineError, PipelineResult};
use crate::models::VaeCodec;
use crate::transform::VideoTransform;

/// Phase 1 (C6): conforms each batch to the 4n+1 temporal constraint,
/// applies the resize/crop/normalize transform, optionally blends in
/// pre-encode gaussian noise (spec.md §4.6 step 5), and encodes it to
/// latent space, filling `ctx.latents` (and, for RGBA input or when
/// color correction is enabled, `ctx.input_rgb` / `ctx.alpha_channels` /
/// `ctx.transformed_videos`) one batch at a time.
///
/// `video` is the full un-batched input, `[T, C, H, W]` in `[0, 1]`,
/// with `C == 4` iff `ctx.is_rgba`.
pub fn run<B: Backend>(
    ctx: &mut PipelineContext<B>,
    video: Tensor<B, 4>,
    ranges: &[(usize, usize)],
    transform: &VideoTransform,
    vae: &mut dyn VaeCodec<B>,
    color_correction: ColorCorrection,
    input_noise_scale: f32,
    interrupt: &dyn Fn() -> bool,
) -> PipelineResult<()> {
    if color_correction.is_enabled() {
        ctx.transformed_videos = Some(Vec::with_capacity(ranges.len()));
    }
    if ctx.is_rgba {
        ctx.input_rgb = Some(Vec::with_capacity(ranges.len()));
        ctx.alpha_channels = Some(Vec::with_capacity(ranges.len()));
    }

    for (batch_idx, &(start, end)) in ranges.iter().enumerate() {
        if interrupt() {
            return Err(PipelineError::Interrupted {
                phase: Phase::Encode,
                batch: batch_idx,
            });
        }

        let dims = video.dims();
        let raw = video.clone().slice([start..end, 0..dims[1], 0..dims[2], 0..dims[3]]);

        let (rgb, alpha) = if ctx.is_rgba {
            let rgb = raw.clone().slice([0..raw.dims()[0], 0..3]);
            let alpha = raw.clone().slice([0..raw.dims()[0], 3..4]);
            (rgb, Some(alpha))
        } else {
            (raw, None)
        };

        let conformed_rgb = conform(rgb);
        ctx.ori_lengths.push(conformed_rgb.ori_length);

        if let Some(alpha) = alpha {
            let conformed_alpha = conform_to_length(alpha, conformed_rgb.frames.dims()[0]);
            ctx.input_rgb
                .as_mut()
                .expect("allocated above for rgba input")
                .push(Slot::Filled(conformed_rgb.frames.clone()));
            ctx.alpha_channels
                .as_mut()
                .expect("allocated above for rgba input")
                .push(Slot::Filled(conformed_alpha));
        }

        let transformed = transform.apply(conformed_rgb.frames);
        let transformed = blend_input_noise(transformed, input_noise_scale);

        if let Some(store) = ctx.transformed_videos.as_mut() {
            store.push(Slot::Filled(transformed.clone()));
        }

        let latent = vae
            .encode(transformed)
            .map_err(|source| PipelineError::BatchOperator {
                phase: Phase::Encode,
                batch: batch_idx,
                source: Box::new(source),
            })?;

        ctx.latents.push(Slot::Filled(latent));
    }

    Ok(())
}

/// Blends gaussian noise into `x` before encoding (spec.md §4.6 step 5):
/// `scaled_noise = randn_like(x) * 0.05`, `blend = input_noise_scale *
/// 0.5`, `result = (1-blend)*x + blend*(x + scaled_noise)`. A no-op when
/// `input_noise_scale <= 0`.
fn blend_input_noise<B: Backend>(x: Tensor<B, 4>, input_noise_scale: f32) -> Tensor<B, 4> {
    if input_noise_scale <= 0.0 {
        return x;
    }
    let device = x.device();
    let scaled_noise = Tensor::random(x.dims(), Distribution::Normal(0.0, 1.0), &device) * 0.05;
    let blend = input_noise_scale * 0.5;
    x.clone() * (1.0 - blend) + (x + scaled_noise) * blend
}

/// Pads `x` (`[T, C, H, W]`) up to `target_len` frames by repeating its
/// last frame, mirroring [`conform`]'s padding but for a length already
/// known from the RGB branch rather than re-derived from `T % 4`.
fn conform_to_length<B: Backend>(x: Tensor<B, 4>, target_len: usize) -> Tensor<B, 4> {
    let t = x.dims()[0];
    if t >= target_len {
        return x;
    }
    let padding_needed = target_len - t;
    let last_frame = x.clone().slice([t - 1..t]).repeat(&[padding_needed, 1, 1, 1]);
    Tensor::cat(vec![x, last_frame], 0)
}
