use burn::tensor::{backend::Backend, Tensor};

use crate::color;
use crate::config::ColorCorrection;
use crate::context::{PipelineContext, Slot};
use crate::error::{Phase, PipelineError, PipelineResult};
use crate::models::AlphaUpscaler;

/// Phase 4 (C9): converts each decoded sample back to `[0, 1]` pixel
/// space, truncates padding frames back to `ori_length` (I2), applies
/// color correction against the matching pre-diffusion reference, and
/// recombines the alpha channel for RGBA input. Batches are appended to
/// `ctx.final_video` in order (P4: the write cursor only ever advances).
///
/// For RGBA input, before the main loop, every batch is first run
/// through `alpha_upscaler` with its decoded RGB sample, its original
/// alpha plane, and its original input RGB as edge guides (spec.md
/// §4.9), consuming `ctx.alpha_channels` and `ctx.input_rgb`.
pub fn run<B: Backend>(
    ctx: &mut PipelineContext<B>,
    color_correction: ColorCorrection,
    alpha_upscaler: Option<&dyn AlphaUpscaler<B>>,
    interrupt: &dyn Fn() -> bool,
) -> PipelineResult<()> {
    if ctx.is_rgba {
        merge_alpha(ctx, alpha_upscaler, interrupt)?;
    }

    let n_batches = ctx.samples.len();
    let mut assembled = Vec::with_capacity(n_batches);

    for batch_idx in 0..n_batches {
        if interrupt() {
            return Err(PipelineError::Interrupted {
                phase: Phase::Postprocess,
                batch: batch_idx,
            });
        }

        let sample = ctx.samples[batch_idx]
            .take()
            .ok_or(PipelineError::MissingContext("sample already consumed"))?;
        let ori_length = *ctx
            .ori_lengths
            .get(batch_idx)
            .ok_or(PipelineError::MissingContext("ori_lengths"))?;

        // [C, T, H, W] in [-1, 1] -> [T, C, H, W] in [0, 1], truncated.
        let sample_thw = to_unit_range(sample.permute([1, 0, 2, 3]));
        let dims = sample_thw.dims();
        let truncated = sample_thw.slice([0..ori_length.min(dims[0]), 0..dims[1], 0..dims[2], 0..dims[3]]);

        let corrected = if color_correction.is_enabled() {
            let source = ctx
                .transformed_videos
                .as_mut()
                .ok_or(PipelineError::MissingContext("transformed_videos"))?[batch_idx]
                .take()
                .ok_or(PipelineError::MissingContext("transformed_video already consumed"))?;
            let source_thw = to_unit_range(source.permute([1, 0, 2, 3]));
            let source_dims = source_thw.dims();
            let source_truncated = source_thw.slice([
                0..ori_length.min(source_dims[0]),
                0..source_dims[1],
                0..source_dims[2],
                0..source_dims[3],
            ]);
            color::apply(color_correction, truncated, source_truncated)
        } else {
            truncated
        };

        let final_batch = if ctx.is_rgba {
            let alpha = ctx
                .alpha_channels
                .as_mut()
                .ok_or(PipelineError::MissingContext("alpha_channels"))?[batch_idx]
                .take()
                .ok_or(PipelineError::MissingContext("alpha already consumed"))?;
            let alpha_dims = alpha.dims();
            let alpha_truncated = alpha.slice([
                0..ori_length.min(alpha_dims[0]),
                0..alpha_dims[1],
                0..alpha_dims[2],
                0..alpha_dims[3],
            ]);
            Tensor::cat(vec![corrected, alpha_truncated], 1)
        } else {
            corrected
        };

        ctx.write_cursor += ori_length;
        assembled.push(final_batch);
    }

    if !assembled.is_empty() {
        ctx.final_video = Some(Tensor::cat(assembled, 0));
    }

    Ok(())
}

fn to_unit_range<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    (x.clamp(-1.0, 1.0) + 1.0) / 2.0
}

/// Runs every batch's alpha plane through the external alpha-processing
/// operator before the main truncate/color-correct loop (spec.md §4.9:
/// "before the main loop"), consuming `alpha_channels[i]` and
/// `input_rgb[i]` and replacing `alpha_channels[i]` with the upscaled
/// result the main loop below reads and recombines.
fn merge_alpha<B: Backend>(
    ctx: &mut PipelineContext<B>,
    alpha_upscaler: Option<&dyn AlphaUpscaler<B>>,
    interrupt: &dyn Fn() -> bool,
) -> PipelineResult<()> {
    let upscaler = alpha_upscaler
        .ok_or(PipelineError::MissingContext("alpha_upscaler required for RGBA input"))?;
    let n_batches = ctx.samples.len();

    for batch_idx in 0..n_batches {
        if interrupt() {
            return Err(PipelineError::Interrupted {
                phase: Phase::Postprocess,
                batch: batch_idx,
            });
        }

        let rgb_sample = ctx.samples[batch_idx]
            .as_ref()
            .ok_or(PipelineError::MissingContext("sample already consumed"))?
            .clone();
        let alpha = ctx
            .alpha_channels
            .as_mut()
            .ok_or(PipelineError::MissingContext("alpha_channels"))?[batch_idx]
            .take()
            .ok_or(PipelineError::MissingContext("alpha already consumed"))?;
        let input_rgb = ctx
            .input_rgb
            .as_mut()
            .ok_or(PipelineError::MissingContext("input_rgb"))?[batch_idx]
            .take()
            .ok_or(PipelineError::MissingContext("input_rgb already consumed"))?;

        let upscaled_alpha = upscaler
            .process_alpha_for_batch(rgb_sample, alpha, input_rgb)
            .map_err(|source| PipelineError::BatchOperator {
                phase: Phase::Postprocess,
                batch: batch_idx,
                source: Box::new(source),
            })?;

        ctx.alpha_channels.as_mut().unwrap()[batch_idx] = Slot::Filled(upscaled_alpha);
    }

    Ok(())
}
