//! Color-correction algorithms (C10).
//!
//! The diffusion upscaler tends to drift the overall color tone away
//! from the original decoded video. Each algorithm here re-applies the
//! tone of a "source" (pre-diffusion, resized-only) clip onto the
//! "target" (post-diffusion) clip of the same shape `[T, C, H, W]`.
//! Grounded on `examples/original_source/src/utils/color_fix.py`.

mod adain;
mod hsv;
mod lab;
mod wavelet;
mod wavelet_adaptive;

pub use adain::adain_color_fix;
pub use hsv::hue_conditional_saturation_match;
pub use lab::lab_color_fix;
pub use wavelet::wavelet_reconstruction;
pub use wavelet_adaptive::wavelet_adaptive_color_fix;

use burn::tensor::{backend::Backend, Tensor};

use crate::config::ColorCorrection;

/// Dispatches to the configured algorithm. `target` is the decoded,
/// upscaled video; `source` is the pre-diffusion reference, both
/// `[T, C, H, W]` in `[0, 1]`.
pub fn apply<B: Backend>(
    mode: ColorCorrection,
    target: Tensor<B, 4>,
    source: Tensor<B, 4>,
) -> Tensor<B, 4> {
    match mode {
        ColorCorrection::None => target,
        ColorCorrection::Adain => adain_color_fix(target, source),
        ColorCorrection::Wavelet => wavelet_reconstruction(target, source),
        ColorCorrection::WaveletAdaptive => wavelet_adaptive_color_fix(target, source),
        ColorCorrection::Lab => lab_color_fix(target, source),
        ColorCorrection::Hsv => hue_conditional_saturation_match(target, source),
    }
}
