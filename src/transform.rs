use burn::tensor::{backend::Backend, module, ops::InterpolateOptions, ops::InterpolateMode, Tensor};

/// Deterministic resize/crop/normalize/reorder pipeline producing both the
/// style tensor used by color correction and the DiT-domain input
/// (spec.md §4.3, grounded on `prepare_video_transforms` in
/// `examples/original_source/src/core/generation.py`, which composes
/// `NaResize` + clamp + `DivisibleCrop` + `Normalize` + a final permute).
///
/// `res_w` is the target shortest spatial edge; the transform never skips
/// resizing even if the input is already larger (matches `NaResize`'s
/// `downsample_only=False`).
pub struct VideoTransform {
    res_w: usize,
}

impl VideoTransform {
    pub fn new(res_w: usize) -> Self {
        Self { res_w }
    }

    /// `rgb` is `[T, C, H, W]` in `[0, 1]`. Returns `[C, T, H, W]` in
    /// `[-1, 1]`, cropped to dimensions divisible by 16.
    pub fn apply<B: Backend>(&self, rgb: Tensor<B, 4>) -> Tensor<B, 4> {
        let resized = self.resize_shortest_edge(rgb);
        let clamped = resized.clamp(0.0, 1.0);
        let cropped = divisible_crop(clamped, 16);
        let normalized = (cropped - 0.5) / 0.5;
        normalized.permute([1, 0, 2, 3])
    }

    fn resize_shortest_edge<B: Backend>(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let dims = x.dims();
        let (h, w) = (dims[2], dims[3]);
        let shortest = h.min(w);
        if shortest == 0 {
            return x;
        }
        let scale = self.res_w as f64 / shortest as f64;
        let new_h = (h as f64 * scale).round().max(1.0) as usize;
        let new_w = (w as f64 * scale).round().max(1.0) as usize;
        if new_h == h && new_w == w {
            return x;
        }
        module::interpolate(
            x,
            [new_h, new_w],
            InterpolateOptions::new(InterpolateMode::Bilinear),
        )
    }
}

/// Center-crops the trailing two (spatial) dimensions down to the nearest
/// multiple of `divisor`.
fn divisible_crop<B: Backend>(x: Tensor<B, 4>, divisor: usize) -> Tensor<B, 4> {
    let dims = x.dims();
    let (h, w) = (dims[2], dims[3]);
    let new_h = (h / divisor) * divisor;
    let new_w = (w / divisor) * divisor;
    if new_h == h && new_w == w {
        return x;
    }
    let top = (h - new_h) / 2;
    let left = (w - new_w) / 2;
    x.slice([0..dims[0], 0..dims[1], top..top + new_h, left..left + new_w])
}
