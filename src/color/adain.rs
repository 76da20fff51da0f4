use burn::tensor::{backend::Backend, Tensor};

/// Adaptive Instance Normalization color transfer: rescales `target` so
/// each channel's mean/std over the whole clip matches `source`'s
/// (grounded on `adain_color_fix` in
/// `examples/original_source/src/utils/color_fix.py`).
///
/// Both tensors are `[T, C, H, W]`.
pub fn adain_color_fix<B: Backend>(target: Tensor<B, 4>, source: Tensor<B, 4>) -> Tensor<B, 4> {
    let (t_mean, t_std) = channel_moments(target.clone());
    let (s_mean, s_std) = channel_moments(source);

    let normalized = (target - t_mean) / t_std;
    normalized * s_std + s_mean
}

/// Per-channel mean/std reduced over `T, H, W`, broadcastable back over
/// the original `[T, C, H, W]` shape. Epsilon is added inside the
/// variance, before the square root, matching `color_fix.py:87-88`'s
/// `feat_var = var + eps`.
fn channel_moments<B: Backend>(x: Tensor<B, 4>) -> (Tensor<B, 4>, Tensor<B, 4>) {
    let swapped = x.swap_dims(0, 1); // [C, T, H, W]
    let dims = swapped.dims();
    let flat = swapped.reshape([dims[0], dims[1] * dims[2] * dims[3]]);

    let mean = flat.clone().mean_dim(1); // [C, 1]
    let centered = flat - mean.clone();
    let var = (centered.clone() * centered).mean_dim(1);
    let std = (var + 1e-5).sqrt();

    let mean = mean.reshape([1, dims[0], 1, 1]).swap_dims(0, 1);
    let std = std.reshape([1, dims[0], 1, 1]).swap_dims(0, 1);
    (mean, std)
}
