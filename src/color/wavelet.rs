use burn::tensor::module::conv2d;
use burn::tensor::ops::ConvOptions;
use burn::tensor::{backend::Backend, Tensor};

/// A fixed 3x3 low-pass kernel applied with increasing dilation, used by
/// [`wavelet_decompose`] to build a Laplacian-style pyramid without
/// needing a real wavelet transform library (grounded on
/// `wavelet_blur` in `examples/original_source/src/utils/color_fix.py`).
fn wavelet_blur<B: Backend>(x: Tensor<B, 4>, radius: usize) -> Tensor<B, 4> {
    let dims = x.dims();
    let channels = dims[1];
    let device = x.device();
    let max_radius = (dims[2].min(dims[3]) / 8).max(1);
    let radius = radius.min(max_radius);

    let weights: [f32; 9] = [
        0.0625, 0.125, 0.0625, 0.125, 0.25, 0.125, 0.0625, 0.125, 0.0625,
    ];
    let kernel = Tensor::<B, 1>::from_floats(weights, &device)
        .reshape([1, 1, 3, 3])
        .repeat(&[channels, 1, 1, 1]);

    conv2d(
        x,
        kernel,
        None,
        ConvOptions::new([1, 1], [radius, radius], [radius, radius], channels),
    )
}

/// Splits `x` into low-frequency and high-frequency components over
/// `levels` dyadic scales (grounded on `wavelet_decomposition`).
fn wavelet_decompose<B: Backend>(x: Tensor<B, 4>, levels: usize) -> (Tensor<B, 4>, Tensor<B, 4>) {
    let mut high_freq = Tensor::zeros_like(&x);
    let mut current = x;

    for i in 0..levels {
        let radius = 1usize << i; // 1, 2, 4, 8, 16
        let blurred = wavelet_blur(current.clone(), radius);
        high_freq = high_freq + (current - blurred.clone());
        current = blurred;
    }

    (current, high_freq)
}

/// Combines `target`'s high-frequency detail with `source`'s
/// low-frequency tone, over `[T, C, H, W]` clips (grounded on
/// `wavelet_reconstruction`).
pub fn wavelet_reconstruction<B: Backend>(target: Tensor<B, 4>, source: Tensor<B, 4>) -> Tensor<B, 4> {
    let (_, target_high) = wavelet_decompose(target, 5);
    let (source_low, _) = wavelet_decompose(source, 5);
    (target_high + source_low).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TB = NdArray<f32>;

    #[test]
    fn reconstruction_preserves_shape() {
        let device = Default::default();
        let target = Tensor::<TB, 4>::random([3, 3, 32, 32], Distribution::Uniform(0.0, 1.0), &device);
        let source = Tensor::<TB, 4>::random([3, 3, 32, 32], Distribution::Uniform(0.0, 1.0), &device);
        let out = wavelet_reconstruction(target, source);
        assert_eq!(out.dims(), [3, 3, 32, 32]);
    }

    #[test]
    fn identical_clips_round_trip_to_themselves() {
        let device = Default::default();
        let clip = Tensor::<TB, 4>::random([2, 3, 32, 32], Distribution::Uniform(0.0, 1.0), &device);
        let out = wavelet_reconstruction(clip.clone(), clip.clone());
        let diff: f32 = (out - clip).abs().into_data().to_vec::<f32>().unwrap().into_iter().sum();
        assert!(diff < 1e-2);
    }
}
