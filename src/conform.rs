use burn::tensor::{backend::Backend, Tensor};

/// Result of conforming a batch to the 4n+1 temporal constraint (C2).
pub struct Conformed<B: Backend> {
    /// The (possibly padded) batch, `[T, C, H, W]`, with `T % 4 == 1`.
    pub frames: Tensor<B, 4>,
    /// The true pre-padding frame count (I2: `ori_length <= conformed_len`).
    pub ori_length: usize,
}

/// Enforces the 4n+1 temporal constraint by replicating the last frame
/// (spec.md §4.2, grounded on `cut_videos` in
/// `examples/original_source/src/core/generation.py`).
///
/// `frames` is `[T, C, H, W]`. If `T % 4 == 1` already, it is returned
/// unchanged and `ori_length == T`.
pub fn conform<B: Backend>(frames: Tensor<B, 4>) -> Conformed<B> {
    let t = frames.dims()[0];
    if t % 4 == 1 {
        return Conformed {
            frames,
            ori_length: t,
        };
    }

    let target = ((t - 1) / 4 + 1) * 4 + 1;
    let padding_needed = target - t;

    let last_frame = frames.clone().slice([t - 1..t]).repeat(&[padding_needed, 1, 1, 1]);
    let conformed = Tensor::cat(vec![frames, last_frame], 0);

    Conformed {
        frames: conformed,
        ori_length: t,
    }
}
