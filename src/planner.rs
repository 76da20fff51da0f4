/// Advisory batching plan (C1). Actual batching uses `step`/`batch_size`
/// directly (see [`crate::phases::encode`]); this plan is reported to the
/// user and never alters behavior, per spec.md §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    pub step: usize,
    pub temporal_overlap: usize,
    pub best_batch: usize,
    pub padding_waste: usize,
    pub is_optimal: bool,
}

/// Computes step size, the best 4n+1 batch size, and padding waste for a
/// given `total_frames` / `batch_size` / `temporal_overlap` triple
/// (spec.md §4.1, grounded on `calculate_optimal_batch_params` in
/// `examples/original_source/src/core/generation.py`).
pub fn plan_batches(total_frames: usize, batch_size: usize, temporal_overlap: usize) -> BatchPlan {
    let (step, temporal_overlap) = if temporal_overlap >= batch_size {
        (batch_size, 0)
    } else {
        (batch_size - temporal_overlap, temporal_overlap)
    };

    let best_batch = (1..=total_frames).rev().find(|k| k % 4 == 1).unwrap_or(1);

    let mut padding_waste = 0usize;
    let mut current_frame = 0usize;
    while current_frame < total_frames {
        let frames_in_batch = batch_size.min(total_frames - current_frame);
        let target = next_4n_plus_1(frames_in_batch);
        padding_waste += target - frames_in_batch;
        current_frame += step;
    }

    BatchPlan {
        step,
        temporal_overlap,
        best_batch,
        padding_waste,
        is_optimal: padding_waste == 0,
    }
}

fn next_4n_plus_1(t: usize) -> usize {
    if t % 4 == 1 {
        t
    } else {
        ((t - 1) / 4 + 1) * 4 + 1
    }
}
