//! The four batched pipeline phases (C6-C9). Each phase consumes one
//! [`crate::context::Slot`] per batch from the previous phase and fills
//! the next, so that a phase can never observe a batch it (or an
//! earlier phase) has already consumed (I3).

pub mod decode;
pub mod encode;
pub mod postprocess;
pub mod upscale;

/// Splits `total_frames` into `[start, end)` ranges of `batch_size`
/// frames, advancing by `step` each time (spec.md §4.1's `step` /
/// `batch_size` pair, grounded on the batch loop in
/// `examples/original_source/src/core/generation.py`).
pub fn batch_ranges(total_frames: usize, batch_size: usize, step: usize) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0usize;
    while start < total_frames {
        let end = (start + batch_size).min(total_frames);
        ranges.push((start, end));
        if end == total_frames {
            break;
        }
        start += step;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_all_frames_without_overlap() {
        let ranges = batch_ranges(17, 5, 5);
        assert_eq!(ranges, vec![(0, 5), (5, 10), (10, 15), (15, 17)]);
    }

    #[test]
    fn overlapping_step_revisits_frames() {
        let ranges = batch_ranges(17, 9, 5);
        assert_eq!(ranges, vec![(0, 9), (5, 14), (10, 17)]);
    }

    #[test]
    fn empty_input_has_no_batches() {
        assert_eq!(batch_ranges(0, 5, 5), Vec::<(usize, usize)>::new());
    }
}
