use burn::tensor::{backend::Backend, Tensor};

use crate::precision::PrecisionInfo;

/// A batch-indexed slot that is either holding a tensor or has already
/// been consumed by a later phase.
///
/// Spec.md's design notes (§9) call for replacing the original's
/// dynamically-typed dictionary with "sum-typed sparse arrays (a slot is
/// either `filled(tensor)` or `consumed`)" so that invariant I3 ("a phase
/// MUST NOT observe an entry it has already consumed") is enforced
/// statically rather than by convention.
#[derive(Debug)]
pub enum Slot<T> {
    Filled(T),
    Consumed,
}

impl<T> Slot<T> {
    pub fn is_filled(&self) -> bool {
        matches!(self, Slot::Filled(_))
    }

    /// Takes the value out, leaving `Consumed` behind. Returns `None` if
    /// the slot was already consumed (or never filled).
    pub fn take(&mut self) -> Option<T> {
        match std::mem::replace(self, Slot::Consumed) {
            Slot::Filled(v) => Some(v),
            Slot::Consumed => None,
        }
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Slot::Filled(v) => Some(v),
            Slot::Consumed => None,
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Consumed
    }
}

/// Pipeline state shuttled between phases (spec.md §3 "Context").
///
/// Each batch slot owns its latent until upscale consumes it, its
/// upscaled latent until decode consumes it, and its sample until
/// post-process writes it to `final_video`. Alpha and transformed-video
/// slots are created in Phase 1 and freed in Phase 4.
pub struct PipelineContext<B: Backend> {
    pub precision: PrecisionInfo,
    pub total_frames: usize,
    pub is_rgba: bool,

    pub ori_lengths: Vec<usize>,
    pub latents: Vec<Slot<Tensor<B, 4>>>,
    pub upscaled_latents: Vec<Slot<Tensor<B, 4>>>,
    pub samples: Vec<Slot<Tensor<B, 4>>>,

    /// Present only when `color_correction != None` (spec.md §3).
    pub transformed_videos: Option<Vec<Slot<Tensor<B, 4>>>>,
    /// Present only for RGBA input.
    pub alpha_channels: Option<Vec<Slot<Tensor<B, 4>>>>,
    /// Present only for RGBA input.
    pub input_rgb: Option<Vec<Slot<Tensor<B, 4>>>>,

    /// Allocated lazily in Phase 4 once the first decoded batch reveals
    /// the true output dimensions (I6).
    pub final_video: Option<Tensor<B, 4>>,
    /// Phase 4's monotonically non-decreasing write cursor (P4).
    pub write_cursor: usize,
}

impl<B: Backend> PipelineContext<B> {
    pub fn new(total_frames: usize, is_rgba: bool, precision: PrecisionInfo) -> Self {
        Self {
            precision,
            total_frames,
            is_rgba,
            ori_lengths: Vec::new(),
            latents: Vec::new(),
            upscaled_latents: Vec::new(),
            samples: Vec::new(),
            transformed_videos: None,
            alpha_channels: None,
            input_rgb: None,
            final_video: None,
            write_cursor: 0,
        }
    }
}
