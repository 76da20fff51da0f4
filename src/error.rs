use thiserror::Error;

/// Errors surfaced by the pipeline orchestrator.
///
/// Follows the propagation policy in spec.md §7: phases never retry their
/// own work, every `finally`-equivalent cleanup runs regardless of which
/// variant is produced, and only a handful of conditions (frame-count
/// mismatch, missing alpha data, color-correction shape mismatch) are
/// logged as warnings rather than raised here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no frames to process")]
    NoFrames,

    #[error("pipeline context missing required state: {0}")]
    MissingContext(&'static str),

    #[error("model materialization failed for {model}: {source}")]
    ModelMaterialization {
        model: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("phase {phase} failed on batch {batch}: {source}")]
    BatchOperator {
        phase: Phase,
        batch: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("pipeline interrupted during phase {phase} at batch {batch}")]
    Interrupted { phase: Phase, batch: usize },

    #[error("device stager could not place model on target device: {0}")]
    Staging(String),
}

/// One of the four global phases, used to annotate batch-level errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Encode,
    Upscale,
    Decode,
    Postprocess,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Encode => "1 (encode)",
            Phase::Upscale => "2 (upscale)",
            Phase::Decode => "3 (decode)",
            Phase::Postprocess => "4 (postprocess)",
        };
        write!(f, "{name}")
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
