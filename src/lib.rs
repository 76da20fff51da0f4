//! Four-phase batched video-upscaling pipeline for diffusion
//! super-resolution models, built on `burn`'s backend-generic tensors.
//!
//! The pipeline always runs strictly in order: encode all batches to
//! latent space, upscale all latents through the diffusion transformer,
//! decode all upscaled latents back to pixel space, then post-process
//! (truncate padding, color-correct, recombine alpha) and assemble the
//! final video. See [`orchestrator::run_pipeline`] for the entry point.

pub mod color;
pub mod conform;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod phases;
pub mod planner;
pub mod precision;
pub mod stager;
pub mod timing;
pub mod transform;

pub use config::{ColorCorrection, PipelineConfig, TileSize};
pub use context::{PipelineContext, Slot};
pub use error::{Phase, PipelineError, PipelineResult};
pub use orchestrator::{run_pipeline, PipelineModels};
