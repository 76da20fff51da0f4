use burn::config::Config;
use serde::{Deserialize, Serialize};

/// Color-correction method dispatched by Phase 4 (spec.md §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorCorrection {
    None,
    Adain,
    Wavelet,
    WaveletAdaptive,
    Lab,
    Hsv,
}

impl ColorCorrection {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ColorCorrection::None)
    }
}

/// Optional tile size / overlap passed through opaquely to the VAE
/// (spec.md §6: "tiled encode/decode toggles and tile sizes (opaque to
/// the core; passed to the VAE)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSize {
    pub height: usize,
    pub width: usize,
}

/// Pipeline-wide configuration (spec.md §6 "Configuration" list).
///
/// Modeled the way `burn`'s own example crates model their training
/// configuration (see `examples/wgan/src/training.rs`'s `TrainingConfig`,
/// `#[derive(Config)]`), which gives this struct JSON `save`/`load` for
/// free via `burn::config::Config`. Device descriptors are intentionally
/// *not* part of this struct: `B::Device` is not guaranteed serializable
/// and, like `wgan::train`'s own `device: B::Device` parameter, devices
/// are passed directly to the orchestrator instead.
#[derive(Config, Debug)]
pub struct PipelineConfig {
    /// Target batch size in frames; ideally 4n+1 (C1 reports padding
    /// waste otherwise, it does not enforce it).
    pub batch_size: usize,

    /// Frames shared between consecutive batches' input windows.
    #[config(default = 0)]
    pub temporal_overlap: usize,

    /// Offload VAE/DiT to host memory between phases.
    #[config(default = true)]
    pub preserve_vram: bool,

    /// Target shortest-edge resolution after the video transform (C3).
    pub res_w: usize,

    /// Pre-encode noise injection scale in `[0, 1]`.
    #[config(default = 0.0)]
    pub input_noise_scale: f32,

    /// Classifier-free guidance scale for DiT inference.
    #[config(default = 1.0)]
    pub cfg_scale: f32,

    /// Global random seed for noise generation.
    #[config(default = 42)]
    pub seed: u64,

    /// Latent-space noise augmentation scale in `[0, 1]`.
    #[config(default = 0.0)]
    pub latent_noise_scale: f32,

    /// Color-correction method applied in Phase 4.
    #[config(default = "ColorCorrection::Wavelet")]
    pub color_correction: ColorCorrection,

    /// Keep DiT resident in RAM across pipeline runs instead of dropping it.
    #[config(default = false)]
    pub dit_cache: bool,

    /// Keep VAE resident in RAM across pipeline runs instead of dropping it.
    #[config(default = false)]
    pub vae_cache: bool,

    #[config(default = false)]
    pub encode_tiled: bool,
    pub encode_tile_size: Option<TileSize>,

    #[config(default = false)]
    pub decode_tiled: bool,
    pub decode_tile_size: Option<TileSize>,

    /// DiT device ordinal used to populate `LOCAL_RANK` before model
    /// materialization (spec.md §6 "Process-wide state"). `None` maps
    /// to `"0"`, matching the original's fallback.
    pub dit_device_ordinal: Option<usize>,
}
