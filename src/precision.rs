/// Observed weight dtype of a model, as reported by a caller's model
/// wrapper via [`crate::models::WeightDtypeHint`]. Mirrors the dtype
/// families the original `_ensure_precision_initialized` distinguishes
/// (`torch.float8_e4m3fn` / `float8_e5m2`, `torch.float16`, everything
/// else) without depending on any particular tensor runtime's dtype enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedDtype {
    Float8E4M3,
    Float8E5M2,
    Float16,
    BFloat16,
    Other,
}

/// The only compute dtype this pipeline currently selects (C4). The enum
/// exists so a future dtype policy can diverge per model without
/// changing every call site — see spec.md §4.4 and §9 "Open questions".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDtype {
    BFloat16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecisionInfo {
    pub compute_dtype: ComputeDtype,
    pub autocast_dtype: ComputeDtype,
}

impl Default for PrecisionInfo {
    fn default() -> Self {
        Self {
            compute_dtype: ComputeDtype::BFloat16,
            autocast_dtype: ComputeDtype::BFloat16,
        }
    }
}

/// Detects precision settings from the VAE/DiT weight dtypes.
///
/// Per spec.md §4.4 the policy is *always* `bfloat16`, regardless of what
/// is observed: 8-bit float variants cannot do arithmetic, and 16-bit
/// float is numerically unstable and produces black frames in this
/// pipeline. `dit_dtype`/`vae_dtype` being `None` (inspection failed)
/// falls back to the same default. This hook exists purely so a future
/// dtype policy can diverge per model; today it has no behavioral effect.
pub fn detect_precision(
    dit_dtype: Option<DetectedDtype>,
    vae_dtype: Option<DetectedDtype>,
) -> PrecisionInfo {
    match (dit_dtype, vae_dtype) {
        (Some(dit), Some(vae)) => {
            log::debug!("detected precision: dit={dit:?}, vae={vae:?}, compute=BFloat16, autocast=BFloat16");
        }
        _ => {
            log::warn!("could not detect model dtypes, falling back to BFloat16");
        }
    }
    PrecisionInfo::default()
}
