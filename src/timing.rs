use std::collections::HashMap;
use std::time::Instant;

/// Lightweight per-phase timing, logged at `debug!` on completion.
///
/// Replaces the original implementation's bespoke `Debug.start_timer` /
/// `Debug.end_timer(..., show_breakdown=True)` helper with the `log`
/// facade already used throughout `burn-core`; timing itself stays a
/// small local utility since it has no external collaborator.
#[derive(Default)]
pub struct PhaseTimer {
    starts: HashMap<String, Instant>,
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, label: &str) {
        self.starts.insert(label.to_string(), Instant::now());
    }

    /// Ends the timer and logs `message` with the elapsed duration at
    /// `debug!` level. No-op (besides logging) if `start` was never
    /// called for this label.
    pub fn end(&mut self, label: &str, message: &str) {
        if let Some(start) = self.starts.remove(label) {
            log::debug!("{message} ({:.2?})", start.elapsed());
        } else {
            log::debug!("{message}");
        }
    }
}
