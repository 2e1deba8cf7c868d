use crate::store::DurationMap;
use tracing::warn;

/// Per-turn generation durations, kept apart from transcript content
///
/// Values are taken as given, zero and negative durations included. NaN and
/// infinities are refused since they cannot be stored as JSON numbers.
#[derive(Debug, Default, Clone)]
pub struct TimingRecorder {
    durations: DurationMap,
}

impl TimingRecorder {
    pub fn seed(&mut self, durations: DurationMap) {
        self.durations = durations;
    }

    /// Upsert; the last value recorded for a turn wins
    ///
    /// Returns false if the value was refused.
    pub fn record(&mut self, turn_id: &str, duration_ms: f64) -> bool {
        if !duration_ms.is_finite() {
            warn!("Ignoring non-finite duration for {}: {}", turn_id, duration_ms);
            return false;
        }
        self.durations.insert(turn_id.to_string(), duration_ms);
        true
    }

    pub fn get(&self, turn_id: &str) -> Option<f64> {
        self.durations.get(turn_id).copied()
    }

    pub fn durations(&self) -> &DurationMap {
        &self.durations
    }

    pub fn clear(&mut self) {
        self.durations.clear();
    }
}
