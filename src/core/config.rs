//! Simulation configuration.

use serde::{Deserialize, Serialize};

/// Global tuning for one simulation run.
///
/// Every peer in a lockstep game must use an identical `SimConfig`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the gameplay RNG.
    pub seed: u64,

    /// Logic frames per simulated second. Durations in game data are frames.
    pub logic_frames_per_second: u32,

    /// Slow-death time scale requested by the level-of-detail service
    /// (0 = finish deaths instantly, 1 = normal speed).
    pub slow_death_scale: f32,

    /// Downward acceleration applied to airborne objects, per frame.
    pub gravity: f32,

    /// Health ratio at or below which a body counts as damaged.
    pub damaged_threshold: f32,

    /// Health ratio at or below which a body counts as really damaged.
    pub really_damaged_threshold: f32,

    /// Record fx / spawn / weapon events in the effect log.
    pub record_effects: bool,

    /// Frames between mob member checks against their master.
    pub mob_update_interval: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            logic_frames_per_second: 30,
            slow_death_scale: 1.0,
            gravity: 1.0,
            damaged_threshold: 0.7,
            really_damaged_threshold: 0.35,
            record_effects: true,
            mob_update_interval: 16,
        }
    }
}

impl SimConfig {
    /// Set the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the slow-death time scale.
    #[must_use]
    pub fn with_slow_death_scale(mut self, scale: f32) -> Self {
        self.slow_death_scale = scale.max(0.0);
        self
    }

    /// Set gravity.
    #[must_use]
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Enable or disable the effect log.
    #[must_use]
    pub fn with_effect_recording(mut self, record: bool) -> Self {
        self.record_effects = record;
        self
    }

    /// Convert seconds of game time to logic frames.
    #[must_use]
    pub fn seconds_to_frames(&self, seconds: f32) -> u32 {
        (seconds * self.logic_frames_per_second as f32).round().max(0.0) as u32
    }
}
