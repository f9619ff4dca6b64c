use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_BASE_SPEED: f64 = 2.0;
const DEFAULT_EXHAUSTION_THRESHOLD: f64 = 20.0;
const DEFAULT_ARRIVAL_GRACE_MS: u64 = 250;

/// Tunables of the motion model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MovementConfig {
    /// Travel speed in blocks per second for a rested agent.
    pub base_speed: f64,
    /// Agents starting a move with less energy than this walk at half speed.
    pub exhaustion_threshold: f64,
    /// Time spent in the arriving phase before returning to idle.
    pub arrival_grace_ms: u64,
}

impl MovementConfig {
    /// Checks that the tunables describe a walker that moves forward.
    ///
    /// The base speed must be finite and positive; the exhaustion threshold
    /// must be finite and non-negative. Any grace period is accepted.
    pub fn validate(&self) -> Result<(), MovementConfigError> {
        if !self.base_speed.is_finite() || self.base_speed <= 0.0 {
            return Err(MovementConfigError::BaseSpeed {
                value: self.base_speed,
            });
        }
        if !self.exhaustion_threshold.is_finite() || self.exhaustion_threshold < 0.0 {
            return Err(MovementConfigError::ExhaustionThreshold {
                value: self.exhaustion_threshold,
            });
        }
        Ok(())
    }

    /// Speed used for a movement that starts with the provided energy.
    #[must_use]
    pub fn speed_for(&self, energy: f64) -> f64 {
        if energy < self.exhaustion_threshold {
            self.base_speed / 2.0
        } else {
            self.base_speed
        }
    }

    /// Grace period as a duration.
    #[must_use]
    pub const fn arrival_grace(&self) -> Duration {
        Duration::from_millis(self.arrival_grace_ms)
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            base_speed: DEFAULT_BASE_SPEED,
            exhaustion_threshold: DEFAULT_EXHAUSTION_THRESHOLD,
            arrival_grace_ms: DEFAULT_ARRIVAL_GRACE_MS,
        }
    }
}

/// Reasons a [`MovementConfig`] may be refused.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum MovementConfigError {
    /// Base speed is zero, negative, or not a number.
    #[error("base speed must be a positive finite number, got {value}")]
    BaseSpeed {
        /// Configured speed.
        value: f64,
    },
    /// Exhaustion threshold is negative or not a number.
    #[error("exhaustion threshold must be a non-negative finite number, got {value}")]
    ExhaustionThreshold {
        /// Configured threshold.
        value: f64,
    },
}
