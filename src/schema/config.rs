//! Configuration types for trial simulation and objective scoring.

use serde::{Deserialize, Serialize};

/// Run-wide settings passed to every simulated trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Trial length in simulated seconds.
    #[serde(default = "default_duration")]
    pub duration: f64,
    /// Physics step size in seconds.
    #[serde(default = "default_time_step")]
    pub time_step: f64,
    /// Interval between controller updates in seconds.
    #[serde(default = "default_control_interval")]
    pub control_interval: f64,
    /// Interval between recorded playback frames in seconds.
    #[serde(default = "default_frame_interval")]
    pub frame_interval: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            time_step: default_time_step(),
            control_interval: default_control_interval(),
            frame_interval: default_frame_interval(),
        }
    }
}

fn default_duration() -> f64 {
    20.0
}
fn default_time_step() -> f64 {
    0.01
}
fn default_control_interval() -> f64 {
    0.1
}
fn default_frame_interval() -> f64 {
    0.1
}

impl SimulationSettings {
    /// Number of samples in a trial trace.
    #[inline]
    pub fn sample_count(&self) -> usize {
        if self.time_step <= 0.0 || self.duration < 0.0 {
            return 0;
        }
        (self.duration / self.time_step) as usize + 1
    }

    /// Validate simulation settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.duration) {
            return Err(ConfigError::InvalidDuration);
        }
        if !positive(self.time_step) {
            return Err(ConfigError::InvalidTimeStep);
        }
        if !positive(self.control_interval) {
            return Err(ConfigError::InvalidControlInterval);
        }
        if !positive(self.frame_interval) {
            return Err(ConfigError::InvalidFrameInterval);
        }
        Ok(())
    }
}

/// Weights of the composite objective terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    /// Closeness of the final position to the target.
    #[serde(default = "default_final_distance_weight")]
    pub final_distance: f64,
    /// Smallness of the final actuation.
    #[serde(default = "default_final_speed_weight")]
    pub final_speed: f64,
    /// Bonus for never touching the wall.
    #[serde(default = "default_wall_avoidance_weight")]
    pub wall_avoidance: f64,
    /// Bonus for small wheels.
    #[serde(default = "default_wheel_size_weight")]
    pub wheel_size: f64,
    /// Bonus for settling early and staying settled.
    #[serde(default = "default_time_at_rest_weight")]
    pub time_at_rest: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            final_distance: default_final_distance_weight(),
            final_speed: default_final_speed_weight(),
            wall_avoidance: default_wall_avoidance_weight(),
            wheel_size: default_wheel_size_weight(),
            time_at_rest: default_time_at_rest_weight(),
        }
    }
}

fn default_final_distance_weight() -> f64 {
    2.0
}
fn default_final_speed_weight() -> f64 {
    1.0
}
fn default_wall_avoidance_weight() -> f64 {
    0.5
}
fn default_wheel_size_weight() -> f64 {
    0.25
}
fn default_time_at_rest_weight() -> f64 {
    0.25
}

/// Objective configuration: target geometry, tolerances and weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveConfig {
    /// Target chassis x-position.
    #[serde(default = "default_target_location")]
    pub target_location: f64,
    /// Distance from the start position to the target, used to normalize.
    #[serde(default = "default_initial_target_distance")]
    pub initial_target_distance: f64,
    /// Actuation magnitude below which the robot counts as at rest.
    #[serde(default = "default_speed_tolerance")]
    pub speed_tolerance: f64,
    #[serde(default)]
    pub weights: ObjectiveWeights,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            target_location: default_target_location(),
            initial_target_distance: default_initial_target_distance(),
            speed_tolerance: default_speed_tolerance(),
            weights: ObjectiveWeights::default(),
        }
    }
}

fn default_target_location() -> f64 {
    20.0
}
fn default_initial_target_distance() -> f64 {
    17.0
}
fn default_speed_tolerance() -> f64 {
    0.05
}

impl ObjectiveConfig {
    /// Validate objective parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_target_distance.is_finite() && self.initial_target_distance > 0.0) {
            return Err(ConfigError::InvalidTargetDistance);
        }
        if !(self.speed_tolerance.is_finite() && self.speed_tolerance >= 0.0) {
            return Err(ConfigError::InvalidTolerance);
        }
        let w = &self.weights;
        for (name, weight) in [
            ("final_distance", w.final_distance),
            ("final_speed", w.final_speed),
            ("wall_avoidance", w.wall_avoidance),
            ("wheel_size", w.wheel_size),
            ("time_at_rest", w.time_at_rest),
        ] {
            if !weight.is_finite() {
                return Err(ConfigError::InvalidWeight(name.to_string()));
            }
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Trial duration must be positive")]
    InvalidDuration,
    #[error("Time step must be positive")]
    InvalidTimeStep,
    #[error("Control interval must be positive")]
    InvalidControlInterval,
    #[error("Frame interval must be positive")]
    InvalidFrameInterval,
    #[error("Initial target distance must be positive")]
    InvalidTargetDistance,
    #[error("Speed tolerance must be non-negative")]
    InvalidTolerance,
    #[error("Objective weight {0} must be finite")]
    InvalidWeight(String),
}
