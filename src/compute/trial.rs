//! Trial execution boundary between the optimizer and a simulator.
//!
//! The optimizer only ever sees a [`SimulationAdapter`]: hand it a full
//! parameter set and the run-wide [`SimulationSettings`], get back a
//! [`TrialTrace`]. Adapters built on a stepping model implement [`Plant`]
//! and reuse [`run_controlled`] for the fixed-step control loop.

use serde::{Deserialize, Serialize};

use crate::schema::{RobotParameters, SimulationSettings};

/// Error produced when a simulator cannot produce a trace.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SimulationError {
    #[error("Invalid trial parameters: {0}")]
    InvalidParameters(String),
    #[error("Simulation settings produced an empty trace")]
    EmptyTrace,
    #[error("Simulation diverged at t = {time:.3}s")]
    Diverged { time: f64 },
}

/// External simulator contract.
///
/// Implementations must be deterministic: identical parameters and settings
/// yield identical traces.
pub trait SimulationAdapter: Send + Sync {
    /// Run one fixed-duration closed-loop trial.
    ///
    /// When `record` is set the trace also carries playback frames.
    fn run_trial(
        &self,
        params: &RobotParameters,
        settings: &SimulationSettings,
        record: bool,
    ) -> Result<TrialTrace, SimulationError>;
}

impl<A: SimulationAdapter + ?Sized> SimulationAdapter for &A {
    fn run_trial(
        &self,
        params: &RobotParameters,
        settings: &SimulationSettings,
        record: bool,
    ) -> Result<TrialTrace, SimulationError> {
        (**self).run_trial(params, settings, record)
    }
}

/// Observations at one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialSample {
    pub time: f64,
    /// Forward distance sensor reading.
    pub sensor_distance: f64,
    /// Commanded wheel angular velocity.
    pub angular_velocity: f64,
    /// Front wheel touching the wall.
    pub wall_contact: bool,
    /// Chassis x-position.
    pub chassis_x: f64,
}

/// Pose snapshot used for playback.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrialFrame {
    pub time: f32,
    pub chassis_x: f32,
    pub chassis_y: f32,
    /// Chassis pitch in radians.
    pub chassis_angle: f32,
    pub front_wheel: (f32, f32),
    pub rear_wheel: (f32, f32),
    pub sensor_tip: (f32, f32),
    pub sensor_distance: f32,
    pub wall_contact: bool,
}

impl TrialFrame {
    /// Number of scalar fields in the flat representation.
    pub const FIELDS: usize = 12;

    pub fn to_array(&self) -> [f32; Self::FIELDS] {
        [
            self.time,
            self.chassis_x,
            self.chassis_y,
            self.chassis_angle,
            self.front_wheel.0,
            self.front_wheel.1,
            self.rear_wheel.0,
            self.rear_wheel.1,
            self.sensor_tip.0,
            self.sensor_tip.1,
            self.sensor_distance,
            if self.wall_contact { 1.0 } else { 0.0 },
        ]
    }

    pub fn from_array(v: &[f32; Self::FIELDS]) -> Self {
        Self {
            time: v[0],
            chassis_x: v[1],
            chassis_y: v[2],
            chassis_angle: v[3],
            front_wheel: (v[4], v[5]),
            rear_wheel: (v[6], v[7]),
            sensor_tip: (v[8], v[9]),
            sensor_distance: v[10],
            wall_contact: v[11] != 0.0,
        }
    }
}

/// Result of one trial: per-step samples plus optional playback frames.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrialTrace {
    pub samples: Vec<TrialSample>,
    #[serde(default)]
    pub frames: Vec<TrialFrame>,
}

impl TrialTrace {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Final-step observations.
    pub fn final_sample(&self) -> Option<&TrialSample> {
        self.samples.last()
    }

    /// Commanded angular velocity series.
    pub fn speeds(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.angular_velocity)
    }

    /// True if the wall contact flag was raised at any sample.
    pub fn any_contact(&self) -> bool {
        self.samples.iter().any(|s| s.wall_contact)
    }
}

/// Clamped linear controller mapping sensor distance to wheel speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedController {
    pub speed_max: f64,
    pub slope: f64,
    pub intercept: f64,
}

impl SpeedController {
    pub fn from_parameters(params: &RobotParameters) -> Self {
        Self {
            speed_max: params.speed_max,
            slope: params.speed_slope,
            intercept: params.speed_intercept,
        }
    }

    /// Desired angular velocity for a sensor reading.
    pub fn command(&self, distance: f64) -> f64 {
        let limit = self.speed_max.abs();
        (distance * self.slope + self.intercept).clamp(-limit, limit)
    }
}

/// A stepping simulation model driven by [`run_controlled`].
pub trait Plant {
    /// Advance by one time step.
    fn step(&mut self, dt: f64);
    /// Elapsed simulated time.
    fn time(&self) -> f64;
    fn sensor_distance(&self) -> f64;
    /// Currently commanded angular velocity.
    fn angular_velocity(&self) -> f64;
    fn set_angular_velocity(&mut self, omega: f64);
    fn contacting_wall(&self) -> bool;
    fn chassis_x(&self) -> f64;
    /// Current pose for playback.
    fn frame(&self) -> TrialFrame;
}

/// Run the fixed-step closed-loop trial on a plant.
///
/// Each step advances the plant, applies the controller when its interval is
/// due, then samples. Frames are captured at start, every
/// `frame_interval`, and at the end.
pub fn run_controlled<P: Plant>(
    plant: &mut P,
    controller: &SpeedController,
    settings: &SimulationSettings,
    record: bool,
) -> Result<TrialTrace, SimulationError> {
    let steps = settings.sample_count();
    if steps == 0 {
        return Err(SimulationError::EmptyTrace);
    }

    let mut trace = TrialTrace {
        samples: Vec::with_capacity(steps),
        frames: Vec::new(),
    };

    let mut next_control_time = 0.0;
    let mut next_frame_time = settings.frame_interval;
    if record {
        trace.frames.push(plant.frame());
    }

    for i in 0..steps {
        plant.step(settings.time_step);
        let time = plant.time();

        if time >= next_control_time {
            let omega = controller.command(plant.sensor_distance());
            plant.set_angular_velocity(omega);
            next_control_time += settings.control_interval;
        }

        let sample = TrialSample {
            time,
            sensor_distance: plant.sensor_distance(),
            angular_velocity: plant.angular_velocity(),
            wall_contact: plant.contacting_wall(),
            chassis_x: plant.chassis_x(),
        };
        if !(sample.chassis_x.is_finite() && sample.sensor_distance.is_finite()) {
            return Err(SimulationError::Diverged { time });
        }
        trace.samples.push(sample);

        if record && (time >= next_frame_time || i + 1 == steps) {
            trace.frames.push(plant.frame());
            next_frame_time += settings.frame_interval;
        }
    }

    Ok(trace)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Point robot moving at its commanded speed towards a fixed wall.
    struct PointPlant {
        time: f64,
        x: f64,
        omega: f64,
    }

    impl Plant for PointPlant {
        fn step(&mut self, dt: f64) {
            self.x += self.omega * dt;
            self.time += dt;
        }
        fn time(&self) -> f64 {
            self.time
        }
        fn sensor_distance(&self) -> f64 {
            10.0 - self.x
        }
        fn angular_velocity(&self) -> f64 {
            self.omega
        }
        fn set_angular_velocity(&mut self, omega: f64) {
            self.omega = omega;
        }
        fn contacting_wall(&self) -> bool {
            self.x >= 10.0
        }
        fn chassis_x(&self) -> f64 {
            self.x
        }
        fn frame(&self) -> TrialFrame {
            TrialFrame {
                time: self.time as f32,
                chassis_x: self.x as f32,
                ..Default::default()
            }
        }
    }

    #[test]
    fn test_controller_clamps() {
        let controller = SpeedController {
            speed_max: 3.0,
            slope: 2.0,
            intercept: -15.0,
        };
        assert_eq!(controller.command(10.0), 3.0);
        assert_eq!(controller.command(0.0), -3.0);
        assert!((controller.command(7.0) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_control_loop_settles() {
        let mut plant = PointPlant {
            time: 0.0,
            x: 0.0,
            omega: 0.0,
        };
        // Drive towards distance 5 (x = 5).
        let controller = SpeedController {
            speed_max: 2.0,
            slope: 1.0,
            intercept: -5.0,
        };
        let settings = SimulationSettings {
            duration: 20.0,
            ..Default::default()
        };

        let trace = run_controlled(&mut plant, &controller, &settings, false).unwrap();
        assert_eq!(trace.len(), settings.sample_count());
        assert!(trace.frames.is_empty());

        let last = trace.final_sample().unwrap();
        assert!((last.chassis_x - 5.0).abs() < 0.1);
        assert!(!trace.any_contact());
    }

    #[test]
    fn test_recording_captures_frames() {
        let mut plant = PointPlant {
            time: 0.0,
            x: 0.0,
            omega: 0.0,
        };
        let controller = SpeedController {
            speed_max: 1.0,
            slope: 0.0,
            intercept: 1.0,
        };
        let settings = SimulationSettings {
            duration: 1.0,
            ..Default::default()
        };

        let trace = run_controlled(&mut plant, &controller, &settings, true).unwrap();
        // Initial frame plus roughly one per 0.1s.
        assert!(trace.frames.len() >= 10 && trace.frames.len() <= 12);
        assert_eq!(trace.frames[0].chassis_x, 0.0);
    }

    #[test]
    fn test_frame_array_roundtrip() {
        let frame = TrialFrame {
            time: 1.5,
            chassis_x: 3.0,
            front_wheel: (4.5, 1.2),
            wall_contact: true,
            ..Default::default()
        };
        assert_eq!(TrialFrame::from_array(&frame.to_array()), frame);
    }
}
