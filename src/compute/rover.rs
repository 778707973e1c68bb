//! Simplified planar model of a two-wheeled mobile robot.
//!
//! This is the bundled [`SimulationAdapter`]: a torque-limited rover driving
//! along flat ground over a single step towards a wall, with a forward
//! distance sensor and a spring-damper suspension. It is a lightweight
//! stand-in for a rigid-body engine and makes no physical accuracy claims.
//! Trials are deterministic.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::trial::{
    Plant, SimulationAdapter, SimulationError, SpeedController, TrialFrame, TrialTrace,
    run_controlled,
};
use crate::schema::{RobotParameters, SimulationSettings};

const GRAVITY: f64 = 9.8;

/// Static environment and fixed robot properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoverWorld {
    /// X-position of the wall face.
    pub wall_x: f64,
    pub wall_height: f64,
    /// X-position of the step centre.
    pub step_x: f64,
    pub step_length: f64,
    pub step_height: f64,
    /// Ground extends over `[0, ground_extent]` for sensing.
    pub ground_extent: f64,
    /// Initial chassis x-position.
    pub start_x: f64,
    /// Chassis clearance above the wheel centres.
    pub ride_height: f64,
    /// Sensor mount height above the chassis centre.
    pub sensor_offset: f64,
    pub density: f64,
    /// Per-wheel motor torque limit.
    pub motor_max_torque: f64,
    /// Inverse time constant of the speed loop (1/s).
    pub drive_gain: f64,
}

impl Default for RoverWorld {
    fn default() -> Self {
        Self {
            wall_x: 25.0,
            wall_height: 3.0,
            step_x: 10.0,
            step_length: 2.0,
            step_height: 1.2,
            ground_extent: 100.0,
            start_x: 3.0,
            ride_height: 0.1,
            sensor_offset: 0.75,
            density: 0.7,
            motor_max_torque: 40.0,
            drive_gain: 20.0,
        }
    }
}

impl RoverWorld {
    fn step_span(&self) -> (f64, f64) {
        let half = self.step_length / 2.0;
        (self.step_x - half, self.step_x + half)
    }

    /// Height of a wheel centre resting at `x`.
    fn wheel_height(&self, x: f64, radius: f64) -> f64 {
        let (a, b) = self.step_span();
        let dx = if x < a {
            a - x
        } else if x > b {
            x - b
        } else {
            0.0
        };
        if dx < radius {
            radius.max(self.step_height + (radius * radius - dx * dx).sqrt())
        } else {
            radius
        }
    }

    /// True if a wheel of `radius` cannot roll onto the step and would
    /// enter the region around it when moving from `from` to `to`.
    /// Wheels climb steps up to their own radius.
    fn step_blocks(&self, from: f64, to: f64, radius: f64) -> bool {
        if self.step_height <= radius {
            return false;
        }
        let (a, b) = self.step_span();
        let (lo, hi) = (a - radius, b + radius);
        let inside = |x: f64| x > lo && x < hi;
        !inside(from) && inside(to) || (from <= lo && to >= hi) || (from >= hi && to <= lo)
    }
}

/// Bundled rover simulator.
#[derive(Debug, Clone, Default)]
pub struct RoverSimulator {
    world: RoverWorld,
}

impl RoverSimulator {
    pub fn new(world: RoverWorld) -> Self {
        Self { world }
    }

    pub fn world(&self) -> &RoverWorld {
        &self.world
    }
}

impl SimulationAdapter for RoverSimulator {
    fn run_trial(
        &self,
        params: &RobotParameters,
        settings: &SimulationSettings,
        record: bool,
    ) -> Result<TrialTrace, SimulationError> {
        let mut plant = RoverPlant::new(self.world.clone(), params)?;
        let controller = SpeedController::from_parameters(params);
        run_controlled(&mut plant, &controller, settings, record)
    }
}

/// Mutable state of one rover trial.
pub struct RoverPlant {
    world: RoverWorld,
    wheel_radius: f64,
    half_length: f64,
    sensor_limit: f64,
    /// Suspension natural angular frequency (rad/s).
    omega_n: f64,
    damping: f64,
    mass: f64,

    time: f64,
    x: f64,
    velocity: f64,
    chassis_y: f64,
    chassis_vy: f64,
    pitch: f64,
    command: f64,
    contact: bool,
    sensor_distance: f64,
    sensor_tip: (f64, f64),
}

impl RoverPlant {
    /// Build a plant at rest at the start position.
    pub fn new(world: RoverWorld, params: &RobotParameters) -> Result<Self, SimulationError> {
        if !params.is_finite() {
            return Err(SimulationError::InvalidParameters(
                "parameters must be finite".into(),
            ));
        }
        if params.wheel_radius <= 0.0 || params.chassis_length <= 0.0 {
            return Err(SimulationError::InvalidParameters(
                "wheel radius and chassis length must be positive".into(),
            ));
        }
        if params.suspension_frequency <= 0.0 || params.suspension_damping < 0.0 {
            return Err(SimulationError::InvalidParameters(
                "suspension frequency must be positive and damping non-negative".into(),
            ));
        }
        if params.sensor_limit < 0.0 {
            return Err(SimulationError::InvalidParameters(
                "sensor limit must be non-negative".into(),
            ));
        }

        let radius = params.wheel_radius;
        let mass = world.density
            * (params.chassis_length * params.chassis_height() + 2.0 * PI * radius * radius);

        let mut plant = Self {
            wheel_radius: radius,
            half_length: params.chassis_length / 2.0,
            sensor_limit: params.sensor_limit,
            omega_n: 2.0 * PI * params.suspension_frequency,
            damping: params.suspension_damping,
            mass,
            time: 0.0,
            x: world.start_x,
            velocity: 0.0,
            chassis_y: 0.0,
            chassis_vy: 0.0,
            pitch: 0.0,
            command: 0.0,
            contact: false,
            sensor_distance: params.sensor_limit,
            sensor_tip: (0.0, 0.0),
            world,
        };

        let (front, rear) = plant.wheel_heights(plant.x);
        plant.chassis_y = (front + rear) / 2.0 + plant.world.ride_height;
        plant.pitch = ((front - rear) / (2.0 * plant.half_length)).atan();
        plant.update_sensor();
        Ok(plant)
    }

    fn wheel_positions(&self, x: f64) -> (f64, f64) {
        (x + self.half_length, x - self.half_length)
    }

    fn wheel_heights(&self, x: f64) -> (f64, f64) {
        let (front, rear) = self.wheel_positions(x);
        (
            self.world.wheel_height(front, self.wheel_radius),
            self.world.wheel_height(rear, self.wheel_radius),
        )
    }

    fn update_sensor(&mut self) {
        let (sin, cos) = self.pitch.sin_cos();
        let base = (
            self.x - self.world.sensor_offset * sin,
            self.chassis_y + self.world.sensor_offset * cos,
        );
        let ray = (self.sensor_limit * cos, self.sensor_limit * sin);
        let tip = (base.0 + ray.0, base.1 + ray.1);

        let wall = segment_intersection(
            base,
            ray,
            (self.world.wall_x, 0.0),
            (0.0, self.world.wall_height),
        );
        let ground = segment_intersection(base, ray, (0.0, 0.0), (self.world.ground_extent, 0.0));

        let distance_to = |hit: Option<(f64, f64)>| {
            hit.map(|p| ((p.0 - base.0).powi(2) + (p.1 - base.1).powi(2)).sqrt())
                .unwrap_or(f64::INFINITY)
        };
        let wall_distance = distance_to(wall);
        let ground_distance = distance_to(ground);

        self.sensor_tip = match (wall, ground) {
            (Some(p), _) if wall_distance < ground_distance => p,
            (_, Some(p)) if ground_distance < self.sensor_limit => p,
            _ => tip,
        };
        self.sensor_distance = self.sensor_limit.min(wall_distance).min(ground_distance);
    }
}

impl Plant for RoverPlant {
    fn step(&mut self, dt: f64) {
        let radius = self.wheel_radius;

        // Drive: track the commanded rim speed within the torque limit.
        let max_accel = 2.0 * self.world.motor_max_torque / (radius * self.mass);
        let target = self.command * radius;
        let drive = ((target - self.velocity) * self.world.drive_gain).clamp(-max_accel, max_accel);
        let accel = drive - GRAVITY * self.pitch.sin();

        self.velocity += accel * dt;
        let mut next_x = self.x + self.velocity * dt;

        let (front_from, rear_from) = self.wheel_positions(self.x);
        let (front_to, rear_to) = self.wheel_positions(next_x);
        if self.world.step_blocks(front_from, front_to, radius)
            || self.world.step_blocks(rear_from, rear_to, radius)
        {
            next_x = self.x;
            self.velocity = 0.0;
        }

        let wall_limit = self.world.wall_x - radius - self.half_length;
        self.contact = next_x >= wall_limit;
        if self.contact {
            next_x = wall_limit;
            self.velocity = self.velocity.min(0.0);
        }
        self.x = next_x;

        // Suspension: chassis heave follows the wheel support height.
        let (front, rear) = self.wheel_heights(self.x);
        let rest = (front + rear) / 2.0 + self.world.ride_height;
        let spring = -self.omega_n * self.omega_n * (self.chassis_y - rest);
        let damper = -2.0 * self.damping * self.omega_n * self.chassis_vy;
        self.chassis_vy += (spring + damper) * dt;
        self.chassis_y += self.chassis_vy * dt;
        self.pitch = ((front - rear) / (2.0 * self.half_length)).atan();

        self.update_sensor();
        self.time += dt;
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn sensor_distance(&self) -> f64 {
        self.sensor_distance
    }

    fn angular_velocity(&self) -> f64 {
        self.command
    }

    fn set_angular_velocity(&mut self, omega: f64) {
        self.command = omega;
    }

    fn contacting_wall(&self) -> bool {
        self.contact
    }

    fn chassis_x(&self) -> f64 {
        self.x
    }

    fn frame(&self) -> TrialFrame {
        let (front_x, rear_x) = self.wheel_positions(self.x);
        let (front_y, rear_y) = self.wheel_heights(self.x);
        TrialFrame {
            time: self.time as f32,
            chassis_x: self.x as f32,
            chassis_y: self.chassis_y as f32,
            chassis_angle: self.pitch as f32,
            front_wheel: (front_x as f32, front_y as f32),
            rear_wheel: (rear_x as f32, rear_y as f32),
            sensor_tip: (self.sensor_tip.0 as f32, self.sensor_tip.1 as f32),
            sensor_distance: self.sensor_distance as f32,
            wall_contact: self.contact,
        }
    }
}

/// Intersection of segments `p + t*r` and `q + u*s` for `t, u` in `[0, 1]`.
fn segment_intersection(
    p: (f64, f64),
    r: (f64, f64),
    q: (f64, f64),
    s: (f64, f64),
) -> Option<(f64, f64)> {
    let cross = |a: (f64, f64), b: (f64, f64)| a.0 * b.1 - a.1 * b.0;
    let rxs = cross(r, s);
    if rxs == 0.0 {
        return None;
    }
    let pq = (q.0 - p.0, q.1 - p.1);
    let t = cross(pq, s) / rxs;
    let u = cross(pq, r) / rxs;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some((p.0 + t * r.0, p.1 + t * r.1))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_intersection() {
        let hit = segment_intersection((0.0, 1.0), (10.0, 0.0), (5.0, 0.0), (0.0, 3.0));
        let (x, y) = hit.unwrap();
        assert!((x - 5.0).abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);

        assert!(segment_intersection((0.0, 1.0), (2.0, 0.0), (5.0, 0.0), (0.0, 3.0)).is_none());
        assert!(segment_intersection((0.0, 1.0), (1.0, 0.0), (0.0, 0.0), (1.0, 0.0)).is_none());
    }

    #[test]
    fn test_wheel_height_profile() {
        let world = RoverWorld::default();
        assert_eq!(world.wheel_height(0.0, 0.5), 0.5);
        assert!((world.wheel_height(10.0, 0.5) - 1.7).abs() < 1e-12);
        // Wheel resting against the step corner.
        let h = world.wheel_height(8.5, 1.5);
        assert!(h > 1.5 && h < 2.7);
    }

    #[test]
    fn test_small_wheel_blocked_by_step() {
        let world = RoverWorld::default();
        assert!(world.step_blocks(8.0, 8.6, 0.5));
        assert!(!world.step_blocks(8.0, 8.6, 1.2));
        assert!(!world.step_blocks(8.0, 8.6, 1.4));
    }

    #[test]
    fn test_initial_sensor_reads_limit_on_flat_ground() {
        let plant = RoverPlant::new(RoverWorld::default(), &RobotParameters::default()).unwrap();
        assert!((plant.sensor_distance() - 10.0).abs() < 1e-9);
        assert!(!plant.contacting_wall());
    }

    #[test]
    fn test_baseline_trial_is_deterministic() {
        let sim = RoverSimulator::default();
        let params = RobotParameters::default();
        let settings = SimulationSettings::default();

        let a = sim.run_trial(&params, &settings, false).unwrap();
        let b = sim.run_trial(&params, &settings, false).unwrap();

        assert_eq!(a.len(), settings.sample_count());
        assert_eq!(a.samples, b.samples);
    }

    #[test]
    fn test_full_throttle_hits_wall() {
        let sim = RoverSimulator::default();
        let params = RobotParameters {
            speed_max: 10.0,
            speed_slope: 0.0,
            speed_intercept: 20.0,
            ..Default::default()
        };
        let trace = sim
            .run_trial(&params, &SimulationSettings::default(), false)
            .unwrap();
        assert!(trace.any_contact());
        let last = trace.final_sample().unwrap();
        let limit = 25.0 - params.wheel_radius - params.chassis_length / 2.0;
        assert!((last.chassis_x - limit).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_non_finite_parameters() {
        let params = RobotParameters {
            sensor_limit: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            RoverPlant::new(RoverWorld::default(), &params),
            Err(SimulationError::InvalidParameters(_))
        ));
    }
}
