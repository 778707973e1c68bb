//! Genome representation and the linear parameter codec.
//!
//! A genome is a fixed-length vector of genes in `[0, 1]`. Gene `i` always
//! maps to field `i` of [`RobotParameters`] through the matching
//! [`ParameterRange`] of a [`ParameterSpec`].

use serde::{Deserialize, Serialize};

/// Number of tunable parameters (and therefore genes).
pub const PARAMETER_COUNT: usize = 8;

/// Gene-order names of the tunable parameters.
pub const PARAMETER_NAMES: [&str; PARAMETER_COUNT] = [
    "wheel_radius",
    "chassis_length",
    "suspension_frequency",
    "suspension_damping",
    "sensor_limit",
    "speed_max",
    "speed_slope",
    "speed_intercept",
];

/// Inclusive real-valued range for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub low: f64,
    pub high: f64,
}

impl ParameterRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Map a gene in `[0, 1]` onto `[low, high]`.
    pub fn decode(&self, gene: f64) -> f64 {
        self.low + (self.high - self.low) * gene
    }

    /// Inverse of [`decode`](Self::decode). A zero-width range encodes to 0.
    pub fn encode(&self, value: f64) -> f64 {
        let width = self.high - self.low;
        if width == 0.0 {
            return 0.0;
        }
        (value - self.low) / width
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }

    pub fn is_valid(&self) -> bool {
        self.low.is_finite() && self.high.is_finite() && self.low <= self.high
    }
}

/// Decoded physical and control parameters of one robot design.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotParameters {
    /// Radius of both wheels.
    pub wheel_radius: f64,
    /// Chassis length; wheels sit at either end.
    pub chassis_length: f64,
    /// Suspension natural frequency (Hz).
    pub suspension_frequency: f64,
    /// Suspension damping ratio.
    pub suspension_damping: f64,
    /// Maximum range of the forward distance sensor.
    pub sensor_limit: f64,
    /// Actuation limit for the wheel angular velocity.
    pub speed_max: f64,
    /// Controller gain on sensor distance.
    pub speed_slope: f64,
    /// Controller offset.
    pub speed_intercept: f64,
}

impl RobotParameters {
    /// Values in gene order.
    pub fn to_array(&self) -> [f64; PARAMETER_COUNT] {
        [
            self.wheel_radius,
            self.chassis_length,
            self.suspension_frequency,
            self.suspension_damping,
            self.sensor_limit,
            self.speed_max,
            self.speed_slope,
            self.speed_intercept,
        ]
    }

    pub fn from_array(values: [f64; PARAMETER_COUNT]) -> Self {
        let [
            wheel_radius,
            chassis_length,
            suspension_frequency,
            suspension_damping,
            sensor_limit,
            speed_max,
            speed_slope,
            speed_intercept,
        ] = values;

        Self {
            wheel_radius,
            chassis_length,
            suspension_frequency,
            suspension_damping,
            sensor_limit,
            speed_max,
            speed_slope,
            speed_intercept,
        }
    }

    /// Signed structural margin: half the chassis length minus the wheel
    /// radius. Negative when the wheels would overlap.
    pub fn wheel_overlap(&self) -> f64 {
        self.chassis_length / 2.0 - self.wheel_radius
    }

    /// Chassis body height derived from the wheel size.
    pub fn chassis_height(&self) -> f64 {
        (1.1 * self.wheel_radius).min(1.0)
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

impl Default for RobotParameters {
    /// Known-good hand-tuned design used to seed the initial population.
    fn default() -> Self {
        Self {
            wheel_radius: 1.2,
            chassis_length: 3.0,
            suspension_frequency: 4.0,
            suspension_damping: 0.7,
            sensor_limit: 10.0,
            speed_max: 3.0,
            speed_slope: 2.0,
            speed_intercept: -15.0,
        }
    }
}

/// Per-parameter ranges defining the genome decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub wheel_radius: ParameterRange,
    pub chassis_length: ParameterRange,
    pub suspension_frequency: ParameterRange,
    pub suspension_damping: ParameterRange,
    pub sensor_limit: ParameterRange,
    pub speed_max: ParameterRange,
    pub speed_slope: ParameterRange,
    pub speed_intercept: ParameterRange,
}

impl Default for ParameterSpec {
    fn default() -> Self {
        Self {
            wheel_radius: ParameterRange::new(0.5, 1.5),
            chassis_length: ParameterRange::new(1.0, 4.0),
            suspension_frequency: ParameterRange::new(1.0, 8.0),
            suspension_damping: ParameterRange::new(0.3, 0.9),
            sensor_limit: ParameterRange::new(1.0, 15.0),
            speed_max: ParameterRange::new(0.0, 10.0),
            speed_slope: ParameterRange::new(0.0, 10.0),
            speed_intercept: ParameterRange::new(-20.0, 20.0),
        }
    }
}

impl ParameterSpec {
    /// Ranges in gene order.
    pub fn ranges(&self) -> [ParameterRange; PARAMETER_COUNT] {
        [
            self.wheel_radius,
            self.chassis_length,
            self.suspension_frequency,
            self.suspension_damping,
            self.sensor_limit,
            self.speed_max,
            self.speed_slope,
            self.speed_intercept,
        ]
    }

    /// Number of genes a genome for this spec carries.
    pub fn len(&self) -> usize {
        PARAMETER_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Decode a genome into typed parameters.
    ///
    /// Missing trailing genes decode as 0 (the range's low end).
    pub fn decode(&self, genome: &Genome) -> RobotParameters {
        let ranges = self.ranges();
        let mut values = [0.0; PARAMETER_COUNT];
        for (i, (value, range)) in values.iter_mut().zip(ranges.iter()).enumerate() {
            *value = range.decode(genome.gene(i));
        }
        RobotParameters::from_array(values)
    }

    /// Encode literal parameter values into a genome.
    pub fn encode(&self, params: &RobotParameters) -> Genome {
        let genes = self
            .ranges()
            .iter()
            .zip(params.to_array())
            .map(|(range, value)| range.encode(value))
            .collect();
        Genome::new(genes)
    }
}

/// Normalized parameter encoding: one gene per parameter, each in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Genome {
    genes: Vec<f64>,
}

impl Genome {
    pub fn new(genes: Vec<f64>) -> Self {
        Self { genes }
    }

    pub fn genes(&self) -> &[f64] {
        &self.genes
    }

    pub fn genes_mut(&mut self) -> &mut [f64] {
        &mut self.genes
    }

    pub fn gene(&self, index: usize) -> f64 {
        self.genes.get(index).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// True when every gene lies in `[0, 1]`.
    pub fn is_normalized(&self) -> bool {
        self.genes.iter().all(|g| (0.0..=1.0).contains(g))
    }
}

impl From<Vec<f64>> for Genome {
    fn from(genes: Vec<f64>) -> Self {
        Self::new(genes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_midpoint() {
        let range = ParameterRange::new(0.0, 10.0);
        assert!((range.decode(0.5) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_range_encodes_to_zero() {
        let range = ParameterRange::new(3.0, 3.0);
        assert_eq!(range.encode(3.0), 0.0);
        assert_eq!(range.decode(0.7), 3.0);
    }

    #[test]
    fn test_baseline_roundtrip() {
        let spec = ParameterSpec::default();
        let baseline = RobotParameters::default();
        let genome = spec.encode(&baseline);

        assert_eq!(genome.len(), PARAMETER_COUNT);
        assert!(genome.is_normalized());

        let decoded = spec.decode(&genome);
        for (a, b) in decoded.to_array().iter().zip(baseline.to_array()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_wheel_overlap() {
        let params = RobotParameters {
            wheel_radius: 2.0,
            chassis_length: 2.0,
            ..Default::default()
        };
        assert!((params.wheel_overlap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_genome_serializes_as_plain_list() {
        let genome = Genome::new(vec![0.25, 0.5]);
        assert_eq!(serde_json::to_string(&genome).unwrap(), "[0.25,0.5]");
    }

    proptest! {
        #[test]
        fn prop_value_roundtrip(low in -100.0f64..100.0, width in 0.01f64..100.0, t in 0.0f64..=1.0) {
            let range = ParameterRange::new(low, low + width);
            let value = range.decode(t);
            prop_assert!((range.decode(range.encode(value)) - value).abs() < 1e-9);
        }

        #[test]
        fn prop_genome_roundtrip(genes in proptest::collection::vec(0.0f64..=1.0, PARAMETER_COUNT)) {
            let spec = ParameterSpec::default();
            let genome = Genome::new(genes);
            let back = spec.encode(&spec.decode(&genome));
            for (a, b) in genome.genes().iter().zip(back.genes()) {
                prop_assert!((a - b).abs() < 1e-9);
            }
        }
    }
}
