use crate::{InvalidArgument, TerrainError};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

/// Tunables for profile construction.
///
/// Every field has a default, so a config file only needs to name
/// the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Default distance between raw samples (meters).
    pub sampling_step_m: f64,

    /// Lower bound on the raw sample count.
    pub min_samples: usize,

    /// Upper bound on the raw sample count.
    pub max_samples: usize,

    /// Number of points in a finished profile.
    pub output_samples: usize,

    /// Start and end closer than this (degrees) are rejected.
    pub min_separation_deg: f64,

    /// Resolver threads per available core.
    pub workers_per_core: usize,

    pub smoothing: SmoothingConfig,

    pub crossing: CrossingConfig,

    pub resolver: ResolverConfig,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            sampling_step_m: 10.0,
            min_samples: 100,
            max_samples: 20_000,
            output_samples: 400,
            min_separation_deg: 1e-5,
            workers_per_core: 2,
            smoothing: SmoothingConfig::default(),
            crossing: CrossingConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

impl ProfileConfig {
    /// Loads a config from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, TerrainError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Rejects values no profile can be built with.
    pub fn validate(&self) -> Result<(), InvalidArgument> {
        if self.output_samples < 2 {
            return Err(InvalidArgument::OutputSamples(self.output_samples));
        }
        if !(self.sampling_step_m.is_finite() && self.sampling_step_m > 0.0) {
            return Err(InvalidArgument::NonPositiveStep);
        }
        for (name, value) in [
            ("min_separation_deg", self.min_separation_deg),
            ("crossing.cluster_radius_m", self.crossing.cluster_radius_m),
            ("crossing.min_gap_m", self.crossing.min_gap_m),
            ("crossing.envelope_pad_deg", self.crossing.envelope_pad_deg),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(InvalidArgument::Config(name));
            }
        }
        let SmoothingConfig { window, order } = self.smoothing;
        if window % 2 == 0 {
            return Err(InvalidArgument::EvenWindow(window));
        }
        if order >= window {
            return Err(InvalidArgument::OrderTooHigh { window, order });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Odd filter window length (samples).
    pub window: usize,

    /// Local polynomial order.
    pub order: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window: 61,
            order: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossingConfig {
    /// Raw crossings within this distance of the last accepted one
    /// are merged (meters).
    pub cluster_radius_m: f64,

    /// Minimum distance between two flagged output samples (meters).
    pub min_gap_m: f64,

    /// Padding applied to the path envelope when gathering
    /// candidate isolines (degrees).
    pub envelope_pad_deg: f64,
}

impl Default for CrossingConfig {
    fn default() -> Self {
        Self {
            cluster_radius_m: 20.0,
            min_gap_m: 50.0,
            envelope_pad_deg: 1e-5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    /// Containment banding between nested polygons.
    Banding,

    /// Inverse distance weighting over nearby isolines.
    Idw,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub kind: ResolverKind,

    /// Vertical distance between consecutive levels (meters).
    pub step_height_m: f64,

    /// A point this close to an isoline takes its elevation
    /// (degrees).
    pub on_line_tolerance_deg: f64,

    /// Isolines further away than this are ignored (degrees).
    pub search_radius_deg: f64,

    /// Maximum number of isolines blended by IDW.
    pub neighbors: usize,

    /// Padding for the coverage pre-check (degrees).
    pub coverage_pad_deg: f64,

    /// Memoize resolved elevations.
    pub cache: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            kind: ResolverKind::Banding,
            step_height_m: 50.0,
            on_line_tolerance_deg: 1e-5,
            search_radius_deg: 1e-3,
            neighbors: 3,
            coverage_pad_deg: 1e-3,
            cache: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ProfileConfig, ResolverKind};
    use crate::InvalidArgument;

    #[test]
    fn test_partial_override() {
        let json = r#"{
            "sampling_step_m": 25.0,
            "smoothing": { "window": 21 },
            "resolver": { "kind": "idw" }
        }"#;
        let config: ProfileConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.sampling_step_m, 25.0);
        assert_eq!(config.smoothing.window, 21);
        assert_eq!(config.smoothing.order, 3);
        assert_eq!(config.resolver.kind, ResolverKind::Idw);
        assert_eq!(config.resolver.neighbors, 3);
        assert_eq!(config.output_samples, 400);
    }

    #[test]
    fn test_validate() {
        assert_eq!(ProfileConfig::default().validate(), Ok(()));

        let mut config = ProfileConfig::default();
        config.output_samples = 1;
        assert_eq!(config.validate(), Err(InvalidArgument::OutputSamples(1)));

        let mut config = ProfileConfig::default();
        config.sampling_step_m = 0.0;
        assert_eq!(config.validate(), Err(InvalidArgument::NonPositiveStep));

        let mut config = ProfileConfig::default();
        config.crossing.min_gap_m = f64::NAN;
        assert_eq!(
            config.validate(),
            Err(InvalidArgument::Config("crossing.min_gap_m"))
        );

        let mut config = ProfileConfig::default();
        config.smoothing.window = 60;
        assert_eq!(config.validate(), Err(InvalidArgument::EvenWindow(60)));
        config.smoothing.window = 3;
        assert_eq!(
            config.validate(),
            Err(InvalidArgument::OrderTooHigh { window: 3, order: 3 })
        );
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("terrain-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "output_samples": 200 }"#).unwrap();
        let config = ProfileConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.output_samples, 200);
        assert_eq!(config.crossing, ProfileConfig::default().crossing);

        assert!(ProfileConfig::from_json_file(&path).is_err());
    }
}
