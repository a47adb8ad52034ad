//! Render configuration.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Light-transport algorithm used for the final image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracerKind {
    /// Direct lighting plus perfect mirror and dielectric recursion.
    Whitted,
    /// Monte-Carlo path tracing with one hemisphere sample per bounce.
    MonteCarlo,
    /// Photon mapping (global map plus optional caustics map).
    Jensen,
}

impl TracerKind {
    pub fn name(&self) -> &'static str {
        match self {
            TracerKind::Whitted => "whitted",
            TracerKind::MonteCarlo => "monte_carlo",
            TracerKind::Jensen => "jensen",
        }
    }
}

impl fmt::Display for TracerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TracerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whitted" => Ok(TracerKind::Whitted),
            "monte_carlo" => Ok(TracerKind::MonteCarlo),
            "jensen" => Ok(TracerKind::Jensen),
            other => Err(ConfigError::UnknownTracer(other.to_string())),
        }
    }
}

/// Errors found while validating a [`RenderConfig`].
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Image dimensions must be non-zero (got {width}x{height})")]
    ZeroDimension { width: u32, height: u32 },

    #[error("Samples per pixel must be at least 1")]
    ZeroSamples,

    #[error("Maximum recursion depth must be at least 1")]
    ZeroMaxDepth,

    #[error("Photons per light must be at least 1")]
    ZeroPhotons,

    #[error("Search radius must be positive (got {0})")]
    InvalidRadius(f32),

    #[error("Cone filter constant must be >= 1 (got {0})")]
    InvalidConeFilter(f32),

    #[error("Photon gather count must be at least 1")]
    ZeroGatherCount,

    #[error("Field of view must be in (0, 180) degrees (got {0})")]
    InvalidFov(f32),

    #[error("Unknown tracer '{0}' (expected whitted, monte_carlo or jensen)")]
    UnknownTracer(String),
}

/// Parameters of a radiance estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatherSettings {
    /// Initial search radius.
    pub radius: f32,
    /// Maximum number of photons used per estimate.
    pub max_photons: usize,
    /// Cone filter constant `k >= 1`.
    pub cone_k: f32,
}

impl Default for GatherSettings {
    fn default() -> Self {
        Self {
            radius: 0.5,
            max_photons: 500,
            cone_k: 1.0,
        }
    }
}

/// Parameters of one photon emission pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionSettings {
    pub photons_per_light: usize,
    pub max_depth: u32,
    /// Build the caustics map: aim at specular figures and only store
    /// photons that were specularly scattered.
    pub caustics: bool,
    /// Keep photons whose every bounce was specular out of a global map.
    /// Set when a caustics map carries them instead.
    pub exclude_caustic_paths: bool,
    pub seed: u64,
}

/// Render configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Samples per pixel for anti-aliasing
    pub samples_per_pixel: u32,
    /// Maximum ray (and photon) bounce depth
    pub max_depth: u32,
    /// Field of view override in degrees; the scene camera's otherwise.
    pub fov: Option<f32>,
    pub tracer: TracerKind,
    pub photons_per_light: usize,
    pub gather: GatherSettings,
    /// Also build a caustics photon map.
    pub caustics: bool,
    /// Seed for every random stream of the render.
    pub seed: u64,
    pub bucket_size: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            samples_per_pixel: 4,
            max_depth: 5,
            fov: None,
            tracer: TracerKind::Whitted,
            photons_per_light: 100_000,
            gather: GatherSettings::default(),
            caustics: false,
            seed: 0,
            bucket_size: crate::bucket::DEFAULT_BUCKET_SIZE,
        }
    }
}

impl RenderConfig {
    /// Check every parameter before any work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 || self.bucket_size == 0 {
            return Err(ConfigError::ZeroDimension {
                width: self.width,
                height: self.height,
            });
        }
        if self.samples_per_pixel == 0 {
            return Err(ConfigError::ZeroSamples);
        }
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroMaxDepth);
        }
        if let Some(fov) = self.fov {
            if !(fov > 0.0 && fov < 180.0) {
                return Err(ConfigError::InvalidFov(fov));
            }
        }
        if self.tracer == TracerKind::Jensen {
            if self.photons_per_light == 0 {
                return Err(ConfigError::ZeroPhotons);
            }
            if !(self.gather.radius > 0.0) {
                return Err(ConfigError::InvalidRadius(self.gather.radius));
            }
            if !(self.gather.cone_k >= 1.0) {
                return Err(ConfigError::InvalidConeFilter(self.gather.cone_k));
            }
            if self.gather.max_photons == 0 {
                return Err(ConfigError::ZeroGatherCount);
            }
        }
        Ok(())
    }

    /// Settings for the global (`caustics == false`) or caustics pass.
    pub fn emission_settings(&self, caustics: bool) -> EmissionSettings {
        EmissionSettings {
            photons_per_light: self.photons_per_light,
            max_depth: self.max_depth,
            caustics,
            exclude_caustic_paths: !caustics && self.caustics,
            // Separate streams for the two passes
            seed: if caustics {
                self.seed ^ 0x5eed_cafe
            } else {
                self.seed
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jensen() -> RenderConfig {
        RenderConfig {
            tracer: TracerKind::Jensen,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_is_valid() {
        assert_eq!(RenderConfig::default().validate(), Ok(()));
        assert_eq!(jensen().validate(), Ok(()));
    }

    #[test]
    fn test_zero_dimensions() {
        let config = RenderConfig {
            width: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDimension {
                width: 0,
                height: 480
            })
        );
    }

    #[test]
    fn test_zero_samples_and_depth() {
        let config = RenderConfig {
            samples_per_pixel: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroSamples));

        let config = RenderConfig {
            max_depth: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxDepth));
    }

    #[test]
    fn test_photon_settings_only_checked_for_jensen() {
        let mut config = RenderConfig {
            photons_per_light: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Ok(()));

        config.tracer = TracerKind::Jensen;
        assert_eq!(config.validate(), Err(ConfigError::ZeroPhotons));
    }

    #[test]
    fn test_gather_validation() {
        let mut config = jensen();
        config.gather.radius = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidRadius(0.0)));

        let mut config = jensen();
        config.gather.cone_k = 0.5;
        assert_eq!(config.validate(), Err(ConfigError::InvalidConeFilter(0.5)));

        let mut config = jensen();
        config.gather.max_photons = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroGatherCount));
    }

    #[test]
    fn test_fov_validation() {
        let config = RenderConfig {
            fov: Some(180.0),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidFov(180.0)));
    }

    #[test]
    fn test_tracer_kind_parse() {
        assert_eq!("whitted".parse(), Ok(TracerKind::Whitted));
        assert_eq!("monte_carlo".parse(), Ok(TracerKind::MonteCarlo));
        assert_eq!("jensen".parse(), Ok(TracerKind::Jensen));
        assert!("raster".parse::<TracerKind>().is_err());
        assert_eq!(TracerKind::MonteCarlo.to_string(), "monte_carlo");
    }

    #[test]
    fn test_emission_settings() {
        let config = jensen();
        let global = config.emission_settings(false);
        let caustics = config.emission_settings(true);
        assert!(!global.caustics);
        assert!(caustics.caustics);
        assert!(!global.exclude_caustic_paths);

        let with_caustics = RenderConfig {
            caustics: true,
            ..jensen()
        };
        assert!(with_caustics.emission_settings(false).exclude_caustic_paths);
        assert!(!with_caustics.emission_settings(true).exclude_caustic_paths);
        assert_ne!(global.seed, caustics.seed);
        assert_eq!(global.photons_per_light, config.photons_per_light);
    }
}
