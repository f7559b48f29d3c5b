//! Map generation parameters and configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::seeds::WorldSeeds;

/// Parameters for one map regeneration.
///
/// Loaded from JSON with every field optional; missing fields take the
/// defaults below.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Master seed for noise, peaks and mesh jitter
    pub seed: u64,
    /// Distance between mesh points in world units (world is 1000 across)
    pub spacing: f64,
    /// Lattice jitter as a fraction of half the spacing
    pub jitter: f64,
    /// Spacing of the peak lattice in normalized [-1, 1] coordinates
    pub peak_spacing: f64,
    /// Elevation forced onto dry-looking regions that touch water.
    /// Must be negative so those regions count as water.
    pub water_epsilon: f32,
    /// Minimum side flow for a triangle to count as carrying a river
    pub river_min_flow: f32,
    /// Moisture at sea level; falls off with sqrt(|elevation|)
    pub moisture_base: f32,
    /// Pin single sub-seeds instead of deriving them from `seed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh_seed: Option<u64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            seed: 42,
            spacing: 5.0,
            jitter: 0.4,
            peak_spacing: 0.07,
            water_epsilon: -0.001,
            river_min_flow: 3.0,
            moisture_base: 0.8,
            noise_seed: None,
            peak_seed: None,
            mesh_seed: None,
        }
    }
}

impl GenerationParams {
    /// Read parameters from a JSON file, filling unspecified fields with defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let params: Self = serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Sub-seeds derived from `seed`, with any pinned ones substituted.
    pub fn world_seeds(&self) -> WorldSeeds {
        let mut builder = WorldSeeds::builder(self.seed);
        if let Some(seed) = self.noise_seed {
            builder = builder.noise(seed);
        }
        if let Some(seed) = self.peak_seed {
            builder = builder.peaks(seed);
        }
        if let Some(seed) = self.mesh_seed {
            builder = builder.mesh(seed);
        }
        builder.build()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.spacing > 0.0) {
            return Err(ConfigError::Invalid(format!("spacing must be positive, got {}", self.spacing)));
        }
        if !(self.peak_spacing > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "peak_spacing must be positive, got {}",
                self.peak_spacing
            )));
        }
        if !(self.water_epsilon < 0.0) {
            return Err(ConfigError::Invalid(format!(
                "water_epsilon must be negative, got {}",
                self.water_epsilon
            )));
        }
        Ok(())
    }
}

/// Errors from loading a configuration file
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "config parse error: {}", e),
            ConfigError::Invalid(e) => write!(f, "invalid config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}
