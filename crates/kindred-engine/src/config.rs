//! Configuration for engine operations
//!
//! Family-name length, request purging on removal, and the geometry used by
//! tree projection.

use crate::EngineError;
use kindred_domain::LayoutParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the kinship engine
///
/// Every field has a default, so a TOML document only needs the keys it
/// changes.
///
/// # Examples
///
/// ```
/// use kindred_engine::EngineConfig;
///
/// let config = EngineConfig::from_toml_str("cluster_name_digits = 6").unwrap();
/// assert_eq!(config.cluster_name_digits, 6);
/// assert!(config.purge_requests_on_remove);
/// assert_eq!(config.layout.radius, 35.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of digits in a generated family name
    /// Default: 10
    pub cluster_name_digits: u32,

    /// Delete accepted and rejected requests that reference a removed person
    /// Default: true
    pub purge_requests_on_remove: bool,

    /// Tree projection geometry
    pub layout: LayoutSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cluster_name_digits: 10,
            purge_requests_on_remove: true,
            layout: LayoutSettings::default(),
        }
    }
}

/// Tree projection geometry, in percentage coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// X coordinate of the center person
    pub origin_x: f64,
    /// Y coordinate of the center person
    pub origin_y: f64,
    /// Distance of each relative from the center
    pub radius: f64,
    /// Angle between relatives of the same type, in degrees
    pub fan_step_degrees: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        let params = LayoutParams::default();
        Self {
            origin_x: params.origin_x,
            origin_y: params.origin_y,
            radius: params.radius,
            fan_step_degrees: params.fan_step_degrees,
        }
    }
}

impl LayoutSettings {
    /// Convert into projection parameters
    pub fn params(&self) -> LayoutParams {
        LayoutParams {
            origin_x: self.origin_x,
            origin_y: self.origin_y,
            radius: self.radius,
            fan_step_degrees: self.fan_step_degrees,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| EngineError::Config(format!("Failed to parse engine config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(1..=18).contains(&self.cluster_name_digits) {
            return Err(EngineError::Config(format!(
                "cluster_name_digits must be between 1 and 18, got {}",
                self.cluster_name_digits
            )));
        }
        if self.layout.radius.is_nan() || self.layout.radius <= 0.0 {
            return Err(EngineError::Config(format!(
                "layout.radius must be positive, got {}",
                self.layout.radius
            )));
        }
        Ok(())
    }
}
