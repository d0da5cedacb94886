//! TOML-based balance configuration and preset definitions.
//!
//! The stream catalogue (id, unit, conversion factor) and the demand-detail
//! mode are resolved once here, before any computation, instead of being
//! re-derived per call from runtime-constructed schemas.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::units::Unit;

/// Demand-detail mode of a balance evaluation.
///
/// A configuration switch, not two algorithms: the simplified mode applies
/// exactly the same ratio function to the sums of all per-stream supply and
/// demand instead of applying it stream by stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandDetailMode {
    /// Every consumer declares demand broken down by stream.
    PerStream,
    /// Only a single total demand is known; the resulting ratio is not
    /// stream-specific and the result records that caveat.
    Aggregate,
}

impl fmt::Display for DemandDetailMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemandDetailMode::PerStream => write!(f, "per_stream"),
            DemandDetailMode::Aggregate => write!(f, "aggregate"),
        }
    }
}

/// One configured stream: identifier, unit, and the scalar factor applied
/// when aggregating its contributors.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfig {
    /// Stream identifier, unique within the configuration.
    pub id: String,
    /// Unit the stream totals are expressed in.
    pub unit: Unit,
    /// Scalar conversion factor applied to every contributor series.
    #[serde(default = "default_conversion_factor")]
    pub conversion_factor: f64,
}

fn default_conversion_factor() -> f64 {
    1.0
}

/// Top-level balance configuration parsed from TOML.
///
/// Load from TOML with [`BalanceConfig::from_toml_file`] or use one of the
/// built-in presets ([`BalanceConfig::from_preset`]).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BalanceConfig {
    /// Global balance settings.
    #[serde(default)]
    pub balance: BalanceSettings,
    /// Configured streams.
    #[serde(default, rename = "stream")]
    pub streams: Vec<StreamConfig>,
}

/// Global balance settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BalanceSettings {
    /// Demand-detail mode.
    pub demand_detail: DemandDetailMode,
}

impl Default for BalanceSettings {
    fn default() -> Self {
        Self {
            demand_detail: DemandDetailMode::PerStream,
        }
    }
}

impl BalanceConfig {
    /// Returns the energy preset: three energy carriers balanced per stream.
    pub fn energy() -> Self {
        Self {
            balance: BalanceSettings::default(),
            streams: vec![
                StreamConfig {
                    id: "electricity".to_string(),
                    unit: Unit::TerawattHour,
                    conversion_factor: 1.0,
                },
                StreamConfig {
                    id: "hydrogen".to_string(),
                    unit: Unit::TerawattHour,
                    conversion_factor: 1.0,
                },
                StreamConfig {
                    id: "biogas".to_string(),
                    unit: Unit::TerawattHour,
                    conversion_factor: 1.0,
                },
            ],
        }
    }

    /// Returns the CCUS preset: captured carbon balanced against storage
    /// capacity, in megatonnes.
    pub fn ccus() -> Self {
        Self {
            balance: BalanceSettings::default(),
            streams: vec![
                StreamConfig {
                    id: "carbon_captured".to_string(),
                    unit: Unit::Megatonne,
                    conversion_factor: 1.0,
                },
                StreamConfig {
                    id: "carbon_storage".to_string(),
                    unit: Unit::Megatonne,
                    conversion_factor: 1.0,
                },
            ],
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["energy", "ccus"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "energy" => Ok(Self::energy()),
            "ccus" => Ok(Self::ccus()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.streams.is_empty() {
            errors.push(ConfigError {
                field: "stream".into(),
                message: "at least one stream must be configured".into(),
            });
        }

        let mut seen = BTreeMap::new();
        for (i, stream) in self.streams.iter().enumerate() {
            if stream.id.is_empty() {
                errors.push(ConfigError {
                    field: format!("stream[{i}].id"),
                    message: "must not be empty".into(),
                });
            }
            if let Some(first) = seen.insert(stream.id.clone(), i) {
                errors.push(ConfigError {
                    field: format!("stream[{i}].id"),
                    message: format!("duplicate id \"{}\" (first at stream[{first}])", stream.id),
                });
            }
            if !stream.conversion_factor.is_finite() || stream.conversion_factor <= 0.0 {
                errors.push(ConfigError {
                    field: format!("stream[{i}].conversion_factor"),
                    message: "must be finite and > 0".into(),
                });
            }
        }

        errors
    }

    /// Looks up the configuration entry for a stream id.
    pub fn stream(&self, id: &str) -> Option<&StreamConfig> {
        self.streams.iter().find(|s| s.id == id)
    }
}
