//! Configuration management for Shuttle GW
//!
//! Handles loading and validation of the YAML configuration file.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

use crate::geometry::ShuttleModel;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub jog: JogConfig,
    #[serde(default)]
    pub variables: VariablesConfig,
}

/// Which device this instance represents
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SurfaceConfig {
    #[serde(default = "default_surface_id")]
    pub id: String,
    #[serde(default = "default_model")]
    pub model: ShuttleModel,
}

/// Jog wheel behaviour
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct JogConfig {
    /// How long the jog variable holds ±1 before returning to 0
    #[serde(default = "default_jog_pulse_ms")]
    pub pulse_ms: u64,
}

/// Names of the continuous value channels sent to the host
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct VariablesConfig {
    #[serde(default = "default_jog_variable")]
    pub jog: String,
    #[serde(default = "default_shuttle_variable")]
    pub shuttle: String,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse and validate YAML content
    pub fn parse(content: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.variables.jog.trim().is_empty() {
            bail!("variables.jog must not be empty");
        }
        if self.variables.shuttle.trim().is_empty() {
            bail!("variables.shuttle must not be empty");
        }
        Ok(())
    }
}

impl JogConfig {
    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            id: default_surface_id(),
            model: default_model(),
        }
    }
}

impl Default for JogConfig {
    fn default() -> Self {
        Self {
            pulse_ms: default_jog_pulse_ms(),
        }
    }
}

impl Default for VariablesConfig {
    fn default() -> Self {
        Self {
            jog: default_jog_variable(),
            shuttle: default_shuttle_variable(),
        }
    }
}

// Default value functions
fn default_surface_id() -> String { "contourshuttle:0".to_string() }
fn default_model() -> ShuttleModel { ShuttleModel::ShuttleProV2 }
fn default_jog_pulse_ms() -> u64 { 20 }
fn default_jog_variable() -> String { "jogValueVariable".to_string() }
fn default_shuttle_variable() -> String { "shuttleValueVariable".to_string() }
