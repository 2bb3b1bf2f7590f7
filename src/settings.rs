//! Persistent reconciler settings

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::util::{Precision, Result};

/// Defaults applied to newly created transforms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Reconciler
    pub push_to_prim: bool,
    pub read_animated_values: bool,

    // Op authoring
    pub insert_precision: Precision,
    pub pivot_tolerance: f64,

    // Logging (tracing env-filter directive)
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            push_to_prim: false,
            read_animated_values: true,
            insert_precision: Precision::Float,
            pivot_tolerance: 1e-6,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut settings: Self = serde_json::from_str(&text)?;

        if !(settings.pivot_tolerance.is_finite() && settings.pivot_tolerance >= 0.0) {
            tracing::warn!("invalid pivot_tolerance {}, using default", settings.pivot_tolerance);
            settings.pivot_tolerance = Self::default().pivot_tolerance;
        }

        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
