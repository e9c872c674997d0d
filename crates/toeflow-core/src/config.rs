//! Shared configuration for fee totals.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// GST rate applied to fee subtotals unless configured otherwise.
pub const DEFAULT_TAX_RATE: f64 = 0.15;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("tax rate must be a finite value in [0, 1), got {0}")]
    TaxRate(f64),
}

/// Settings consumed by review sessions and author edits when recomputing totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
}

fn default_tax_rate() -> f64 {
    DEFAULT_TAX_RATE
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
        }
    }
}

impl ReviewConfig {
    /// Build a config with an explicit tax rate, rejecting nonsensical values.
    pub fn with_tax_rate(tax_rate: f64) -> Result<Self, ConfigError> {
        let config = Self { tax_rate };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tax_rate.is_finite() && (0.0..1.0).contains(&self.tax_rate) {
            Ok(())
        } else {
            Err(ConfigError::TaxRate(self.tax_rate))
        }
    }
}
