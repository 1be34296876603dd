//! Aggregator configuration

use decoupled_core::{Error, Mode, Result};
use serde::{Deserialize, Serialize};

/// Settings shared by [`PairwiseAggregator`](crate::PairwiseAggregator) and
/// [`BatchRunner`](crate::BatchRunner)
///
/// Missing fields take their defaults when deserialized:
///
/// ```rust
/// use decoupled_sum::{AggregatorConfig, Mode};
///
/// let config = AggregatorConfig::from_json(r#"{ "mode": "asymmetric" }"#).unwrap();
/// assert_eq!(config.mode, Mode::Asymmetric);
/// assert_eq!(config.chunk_rows, None);
/// assert!(!config.reject_non_finite);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregatorConfig {
    /// Pair-enumeration strategy
    pub mode: Mode,
    /// Rows of the outer index per unit of work; `None` lets the engine choose
    pub chunk_rows: Option<usize>,
    /// Treat NaN or infinite kernel values as kernel failures
    pub reject_non_finite: bool,
}

impl AggregatorConfig {
    /// Default settings with the given mode
    pub fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a JSON document
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings no computation can run with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_rows == Some(0) {
            return Err(Error::InvalidParameter(
                "chunk_rows must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
