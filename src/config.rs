use crate::engine::EngineError;
use crate::phylo::INTERNAL_LABEL_PREFIX;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Settings shared by every operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Field separator in rendered reports.
    pub delimiter: String,
    /// Prefix for generated internal node labels.
    pub internal_label_prefix: String,
    /// Seed for randomised operations; `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Digits after the decimal point in reports; `None` prints the shortest
    /// exact form.
    pub precision: Option<usize>,
    /// Bin count used by lineages-through-time when none is requested.
    pub ltt_bins: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delimiter: "\t".to_string(),
            internal_label_prefix: INTERNAL_LABEL_PREFIX.to_string(),
            seed: None,
            precision: None,
            ltt_bins: 20,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = toml::from_str(s).map_err(|e| {
            EngineError::Config(format!("Failed to parse config: {e}"))
        })?;
        if config.ltt_bins == 0 {
            return Err(EngineError::Config("ltt_bins must be positive".to_string()));
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| {
            EngineError::Config(format!("Failed to serialize config: {e}"))
        })
    }

    /// Generator for randomised operations, seeded when a seed is set.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
