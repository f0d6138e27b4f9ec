use crate::centrality::{BetweennessConfig, PageRankConfig};
use crate::error::{LedgerError, LedgerResult};
use crate::store::InvalidRecordPolicy;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ingest: IngestConfig,
    pub motifs: MotifConfig,
    pub centrality: CentralityConfig,
    pub null_model: NullModelConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub invalid_records: InvalidRecordPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotifConfig {
    /// Maximum span, in seconds, between the first and last edge of a motif.
    pub deltas: Vec<i64>,
}

impl Default for MotifConfig {
    fn default() -> Self {
        // one hour, one day
        Self {
            deltas: vec![3600, 86_400],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralityConfig {
    pub pagerank: PageRankConfig,
    pub betweenness: BetweennessConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullModelConfig {
    pub seed: u64,
    pub time_field: String,
}

impl Default for NullModelConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            time_field: "timestamp".to_string(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> LedgerResult<()> {
        if let Some(delta) = self.motifs.deltas.iter().find(|d| **d < 0) {
            return Err(LedgerError::ConfigError(format!(
                "motifs.deltas must be non-negative, got {delta}"
            )));
        }
        self.centrality
            .pagerank
            .validate()
            .and_then(|_| self.centrality.betweenness.validate())
            .map_err(|err| LedgerError::ConfigError(err.to_string()))?;
        if self.null_model.time_field.trim().is_empty() {
            return Err(LedgerError::ConfigError(
                "null_model.time_field must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Layered configuration: `ledgergraph.toml` in the working directory, then
/// the explicit file, then `LEDGERGRAPH__SECTION__KEY` environment variables.
pub fn load_config(path: Option<&Path>) -> LedgerResult<AppConfig> {
    let mut builder = Config::builder().add_source(File::with_name("ledgergraph").required(false));

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    let config = builder
        .add_source(
            Environment::with_prefix("LEDGERGRAPH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("motifs.deltas"),
        )
        .build()
        .map_err(|err| LedgerError::ConfigError(err.to_string()))?;

    let parsed: AppConfig = config
        .try_deserialize()
        .map_err(|err| LedgerError::ConfigError(err.to_string()))?;

    parsed.validate()?;
    Ok(parsed)
}
