pub mod cancel;
pub mod centrality;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod motif;
pub mod null_model;
pub mod query;
pub mod store;

pub use cancel::CancellationFlag;
pub use centrality::{BetweennessConfig, CentralityEngine, PageRankConfig};
pub use config::AppConfig;
pub use error::{LedgerError, LedgerResult};
pub use model::*;
pub use motif::{MotifCensus, MotifOccurrence};
pub use null_model::{permute_timestamps, NullModel, NullModelComparison};
pub use store::{InvalidRecordPolicy, TemporalGraph, TemporalView, WindowView};
