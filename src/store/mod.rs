pub mod graph;
pub mod view;

pub use graph::{
    GraphSummary, IngestReport, InvalidRecordPolicy, RejectedRecord, TemporalGraph, TimedEdge,
};
pub use view::{TemporalView, WindowView};
