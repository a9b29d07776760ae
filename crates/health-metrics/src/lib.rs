//! Health Metrics
//!
//! Provides the timestamped indicator snapshot sampled on every monitoring
//! tick, and the contract for the external source that produces it.

pub mod error;
pub mod snapshot;
pub mod source;

pub use error::CollectionError;
pub use snapshot::{Indicator, IndicatorKind, MetricSnapshot};
pub use source::{
    collect_bounded, Collection, JsonFileSource, MetricsSource, ScriptedSource, StaticSource,
    DEFAULT_COLLECTION_TIMEOUT,
};
