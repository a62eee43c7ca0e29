// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod cli;
pub mod collect;
pub mod config;
pub mod enrich;
pub mod error;
pub mod model;
pub mod pacing;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod track;

// ---- Re-exports for stable public API ----
pub use crate::collect::{Collector, CollectorSet};
pub use crate::enrich::{Analyzer, Enricher, Transcriber};
pub use crate::error::{CollectError, CycleError, EnrichError, StoreError};
pub use crate::model::{AnalysisResult, Item, Platform, Sentiment, Source};
pub use crate::service::TrackerService;
pub use crate::store::RecordStore;
pub use crate::track::{RunReport, Tracker, TrackerSettings};
