//! Ingestion and aggregation layer for the sales insight engine.
//!
//! Responsible for reading a source document into memory, decoding its first
//! sheet into rows, and running the streaming aggregation with progress
//! reporting.

pub mod aggregator;
pub mod analysis;
pub mod progress;
pub mod reader;

pub use insight_core as core;
