//! Core types and pure logic for the sales insight engine.
//!
//! Holds the cell model, header-column resolution, invoice-date
//! normalisation, the aggregation result and its month drill-down view,
//! plus configuration and error types shared by the other crates.

pub mod columns;
pub mod dates;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;
pub mod view;
