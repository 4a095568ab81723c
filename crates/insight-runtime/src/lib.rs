//! Runtime layer for the sales insight engine.
//!
//! Decides where a run executes (isolated background worker or inline on
//! the caller's task) and delivers its progress and result messages.

pub mod dispatcher;
pub mod messages;
pub mod worker;

pub use insight_core as core;
pub use insight_data as data;
