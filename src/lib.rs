//! RateFill Library
//!
//! Daily exchange-rate history filled from sparse sources, plus live P2P
//! market snapshots

pub mod config;
pub mod error;
pub mod persistence;
pub mod pipeline;
pub mod snapshot;
pub mod sources;
pub mod timeline;
pub mod types;
