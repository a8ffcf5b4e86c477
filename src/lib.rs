//! Retell: Difficulty-Graded Content Rewrites
//!
//! A batch pipeline that rewrites stored textbook units into three
//! difficulty-graded variants (simple, normal, advanced) via an external
//! generative provider, persisting each variant idempotently.

pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod store;
pub mod types;
