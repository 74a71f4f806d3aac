//! # quality-collector
//!
//! Collects software-quality metrics from external tools (CI servers,
//! scanners, manual input) and keeps a deduplicated, status-evaluated
//! measurement log per metric.
//!
//! ## Usage
//!
//! ```bash
//! quality-collector -c quality-collector.yaml collect [--metric ID]...
//! quality-collector history --metric ID [--json]
//! ```
//!
//! ## Modules
//!
//! - `collector` - Source adapter contract and the fetch orchestrator
//! - `adapters` - Built-in source adapters
//! - `normalize` - Entity filtering and stable key derivation
//! - `aggregation` - Combining per-source values into a metric value
//! - `status` - Status evaluation against targets and technical debt
//! - `measurement_log` - Append-only log with annotation carry-forward
//! - `storage` - Memory and file measurement stores
//! - `pipeline` - One collection cycle end to end
//! - `testing` - Stub HTTP and fixtures for tests
pub mod adapters;
pub mod aggregation;
pub mod app;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod measurement_log;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod status;
pub mod storage;

pub mod testing;

pub use error::{AppResult, ErrorCode, LibResult, QualityError, Result};
