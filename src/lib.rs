//! Listening-session analysis for streaming history exports.
//!
//! Core modules:
//! - [`session`] - Gap-based session segmentation
//! - [`features`] - Per-session behavioral feature extraction
//! - [`cluster`] - Seeded k-means with silhouette model selection
//! - [`report`] - Summary, centroid, and assignment query shapes
//! - [`pipeline`] - Per-invocation analysis context
//!
//! ### Supporting Modules
//!
//! - [`event`] - Export parsing and the play-event record
//! - [`cache`] - Digest-keyed result cache
//! - [`config`] - Configuration and data directory management
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use replay::config::AnalysisConfig;
//! use replay::pipeline::AnalysisContext;
//! use std::path::Path;
//!
//! let ctx = AnalysisContext::load(Path::new("/exports/spotify"), AnalysisConfig::default())?;
//! let summary = ctx.summary();
//! println!("{} sessions in {} clusters", summary.total_sessions, summary.n_clusters);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Pipeline
//!
//! Control flow is one-directional: loader → sessionizer → cluster engine →
//! reporting. Sessions are maximal runs of play events with no inter-event
//! gap of 30 minutes or more, retained only when they contain at least 3
//! events. Each retained session is reduced to a fixed 8-dimensional feature
//! vector (duration, track count, unique artists, skip ratio, average track
//! duration, start hour, weekend flag, diversity score). The cluster engine
//! standardizes the vectors, searches candidate cluster counts, and keeps
//! the partition with the best mean silhouette coefficient.
//!
//! ## Determinism
//!
//! For a fixed event log and seed, every query returns identical results:
//! k-means initialization draws from a seeded RNG and all tie-breaks are by
//! index. Fewer than 10 qualifying sessions yields a structured
//! insufficient-data summary rather than an error.
//!
//! ## Error Handling
//!
//! Fallible boundaries return `anyhow::Result` with context. The one typed
//! error is [`cluster::ClusterError::InsufficientData`], which callers
//! surface as an informational state. Malformed export records are dropped
//! and counted during loading; zero-variance feature dimensions are clamped
//! during normalization. Nothing in the pipeline is fatal to the host.

pub mod cache;
pub mod cli;
pub mod cluster;
pub mod completion;
pub mod config;
pub mod event;
pub mod features;
pub mod pipeline;
pub mod report;
pub mod session;
