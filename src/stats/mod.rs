//! Statistics and performance observation
//!
//! This module provides:
//! - Session stats snapshots and bandwidth math
//! - A rolling-window performance observer for health classification

pub mod metrics;
pub mod monitor;

pub use metrics::{bitrate_kbps, StreamStats};
pub use monitor::{PerformanceMonitor, PerformanceReport, StreamHealth};
