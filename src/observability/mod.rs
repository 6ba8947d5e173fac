//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every dispatch produces:
//!     → logging.rs (structured log events with request id, path, status)
//!     → metrics.rs (counters and histograms per outcome)
//!
//! Consumers:
//!     → Log aggregation (stderr)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all log events of a dispatch
//! - Metrics are cheap (atomic increments) and no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
