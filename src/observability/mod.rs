//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters through the `metrics` facade)
//! ```
//!
//! # Design Decisions
//! - Structured fields rather than formatted strings
//! - Secrets and private keys never appear in events
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
