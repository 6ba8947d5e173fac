//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscriber's receiver fires → server stops accepting → drain
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain in-flight dispatches, exit
//! - In-flight dispatches are never cancelled; they run to completion

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
