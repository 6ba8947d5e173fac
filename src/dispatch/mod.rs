//! Front-controller dispatch.
//!
//! # Data Flow
//! ```text
//! Request (from HTTP transport or process args)
//!     → kernel.rs (lifecycle: hooks, security, routing, resolution, invocation)
//!     → output.rs (buffered handler output, {elapsed_time} substitution)
//!     → timer.rs (named marks for the diagnostic footer)
//!     → DispatchOutcome (sent response + process exit code)
//! ```
//!
//! # Design Decisions
//! - Dispatch is synchronous; the HTTP surface runs it on the blocking pool
//! - Every error or panic is caught once, at the kernel boundary
//! - The kernel owns no per-request state

pub mod builder;
pub mod kernel;
pub mod output;
pub mod timer;

pub use builder::KernelBuilder;
pub use kernel::{DispatchOutcome, Exit, Kernel, Stage};
pub use output::{Output, ELAPSED_TIME};
pub use timer::Timer;
