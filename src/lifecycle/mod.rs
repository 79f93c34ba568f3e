//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Open storage → Build server → Bind listener
//!
//! Per request (background.rs):
//!     Interceptor → submit(log write) → runs after the redirect is sent
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Stop accepting → Drain log writes (bounded) → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then storage, then listeners
//! - Shutdown has timeout: pending log writes are abandoned after the deadline

pub mod background;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use background::BackgroundTasks;
pub use shutdown::Shutdown;
pub use startup::Components;
