//! Edge traffic logger and redirector.
//!
//! Every inbound request is forwarded to a downstream handler, recorded as
//! a structured traffic log in object storage by a background task, and
//! answered with a permanent redirect to the canonical external site.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod redirect;
pub mod storage;
pub mod traffic;

pub use config::EdgeConfig;
pub use http::EdgeServer;
pub use lifecycle::Shutdown;
