//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (edge metadata, absolute URL)
//!     → interceptor.rs
//!         → downstream.rs (upstream / assets / 404)
//!         → traffic logging (background)
//!         → redirect resolver
//!     → response.rs (301 + Location)
//!     → Send to client
//! ```

pub mod downstream;
pub mod interceptor;
pub mod request;
pub mod response;
pub mod server;

pub use server::{EdgeServer, EdgeState, ServerError};
