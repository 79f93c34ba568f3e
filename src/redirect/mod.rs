//! Redirect decisions.
//!
//! # Data Flow
//! ```text
//! Normalized request URL (scheme, host, path, query)
//!     → resolver.rs (ordered rules, first match wins)
//!     → RedirectDecision (target, 301)
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup from config, immutable at runtime
//! - Pure: same URL always yields the same decision
//! - Independent of traffic logging

pub mod resolver;

pub use resolver::{RedirectDecision, RedirectResolver, RedirectRule};
