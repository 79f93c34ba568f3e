//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the configured storage backend
//! - Choose the clock and randomness sources
//!
//! # Design Decisions
//! - Components are plain values so tests can swap any of them
//! - A missing storage backend is not a startup error; logging is skipped

use std::sync::Arc;

use crate::config::EdgeConfig;
use crate::storage::{open_store, ObjectStore};
use crate::traffic::{ClockSource, RandomSource, SystemClock, ThreadRandom};

/// Collaborators the server is assembled from.
#[derive(Debug, Clone)]
pub struct Components {
    pub store: Option<Arc<dyn ObjectStore>>,
    pub clock: Arc<dyn ClockSource>,
    pub random: Arc<dyn RandomSource>,
}

impl Components {
    /// Production components for `config`.
    pub fn from_config(config: &EdgeConfig) -> Self {
        let store = open_store(&config.storage);
        match &store {
            Some(store) => tracing::info!(store = ?store, "Traffic log storage opened"),
            None => tracing::warn!("No traffic log storage configured; logging disabled"),
        }
        Self {
            store,
            clock: Arc::new(SystemClock::new()),
            random: Arc::new(ThreadRandom),
        }
    }

    /// System clock and randomness with the given store.
    pub fn with_store(store: Option<Arc<dyn ObjectStore>>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock::new()),
            random: Arc::new(ThreadRandom),
        }
    }

    pub fn clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }
}
