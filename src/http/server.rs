//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: downstream handler wrapped by the interceptor
//! - Wire up middleware (tracing, edge metadata)
//! - Bind server to listener and serve until shutdown
//! - Drain pending traffic-log writes before returning

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::{EdgeConfig, ListenerConfig};
use crate::http::downstream::{build_downstream, DownstreamError};
use crate::http::interceptor::intercept;
use crate::http::request::attach_edge_metadata;
use crate::lifecycle::background::BackgroundTasks;
use crate::lifecycle::startup::Components;
use crate::redirect::RedirectResolver;
use crate::traffic::{
    ClockSource, IdentifierGenerator, LogKeyBuilder, TrafficPersister, TrafficRecordBuilder,
};

/// Error building the server from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid redirect address pattern: {0}")]
    RedirectPattern(#[from] regex_lite::Error),

    #[error(transparent)]
    Downstream(#[from] DownstreamError),
}

/// Application state injected into the interceptor.
#[derive(Clone)]
pub struct EdgeState {
    pub clock: Arc<dyn ClockSource>,
    pub listener: Arc<ListenerConfig>,
    pub recorder: Arc<TrafficRecordBuilder>,
    pub persister: Arc<TrafficPersister>,
    pub resolver: Arc<RedirectResolver>,
    pub background: BackgroundTasks,
    /// Bound on the downstream call; the redirect is sent either way.
    pub request_timeout: Duration,
}

impl EdgeState {
    pub fn new(config: &EdgeConfig, components: Components) -> Result<Self, ServerError> {
        let ids = IdentifierGenerator::new(components.clock.clone(), components.random);
        let recorder = TrafficRecordBuilder::new(config.capture.clone(), ids.clone());
        let persister = TrafficPersister::new(
            components.store,
            ids,
            LogKeyBuilder::new(config.storage.key_prefix.clone()),
        );

        Ok(Self {
            clock: components.clock,
            listener: Arc::new(config.listener.clone()),
            recorder: Arc::new(recorder),
            persister: Arc::new(persister),
            resolver: Arc::new(RedirectResolver::new(&config.redirect)?),
            background: BackgroundTasks::new(),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        })
    }
}

/// HTTP server for the edge service.
pub struct EdgeServer {
    router: Router,
    config: EdgeConfig,
    background: BackgroundTasks,
}

impl EdgeServer {
    /// Create a server with components opened from `config`.
    pub fn new(config: EdgeConfig) -> Result<Self, ServerError> {
        let components = Components::from_config(&config);
        Self::with_components(config, components)
    }

    /// Create a server with explicit storage, clock and randomness.
    pub fn with_components(config: EdgeConfig, components: Components) -> Result<Self, ServerError> {
        let state = EdgeState::new(&config, components)?;
        let background = state.background.clone();
        let router = Self::build_router(&config, state)?;
        Ok(Self {
            router,
            config,
            background,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &EdgeConfig, state: EdgeState) -> Result<Router, ServerError> {
        let downstream = build_downstream(
            &config.downstream,
            Duration::from_secs(config.timeouts.connect_secs),
        )?;

        Ok(downstream
            .layer(middleware::from_fn_with_state(state, intercept))
            .layer(middleware::from_fn(attach_edge_metadata))
            .layer(TraceLayer::new_for_http()))
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Pending traffic-log writes.
    pub fn background(&self) -> &BackgroundTasks {
        &self.background
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires, then wait up to the
    /// configured drain timeout for background log writes.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        let drain_timeout = Duration::from_secs(self.config.lifecycle.drain_timeout_secs);
        let pending = self.background.in_flight();
        if pending > 0 {
            tracing::info!(pending, "Draining traffic log writes");
        }
        if !self.background.drain(drain_timeout).await {
            tracing::warn!(
                abandoned = self.background.in_flight(),
                "Drain timeout elapsed, abandoning traffic log writes"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
