//! CRUD view host for switchyard.
//!
//! A [`View`] maps one inbound request onto at most one remote service
//! invocation through a [`Gateway`](switchyard_core::Gateway), and maps the
//! reply back onto something the presentation tier can render. The
//! [`Dispatcher`] owns that lifecycle; [`HostConfig`] declares views from a
//! TOML/JSON file and [`run`] serves them over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use switchyard_core::build_gateway;
use switchyard_core::check::CheckClient;

pub mod cluster;
pub mod config;
pub mod datetime;
pub mod dispatch;
pub mod http;
pub mod i18n;
pub mod metrics;
pub mod normalize;
pub mod presenter;
pub mod request;
pub mod schema;
pub mod view;

pub use config::{HostConfig, RoutedView};
pub use dispatch::{DispatchError, Dispatcher, RenderPayload, ViewResponse};
pub use http::{HostState, router};
pub use normalize::{NormalizeError, RenderRecord, normalize_many, normalize_one};
pub use presenter::{HandlebarsPresenter, Presenter};
pub use request::{InboundRequest, SessionContext};
pub use schema::{FieldSchema, SchemaError};
pub use view::{View, ViewHooks, ViewKind};

/// A fully assembled host, ready to serve.
pub struct Host {
    state: Arc<HostState>,
    views: Vec<RoutedView>,
    addr: SocketAddr,
}

impl Host {
    /// Builds the gateway, check client, presenter and views. Call this
    /// outside of any async runtime: the HTTP clients are blocking.
    pub fn from_config(config: &HostConfig) -> Result<Self> {
        let gateway = build_gateway(&config.gateway_config()?)?;
        let dispatcher = Dispatcher::new(gateway).with_locale(&config.locale());
        let check = match &config.check {
            Some(section) => Some(CheckClient::new(
                section.endpoint.clone(),
                section.timeout()?,
            )?),
            None => None,
        };
        let state = HostState::new(dispatcher, Arc::new(config.presenter()?))
            .with_clusters(config.cluster_summaries())
            .with_profile(config.profile.clone())
            .with_check(check);
        let views = config.routed_views()?;
        Ok(Self {
            state: Arc::new(state),
            views,
            addr: config.bind_addr(),
        })
    }

    pub fn state(&self) -> &Arc<HostState> {
        &self.state
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn router(&self) -> axum::Router {
        router(Arc::clone(&self.state), self.views.clone())
    }

    pub async fn serve(&self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        tracing::info!(addr = %self.addr, views = self.views.len(), "switchyard host listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("http server failed")
    }
}

/// Builds the host, then serves it on a dedicated multi-threaded runtime.
///
/// The host outlives the runtime so the blocking HTTP clients are never
/// dropped from async context.
pub fn run(config: HostConfig) -> Result<()> {
    let host = Host::from_config(&config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(host.serve())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
