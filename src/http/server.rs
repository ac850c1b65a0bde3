//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Compile the configured and programmatic rules into the route store
//! - Create the Axum Router with a single catch-all handler
//! - Wire up middleware (request ID, tracing, CORS, timeout, access log)
//! - Render matched descriptors; defer unmatched requests to static files
//! - Serve on a listener until shutdown

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::MockConfig;
use crate::data::read_response;
use crate::http::access_log::access_log;
use crate::http::request::{request_id, RequestTarget};
use crate::http::response::{body_error, data_error, not_found, with_outcome};
use crate::lifecycle::Shutdown;
use crate::observability::metrics::{self, Outcome};
use crate::routing::compiler::{compile, ConfigError};
use crate::routing::descriptor::{MockResponse, ResponseDescriptor, ResponseHandler};
use crate::routing::store::RouteStore;
use crate::routing::table::MatchTable;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RouteStore>,
    pub data_dir: Arc<PathBuf>,
    pub static_files: Option<ServeDir>,
    pub max_body_size: usize,
}

/// The full rule set: config rules followed by programmatic rules.
///
/// Cloned into the reload task, which re-applies it to each new config.
#[derive(Clone)]
pub struct RuleSet {
    extra: Arc<Vec<(String, ResponseDescriptor)>>,
    store: Arc<RouteStore>,
}

impl RuleSet {
    /// Compile `config`'s rules plus the programmatic ones.
    pub fn compile(&self, config: &MockConfig) -> Result<MatchTable, ConfigError> {
        compile(
            config
                .rules()
                .chain(self.extra.iter().map(|(key, d)| (key.as_str(), d.clone()))),
        )
    }

    /// Compile and publish. Returns the new table version.
    pub fn apply(&self, config: &MockConfig) -> Result<u64, ConfigError> {
        let table = self.compile(config)?;
        let rules = table.rule_count();
        let version = self.store.publish(table);

        metrics::record_rule_count(rules);
        tracing::info!(version, rules, "Rule table published");
        Ok(version)
    }

    pub fn store(&self) -> &Arc<RouteStore> {
        &self.store
    }
}

/// Builder for [`MockServer`].
#[derive(Default)]
pub struct MockServerBuilder {
    config: MockConfig,
    extra: Vec<(String, ResponseDescriptor)>,
}

impl MockServerBuilder {
    pub fn config(mut self, config: MockConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a rule after the configured ones.
    pub fn rule(mut self, key: impl Into<String>, descriptor: impl Into<ResponseDescriptor>) -> Self {
        self.extra.push((key.into(), descriptor.into()));
        self
    }

    /// Add a rule answered by `handler`.
    pub fn handler<H: ResponseHandler + 'static>(self, key: impl Into<String>, handler: H) -> Self {
        self.rule(key, ResponseDescriptor::handler(handler))
    }

    /// Compile every rule. Fails on the first malformed key.
    pub fn build(self) -> Result<MockServer, ConfigError> {
        let rules = RuleSet {
            extra: Arc::new(self.extra),
            store: Arc::new(RouteStore::default()),
        };
        let table = rules.compile(&self.config)?;
        let count = table.rule_count();
        rules.store.publish(table);
        metrics::record_rule_count(count);

        tracing::debug!(rules = count, "Mock server built");
        Ok(MockServer {
            config: self.config,
            rules,
        })
    }
}

/// HTTP server answering requests from the rule table.
pub struct MockServer {
    config: MockConfig,
    rules: RuleSet,
}

impl MockServer {
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::default()
    }

    /// Server for `config` with no programmatic rules.
    pub fn new(config: MockConfig) -> Result<Self, ConfigError> {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<RouteStore> {
        Arc::clone(&self.rules.store)
    }

    pub fn rule_set(&self) -> RuleSet {
        self.rules.clone()
    }

    /// The Axum router; usable without a socket via `tower::ServiceExt`.
    pub fn into_router(self) -> Router {
        let state = AppState {
            store: Arc::clone(&self.rules.store),
            data_dir: Arc::new(self.config.data_dir.clone()),
            static_files: self.config.static_dir.as_ref().map(ServeDir::new),
            max_body_size: self.config.server.max_body_size,
        };
        Self::build_router(&self.config, state)
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &MockConfig, state: AppState) -> Router {
        let router = Router::new()
            .fallback(mock_handler)
            .with_state(state)
            .layer(middleware::from_fn(access_log))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )));

        let router = if config.server.cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        };

        router
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rules = self.rules.store.snapshot().rule_count(),
            "HTTP server starting"
        );

        axum::serve(listener, self.into_router())
            .with_graceful_shutdown(shutdown.notified())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: match, render, or fall through.
async fn mock_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let target = RequestTarget::from_uri(request.uri());
    let snapshot = state.store.snapshot();
    let method = request.method().clone();

    let Some(matched) = snapshot.lookup(method.as_str(), &target.path, &target.query) else {
        return fall_through(&state, request, &target).await;
    };

    tracing::debug!(
        request_id = %request_id(request.headers()),
        method = %method,
        path = %target.path,
        rule = matched.path,
        query = matched.query.unwrap_or_default(),
        kind = matched.descriptor.kind(),
        "Rule matched"
    );

    let response = match matched.descriptor {
        ResponseDescriptor::InlineJson(text) => MockResponse::json(text.clone()).into_response(),
        ResponseDescriptor::File(path) => match read_response(&state.data_dir, path).await {
            Ok(resp) => resp.into_response(),
            Err(e) => {
                tracing::error!(error = %e, file = %path.display(), "Failed to read data file");
                return data_error(&e);
            }
        },
        ResponseDescriptor::Handler(handler) => {
            let (parts, body) = request.into_parts();
            let body = match axum::body::to_bytes(body, state.max_body_size).await {
                Ok(bytes) => bytes,
                Err(e) => return body_error(&e, state.max_body_size),
            };
            handler
                .respond(&target.into_mock_request(&parts, body))
                .into_response()
        }
    };

    with_outcome(response, Outcome::Matched)
}

/// No rule matched: static file if configured, else 404.
async fn fall_through(state: &AppState, request: Request<Body>, target: &RequestTarget) -> Response {
    let method = request.method().clone();
    let url = target.display_url();

    if let Some(static_files) = &state.static_files {
        if method == Method::GET || method == Method::HEAD {
            let response = static_files.clone().oneshot(request).await.into_response();
            if response.status() != StatusCode::NOT_FOUND {
                return with_outcome(response, Outcome::Static);
            }
        }
    }

    tracing::debug!(method = %method, url = %url, "No rule matched");
    not_found(method.as_str(), &url)
}
