//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gatekeeper in front of every path
//! - Wire up middleware (request ID, tracing, timeout)
//! - Forward admitted requests to the upstream, or echo their gate context
//! - Swap in a rebuilt gatekeeper when configuration changes
//! - Stop accepting and drain on shutdown

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode, Uri, Version},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::AuthenticatorRegistry;
use crate::config::{registry_for, GatekeeperConfig};
use crate::gatekeeper::{GateContext, Gatekeeper};
use crate::http::middleware::{shared_gatekeeper_middleware, SharedGatekeeper};
use crate::http::request::{MakeRequestUuid, RequestIdExt};
use crate::http::response::{bad_gateway, strip_hop_by_hop};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// `host:port` of the upstream; `None` echoes admitted requests.
    pub upstream: Option<Arc<str>>,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server fronted by the gatekeeper.
pub struct HttpServer {
    router: Router,
    config: GatekeeperConfig,
    registry: AuthenticatorRegistry,
    gatekeeper: SharedGatekeeper,
}

impl HttpServer {
    /// Create a server whose configuration may only use built-in authenticators.
    pub fn new(config: GatekeeperConfig) -> Self {
        Self::with_registry(config, AuthenticatorRegistry::new())
    }

    /// Create a server; `registry` supplies application authenticators that
    /// configuration files (including reloaded ones) may reference.
    pub fn with_registry(config: GatekeeperConfig, registry: AuthenticatorRegistry) -> Self {
        let gatekeeper: SharedGatekeeper = Arc::new(ArcSwap::from_pointee(build_gatekeeper(&config, &registry)));

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let state = AppState {
            upstream: config.upstream.as_ref().map(|u| Arc::from(u.address.as_str())),
            client,
        };

        let router = Self::build_router(&config, state, gatekeeper.clone());
        Self {
            router,
            config,
            registry,
            gatekeeper,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatekeeperConfig, state: AppState, gatekeeper: SharedGatekeeper) -> Router {
        Router::new()
            .route("/{*path}", any(admitted_handler))
            .route("/", any(admitted_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(gatekeeper, shared_gatekeeper_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for in-process use (e.g. `tower::ServiceExt::oneshot`).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle to the live gatekeeper.
    pub fn gatekeeper(&self) -> SharedGatekeeper {
        self.gatekeeper.clone()
    }

    pub fn config(&self) -> &GatekeeperConfig {
        &self.config
    }

    /// Serve on `listener`, applying each configuration from `config_updates`,
    /// until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatekeeperConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = ?self.config.upstream.as_ref().map(|u| &u.address),
            "HTTP server starting"
        );

        let reloader = Reloader {
            current: self.config.clone(),
            registry: self.registry.clone(),
            gatekeeper: self.gatekeeper.clone(),
        };
        tokio::spawn(reloader.run(config_updates, shutdown.resubscribe()));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(Shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn build_gatekeeper(config: &GatekeeperConfig, registry: &AuthenticatorRegistry) -> Gatekeeper {
    match Gatekeeper::from_config(config, &registry_for(config, registry)) {
        Ok(gatekeeper) => {
            gatekeeper.log_configured();
            gatekeeper
        }
        Err(e) => {
            tracing::error!(error = %e, "Gatekeeper failed to configure; rejecting all requests");
            Gatekeeper::misconfigured()
        }
    }
}

/// Applies configuration updates to the live gatekeeper.
struct Reloader {
    current: GatekeeperConfig,
    registry: AuthenticatorRegistry,
    gatekeeper: SharedGatekeeper,
}

impl Reloader {
    async fn run(
        mut self,
        mut updates: mpsc::UnboundedReceiver<GatekeeperConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                update = updates.recv() => match update {
                    Some(config) => self.apply(config),
                    None => break,
                },
                _ = shutdown.recv() => break,
            }
        }
        tracing::debug!("Config reload loop stopped");
    }

    fn apply(&mut self, config: GatekeeperConfig) {
        if config.listener.bind_address != self.current.listener.bind_address
            || config.upstream.as_ref().map(|u| &u.address) != self.current.upstream.as_ref().map(|u| &u.address)
        {
            tracing::warn!("Listener and upstream changes take effect on restart only");
        }

        match Gatekeeper::from_config(&config, &registry_for(&config, &self.registry)) {
            Ok(gatekeeper) => {
                gatekeeper.log_configured();
                self.gatekeeper.store(Arc::new(gatekeeper));
                self.current = config;
                metrics::record_reload(true);
                tracing::info!(patterns = self.current.permissions.len(), "Gatekeeper reloaded");
            }
            Err(e) => {
                metrics::record_reload(false);
                tracing::error!(error = %e, "Reloaded config rejected; keeping current gatekeeper");
            }
        }
    }
}

#[derive(Serialize)]
struct Echo<'a> {
    path: &'a str,
    gate: &'a GateContext,
}

/// Runs after the gatekeeper admitted the request.
async fn admitted_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    match state.upstream.as_deref() {
        Some(upstream) => forward(&state.client, upstream, request).await,
        None => echo(&request),
    }
}

fn echo(request: &Request<Body>) -> Response {
    match request.extensions().get::<GateContext>() {
        Some(gate) => Json(Echo {
            path: request.uri().path(),
            gate,
        })
        .into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn forward(client: &Client<HttpConnector, Body>, upstream: &str, request: Request<Body>) -> Response {
    let request_id = request.request_id().to_string();
    let (mut parts, body) = request.into_parts();

    let path_and_query = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    parts.uri = match format!("http://{upstream}{path_and_query}").parse::<Uri>() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, upstream, error = %e, "Invalid upstream URI");
            return bad_gateway();
        }
    };
    parts.version = Version::HTTP_11;
    parts.headers.remove(header::HOST);
    strip_hop_by_hop(&mut parts.headers);

    tracing::debug!(request_id = %request_id, uri = %parts.uri, "Forwarding request");

    match client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, upstream, error = %e, "Upstream error");
            bad_gateway()
        }
    }
}
