//! Pipeline assembly and server startup.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
};
use tower::Layer;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use modelhooks_types::Environment;

use super::errors::{api_not_found, log_errors, normalize_errors};
use super::handlers;
use super::middleware::{decode_cookies, log_exchange, method_override, security_headers};

/// Largest accepted request body (50 MB).
pub const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub environment: Environment,
    /// Installs the JSON error chain and the catch-all 404.
    pub enable_api_error_handler: bool,
    pub body_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            enable_api_error_handler: true,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Assembles the middleware stack around the routes mounted under `/api`.
pub struct Pipeline {
    config: PipelineConfig,
    api: Router,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            api: Router::new(),
        }
    }

    /// Adds `routes` to the `/api` subtree.
    pub fn mount(mut self, routes: Router) -> Self {
        self.api = self.api.merge(routes);
        self
    }

    /// Builds the router, outermost layer first:
    /// access log (dev), body limit, cookies, compression, method override,
    /// security headers, CORS, verbose log (dev), routes, error chain.
    ///
    /// The body limit is enforced by the body extractors, so an oversized
    /// body fails inside the error chain like any other rejection.
    pub fn into_router(self) -> Router {
        let Pipeline { config, api } = self;
        let environment = config.environment.clone();

        let mut inner = Router::new()
            .route("/health", get(handlers::health))
            .nest("/api", api);

        if config.enable_api_error_handler {
            inner = inner.fallback(api_not_found).layer(middleware::from_fn_with_state(
                environment.clone(),
                normalize_errors,
            ));
        }

        if !environment.is_test() {
            inner = inner.layer(middleware::from_fn(log_errors));
        }

        if environment.is_development() {
            inner = inner.layer(middleware::from_fn_with_state(
                config.body_limit,
                log_exchange,
            ));
        }

        inner = inner.layer(CorsLayer::permissive());
        for (name, value) in security_headers() {
            inner = inner.layer(SetResponseHeaderLayer::if_not_present(name, value));
        }

        // Router layers run after routing; the override must see the
        // request first, so it wraps the whole inner router.
        let overridden = middleware::from_fn(method_override).layer(inner);

        let mut router = Router::new()
            .fallback_service(overridden)
            .layer(CompressionLayer::new())
            .layer(middleware::from_fn(decode_cookies))
            .layer(DefaultBodyLimit::max(config.body_limit));

        if environment.is_development() {
            router = router.layer(TraceLayer::new_for_http());
        }

        tracing::debug!(
            environment = %environment,
            error_handler = config.enable_api_error_handler,
            "pipeline assembled"
        );

        router
    }
}

/// HTTP server for an assembled pipeline.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            router: pipeline.into_router(),
        }
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
