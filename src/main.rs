use anyhow::Context;
use axum::{
    http::{header, HeaderName, HeaderValue, Method, Uri},
    middleware,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod dto;
mod error;
mod handlers;
mod models;
mod services;
mod store;

use auth::rate_limit::RateLimitState;
use config::Config;
use error::AppError;
use services::analysis::{DeterministicAnalyzer, ImageAnalyzer};
use services::dates::DateService;
use services::identity::IdentityService;
use services::mailer::Mailer;
use store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RecordStore>,
    pub identity: IdentityService,
    pub dates: DateService,
    pub analyzer: Arc<dyn ImageAnalyzer>,
    pub rate_limiter: RateLimitState,
}

impl AppState {
    pub fn new(config: Arc<Config>, store: Arc<dyn RecordStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            identity: IdentityService::new(store.clone(), config.clone(), mailer),
            dates: DateService::new(store.clone()),
            analyzer: Arc::new(DeterministicAnalyzer),
            rate_limiter: RateLimitState::new(config.rate_limit_max, config.rate_limit_window_secs),
            config,
            store,
        }
    }

    #[cfg(test)]
    pub fn for_tests(store: Arc<dyn RecordStore>) -> Self {
        Self::new(
            Arc::new(Config::for_tests()),
            store,
            Arc::new(services::mailer::tests::RecordingMailer::default()),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);

    let store = store::connect(&config).await;
    let mailer = services::mailer::from_config(&config);
    let state = AppState::new(config.clone(), store, mailer);

    state.rate_limiter.spawn_cleanup_worker();

    let app = build_router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    // Connect info feeds the per-IP rate limiter.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/verify", post(handlers::auth::verify))
        .route("/api/ai/analyze-image", post(handlers::ai::analyze_image))
        .route("/api/ai/advice", post(handlers::ai::advice));

    let protected_routes = Router::new()
        .route("/api/users/me", get(handlers::users::me))
        .route("/api/users/me/stats", get(handlers::users::stats))
        .route(
            "/api/dates",
            get(handlers::dates::list_dates).post(handlers::dates::create_date),
        )
        .route(
            "/api/dates/:id",
            get(handlers::dates::get_date)
                .put(handlers::dates::update_date)
                .delete(handlers::dates::delete_date),
        )
        .route("/api/ai/insights", post(handlers::ai::insights))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.config))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true);

    // The limiter wraps every route, ahead of auth.
    let routes = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit,
        ))
        .fallback(route_not_found);

    with_security_headers(routes)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Hardening headers on every response, including errors and 404s.
fn with_security_headers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
        (header::REFERRER_POLICY, "no-referrer"),
        (header::X_XSS_PROTECTION, "0"),
        (header::X_DNS_PREFETCH_CONTROL, "off"),
        (
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=15552000; includeSubDomains",
        ),
        (
            header::CONTENT_SECURITY_POLICY,
            "default-src 'none'; frame-ancestors 'self'",
        ),
        (
            HeaderName::from_static("cross-origin-resource-policy"),
            "same-origin",
        ),
    ]
    .into_iter()
    .fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            name,
            HeaderValue::from_static(value),
        ))
    })
}

fn allowed_origins(config: &Config) -> Vec<HeaderValue> {
    let extra = std::env::var("CORS_EXTRA_ORIGINS").unwrap_or_default();
    std::iter::once(config.frontend_url.as_str())
        .chain(extra.split(','))
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(hv) => Some(hv),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect()
}

async fn route_not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("Cannot {} {}", method, uri))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
