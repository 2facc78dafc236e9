use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use roster_db::{MemoryDocumentIndex, MemoryGroupDirectory, MemoryPrincipalDirectory, MemoryProjectStore};
use roster_engine::{log_project_events, Collaborators, ProjectService};
use roster_registry::{MemoryRegistry, RegistryProxyClient, RepositoryRegistry};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roster_api::config::ServerConfig;
use roster_api::routes;
use roster_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster_api=debug,roster_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Collaborators ---
    let registry: Arc<dyn RepositoryRegistry> = match &config.registry_proxy_url {
        Some(url) => {
            let client = RegistryProxyClient::new(url.clone(), Duration::from_millis(config.collaborator_timeout_ms))
                .expect("Failed to build registry proxy client");
            tracing::info!(base_url = %client.base_url(), "Registry proxy enabled");
            Arc::new(client)
        }
        None => {
            tracing::warn!("REGISTRY_PROXY_URL not set, repository listings will be empty");
            Arc::new(MemoryRegistry::new())
        }
    };

    let collaborators = Collaborators {
        projects: Arc::new(MemoryProjectStore::new()),
        groups: Arc::new(MemoryGroupDirectory::new()),
        principals: Arc::new(MemoryPrincipalDirectory::new()),
        documents: Arc::new(MemoryDocumentIndex::new()),
        registry,
    };

    // --- Project service ---
    let projects = Arc::new(ProjectService::new(collaborators, config.engine_config()));
    projects
        .ensure_default_project()
        .await
        .expect("Failed to create the default project");

    let event_log_handle = tokio::spawn(log_project_events(projects.events().subscribe()));

    let state = AppState {
        config: Arc::new(config.clone()),
        projects: Arc::clone(&projects),
    };

    // --- Router ---
    let request_id_header = HeaderName::from_static("x-request-id");
    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(build_cors_layer(&config))
        .with_state(state);

    // --- Start server ---
    let addr = SocketAddr::new(config.host.parse().expect("Invalid HOST address"), config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    event_log_handle.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Build the CORS layer; an invalid configured origin fails start-up.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
