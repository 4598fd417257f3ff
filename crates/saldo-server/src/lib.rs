//! Saldo Web Server
//!
//! Axum-based REST API for the Saldo statement dashboard.
//!
//! - Statement upload runs the full pipeline and replaces the stored batch
//! - Dashboard reads never fail; a missing or broken store renders empty
//! - Restrictive CORS policy and security headers
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::sync::Mutex;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use saldo_core::{AIClient, Settings, StoreClient, TextGenerator, TransactionStore};

mod handlers;

/// Maximum statement upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only in production)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
///
/// Either collaborator may be missing when its connection failed at startup;
/// reads then render empty and uploads answer 503.
pub struct AppState {
    pub store: Option<StoreClient>,
    pub ai: Option<AIClient>,
    pub settings: Settings,
    /// Held for the duration of a processing run
    processing: Mutex<()>,
}

impl AppState {
    pub fn new(store: Option<StoreClient>, ai: Option<AIClient>, settings: Settings) -> Self {
        Self {
            store,
            ai,
            settings,
            processing: Mutex::new(()),
        }
    }

    /// Connect the store and model backend named in settings
    ///
    /// Failures are logged and leave the collaborator unset.
    pub fn from_settings(settings: Settings) -> Self {
        let store = match StoreClient::connect(&settings) {
            Ok(store) => {
                info!("Store configured: {}", store.describe());
                Some(store)
            }
            Err(e) => {
                error!(error = %e, "Store unavailable");
                None
            }
        };

        let ai = AIClient::from_settings(&settings);
        if let Some(ref client) = ai {
            info!(
                "AI backend configured: {} ({}, model: {})",
                client.kind().as_str(),
                client.host(),
                client.model()
            );
        }

        Self::new(store, ai, settings)
    }
}

pub fn create_router(state: AppState, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let state = Arc::new(state);

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/statements",
            post(handlers::upload_statement)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + 64 * 1024)),
        )
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/transactions", get(handlers::list_transactions))
        .route("/categories", get(handlers::list_categories));

    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    settings: Settings,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let state = AppState::from_settings(settings);
    check_connections(&state).await;

    let app = create_router(state, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log store and model backend status
async fn check_connections(state: &AppState) {
    match state.store {
        Some(ref store) => {
            if store.health_check().await {
                info!("✅ Store reachable: {}", store.describe());
            } else {
                warn!("⚠️  Store configured but not responding: {}", store.describe());
            }
        }
        None => warn!("⚠️  No store; dashboards will be empty and uploads refused"),
    }

    match state.ai {
        Some(ref client) => {
            if client.health_check().await {
                info!("✅ AI backend connected: {}", client.host());
            } else {
                warn!(
                    "⚠️  AI backend configured but not responding: {} (model: {})",
                    client.host(),
                    client.model()
                );
            }
        }
        None => warn!("⚠️  No AI backend; set SALDO_MODEL_API_KEY to enable uploads"),
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn conflict(msg: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn service_unavailable(msg: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
