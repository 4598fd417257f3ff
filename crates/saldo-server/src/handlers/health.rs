//! Health handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use saldo_core::{TextGenerator, TransactionStore};

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub configured: bool,
    pub healthy: bool,
    /// `sqlite:<path>` / `rest:<url>` for the store, backend name for the model
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: ComponentHealth,
    pub ai: ComponentHealth,
}

/// GET /api/health - Store and model backend status
///
/// `status` is `ok` when both are reachable, `degraded` otherwise.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store = match state.store {
        Some(ref store) => ComponentHealth {
            configured: true,
            healthy: store.health_check().await,
            kind: Some(store.describe()),
        },
        None => ComponentHealth {
            configured: false,
            healthy: false,
            kind: None,
        },
    };

    let ai = match state.ai {
        Some(ref ai) => ComponentHealth {
            configured: true,
            healthy: ai.health_check().await,
            kind: Some(ai.kind().as_str().to_string()),
        },
        None => ComponentHealth {
            configured: false,
            healthy: false,
            kind: None,
        },
    };

    let status = if store.healthy && ai.healthy {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status, store, ai })
}
