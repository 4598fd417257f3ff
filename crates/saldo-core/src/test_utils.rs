//! Test utilities for saldo-core
//!
//! Mock HTTP servers standing in for the Gemini API and a PostgREST table,
//! plus a builder for small text-only statement PDFs.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::ai::MockBackend;

async fn serve(app: Router) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .unwrap();
    });

    (addr, shutdown_tx)
}

#[derive(Clone, Default)]
struct GeminiState {
    rate_limited: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

/// Mock Generative Language API
///
/// Replies to `generateContent` with a keyword-guessed category label. The
/// first `n` calls can be made to fail with a 429 `RESOURCE_EXHAUSTED`.
pub struct MockGeminiServer {
    addr: SocketAddr,
    state: GeminiState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockGeminiServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        Self::start_rate_limited(0).await
    }

    /// Start with the first `n` generate calls rate limited
    pub async fn start_rate_limited(n: usize) -> Self {
        let state = GeminiState {
            rate_limited: Arc::new(AtomicUsize::new(n)),
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let app = Router::new()
            .route(
                "/v1beta/models/:model",
                get(handle_model).post(handle_generate),
            )
            .with_state(state.clone());

        let (addr, shutdown_tx) = serve(app).await;
        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of generate calls received (including rate-limited ones)
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockGeminiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn has_api_key(headers: &HeaderMap) -> bool {
    headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| !v.is_empty())
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"error": {"code": 403, "status": "PERMISSION_DENIED"}})),
    )
        .into_response()
}

async fn handle_model(Path(model): Path<String>, headers: HeaderMap) -> Response {
    if !has_api_key(&headers) {
        return forbidden();
    }
    Json(json!({"name": format!("models/{}", model)})).into_response()
}

async fn handle_generate(
    State(state): State<GeminiState>,
    Path(model_action): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !model_action.ends_with(":generateContent") {
        return StatusCode::NOT_FOUND.into_response();
    }
    if !has_api_key(&headers) {
        return forbidden();
    }

    state.calls.fetch_add(1, Ordering::SeqCst);
    let limited = state
        .rate_limited
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if limited {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": {
                    "code": 429,
                    "message": "Resource has been exhausted (e.g. check quota).",
                    "status": "RESOURCE_EXHAUSTED"
                }
            })),
        )
            .into_response();
    }

    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default();
    let label = MockBackend::guess_label(prompt);

    Json(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": format!("{}\n", label)}]},
            "finishReason": "STOP"
        }]
    }))
    .into_response()
}

#[derive(Clone)]
struct RestState {
    api_key: String,
    rows: Arc<Mutex<Vec<Value>>>,
    next_id: Arc<AtomicI64>,
    reject_inserts: Arc<AtomicBool>,
}

/// Mock PostgREST server holding tables in memory
pub struct MockRestServer {
    addr: SocketAddr,
    state: RestState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockRestServer {
    /// Start a server that accepts `api_key` in the `apikey` header
    pub async fn start(api_key: &str) -> Self {
        let state = RestState {
            api_key: api_key.to_string(),
            rows: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicI64::new(1)),
            reject_inserts: Arc::new(AtomicBool::new(false)),
        };
        let app = Router::new()
            .route(
                "/rest/v1/:table",
                get(handle_select).post(handle_insert).delete(handle_delete),
            )
            .with_state(state.clone());

        let (addr, shutdown_tx) = serve(app).await;
        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Current rows as stored
    pub fn rows(&self) -> Vec<Value> {
        self.state.rows.lock().unwrap().clone()
    }

    /// Make every subsequent insert fail with a 500
    pub fn reject_inserts(&self, reject: bool) {
        self.state.reject_inserts.store(reject, Ordering::SeqCst);
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockRestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn authorized(state: &RestState, headers: &HeaderMap) -> bool {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    apikey == Some(state.api_key.as_str()) && bearer == Some(state.api_key.as_str())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Invalid API key"})),
    )
        .into_response()
}

async fn handle_select(State(state): State<RestState>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let rows = state.rows.lock().unwrap().clone();
    Json(rows).into_response()
}

async fn handle_insert(
    State(state): State<RestState>,
    headers: HeaderMap,
    Json(body): Json<Vec<Value>>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if state.reject_inserts.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "insert failed"})),
        )
            .into_response();
    }
    let mut rows = state.rows.lock().unwrap();
    for mut row in body {
        let id = state.next_id.fetch_add(1, Ordering::SeqCst);
        if let Some(obj) = row.as_object_mut() {
            obj.insert("id".to_string(), json!(id));
            obj.insert("created_at".to_string(), json!("2024-01-01T00:00:00+00:00"));
        }
        rows.push(row);
    }
    StatusCode::CREATED.into_response()
}

async fn handle_delete(
    State(state): State<RestState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    // PostgREST rejects deletes without a filter
    if query.get("id").map(String::as_str) != Some("neq.0") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "DELETE requires a WHERE clause"})),
        )
            .into_response();
    }
    state.rows.lock().unwrap().clear();
    StatusCode::NO_CONTENT.into_response()
}

/// Build a text-only PDF, one inner Vec of lines per page
pub fn statement_pdf(pages: &[Vec<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let y = 780 - (i as i64) * 14;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            operations.push(Operation::new("Td", vec![40.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
