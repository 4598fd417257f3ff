//! Dashboard handlers
//!
//! Reads never fail: a missing store or a failed fetch renders as no data.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use saldo_core::reports::{detail_table, parse_category_list};
use saldo_core::{fetch_for_display, Category, Dashboard, Transaction};

/// Query parameters for category filtering (`?categories=Lazer,Casa`)
#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    pub categories: Option<String>,
}

async fn stored_records(state: &AppState) -> Vec<Transaction> {
    match state.store {
        Some(ref store) => fetch_for_display(store).await,
        None => Vec::new(),
    }
}

/// GET /api/dashboard - Metrics, charts and the (filtered) detail table
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CategoryQuery>,
) -> Json<Dashboard> {
    let selected = parse_category_list(params.categories.as_deref());
    let records = stored_records(&state).await;
    Json(Dashboard::build(&records, &selected))
}

/// GET /api/transactions - Detail table rows, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CategoryQuery>,
) -> Json<Vec<Transaction>> {
    let selected = parse_category_list(params.categories.as_deref());
    let records = stored_records(&state).await;
    Json(detail_table(&records, &selected))
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    /// Labels the classifier may assign
    pub labels: Vec<&'static str>,
    /// Label used when classification fails
    pub fallback: &'static str,
}

/// GET /api/categories - The fixed label set
pub async fn list_categories() -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        labels: Category::LABELS.iter().map(|c| c.as_str()).collect(),
        fallback: Category::FALLBACK.as_str(),
    })
}
