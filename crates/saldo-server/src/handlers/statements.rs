//! Statement upload handler

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use tracing::{debug, info};

use crate::{AppError, AppState, MAX_UPLOAD_SIZE};
use saldo_core::{
    CategoryLabeler, Error, ProcessReport, ProgressEvent, ProgressSink, StatementProcessor,
};

/// Forwards pipeline progress to the request log
struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, event: ProgressEvent) {
        debug!(?event, "Statement progress");
    }
}

/// POST /api/statements - Process a statement PDF and replace stored records
///
/// Expects multipart form with:
/// - file: statement PDF (required, max 10MB)
///
/// Only one statement is processed at a time; a concurrent upload gets 409.
pub async fn upload_statement(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ProcessReport>, AppError> {
    let mut file_data: Option<Vec<u8>> = None;

    // Extract fields from multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::bad_request("Failed to read file data"))?;

        // Check file size limit
        if bytes.len() > MAX_UPLOAD_SIZE {
            return Err(AppError::bad_request(&format!(
                "File too large. Maximum size is {} MB",
                MAX_UPLOAD_SIZE / 1024 / 1024
            )));
        }
        file_data = Some(bytes.to_vec());
    }

    let file_data = file_data.ok_or_else(|| AppError::bad_request("Missing file field"))?;

    let store = state
        .store
        .as_ref()
        .ok_or_else(|| AppError::service_unavailable("Store is not available"))?;
    let ai = state
        .ai
        .clone()
        .ok_or_else(|| AppError::service_unavailable("Classification is not available"))?;

    let _guard = state
        .processing
        .try_lock()
        .map_err(|_| AppError::conflict("A statement is already being processed"))?;

    let labeler = CategoryLabeler::from_settings(ai, &state.settings)?;
    let processor = StatementProcessor::new(store, Some(labeler), &state.settings);

    info!(bytes = file_data.len(), "Processing uploaded statement");
    match processor.process_pdf(&file_data, &LogProgress).await {
        Ok(report) => Ok(Json(report)),
        Err(Error::Pdf(msg)) => Err(AppError::bad_request(&format!(
            "Could not read PDF: {}",
            msg
        ))),
        Err(e) => Err(e.into()),
    }
}
