use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt;
use log::info;
use serde::Serialize;
use serde_json::json;

use super::error::ApiError;
use super::AppState;
use crate::classifier::decode_image;
use crate::reference::ReferenceRow;

/// Successful prediction payload: the reference row at the predicted index
/// plus the softmax confidence.
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub class_name: String,
    pub label: String,
    pub confidence: f32,
    pub description: String,
    pub treatment: String,
    pub recommendation: String,
}

impl PredictionResponse {
    fn new(row: &ReferenceRow, confidence: f32) -> Self {
        Self {
            class_name: row.class_name.clone(),
            label: row.diagnosis.clone(),
            confidence,
            description: row.description.clone(),
            treatment: row.treatment.clone(),
            recommendation: row.recommendation.clone(),
        }
    }
}

/// Pulls the `image` file field out of the multipart payload.
///
/// Returns `None` when no field with that name exists; a present field with
/// no filename yields an empty filename, which the handler rejects.
async fn read_image_field(
    payload: &mut Multipart,
) -> Result<Option<(String, Vec<u8>)>, ApiError> {
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != Some("image") {
            continue;
        }
        // content_disposition() hands back an owned value parsed from the
        // field headers; bind it before borrowing the filename out of it.
        let disposition = field.content_disposition();
        let filename = disposition
            .as_ref()
            .and_then(|d| d.get_filename())
            .unwrap_or_default()
            .to_string();

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            data.extend_from_slice(&chunk);
        }
        return Ok(Some((filename, data)));
    }
    Ok(None)
}

pub async fn predict(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let (filename, data) = read_image_field(&mut payload)
        .await?
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;
    if filename.is_empty() {
        return Err(ApiError::BadRequest("Empty file".to_string()));
    }

    // Decode and forward pass run on the blocking pool; the model is
    // read-only, so no locking is needed.
    let predictor = Arc::clone(&state.predictor);
    let prediction = web::block(move || {
        let image = decode_image(&data)?;
        predictor.predict(&image)
    })
    .await??;

    let row = state
        .table
        .get(prediction.class_index)
        .ok_or(ApiError::Lookup {
            index: prediction.class_index,
            rows: state.table.len(),
        })?;

    info!(
        "Predicted '{}' (class {}, confidence {:.3}) for upload '{}'",
        row.class_name, prediction.class_index, prediction.confidence, filename
    );
    Ok(HttpResponse::Ok().json(PredictionResponse::new(row, prediction.confidence)))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub async fn info(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.info)
}
