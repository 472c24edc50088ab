use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::services::prediction_service;
use crate::web::models::prediction_models::{PredictionBatchInput, PredictionOutput};
use crate::web::{AppError, AppState};

pub fn predict_router() -> Router<Arc<AppState>> {
    Router::new().route("/predict", post(predict_air_quality))
}

/// Accepts a list of Latitude/Longitude pairs and returns the predicted
/// pollutant levels for each location, in request order.
async fn predict_air_quality(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<PredictionBatchInput>, JsonRejection>,
) -> Result<Json<Vec<PredictionOutput>>, AppError> {
    let result = match payload {
        Ok(Json(batch)) => run_batch(app_state, batch).await,
        Err(rejection) => Err(AppError::from(rejection)),
    };

    match result {
        Ok(predictions) => {
            info!(count = predictions.len(), "Prediction batch completed.");
            Ok(Json(predictions))
        }
        Err(e) => {
            error!(error = %e, "Prediction Error.");
            Err(e)
        }
    }
}

async fn run_batch(
    app_state: Arc<AppState>,
    batch: PredictionBatchInput,
) -> Result<Vec<PredictionOutput>, AppError> {
    let model = app_state.model.clone();
    tokio::task::spawn_blocking(move || {
        prediction_service::predict(model.as_ref(), &batch.locations)
    })
    .await?
}
