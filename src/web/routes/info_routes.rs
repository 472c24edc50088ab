use axum::{Json, Router, extract::State, routing::get};
use std::sync::Arc;

use crate::version::VERSION;
use crate::web::AppState;
use crate::web::models::prediction_models::{ModelInfoResponse, ServiceInfo};

pub fn info_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(service_info_handler))
        .route("/health", get(health_check_handler))
        .route("/model", get(model_info_handler))
}

async fn service_info_handler() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        title: "Air Quality Prediction API",
        description: "Predicts AQI and six air pollutants from Latitude and Longitude \
                      using a gradient-boosted multi-output regressor.",
        version: VERSION,
    })
}

async fn health_check_handler() -> &'static str {
    "OK"
}

async fn model_info_handler(State(app_state): State<Arc<AppState>>) -> Json<ModelInfoResponse> {
    Json(ModelInfoResponse {
        source: app_state.config.model_path.clone(),
        summary: app_state.model.summary(),
    })
}

#[cfg(test)]
mod tests {
    use crate::model::{GradientBoostedTrees, fixtures};
    use crate::server::config::ServerConfig;
    use crate::web::create_axum_router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn get(uri: &str) -> (StatusCode, Vec<u8>) {
        let model = GradientBoostedTrees::from_value(fixtures::air_quality_booster()).unwrap();
        let app = create_axum_router(Arc::new(model), Arc::new(ServerConfig::default()));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn test_model_info() {
        let (status, body) = get("/model").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["source"], "xgboost_air_quality_model.json");
        assert_eq!(json["booster"], "gbtree");
        assert_eq!(json["objective"], "reg:squarederror");
        assert_eq!(json["num_trees"], 7);
        assert_eq!(json["features"], serde_json::json!(["Latitude", "Longitude"]));
        assert_eq!(json["targets"][5], "CO");
    }

    #[tokio::test]
    async fn test_service_info() {
        let (status, body) = get("/").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["title"], "Air Quality Prediction API");
        assert_eq!(json["version"], crate::version::VERSION);
    }
}
