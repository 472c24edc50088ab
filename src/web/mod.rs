use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::model::Regressor;
use crate::server::config::ServerConfig;
use crate::web::routes::{info_routes, predict_routes};

pub use crate::web::error::AppError;

pub mod error;
pub mod models;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn Regressor>,
    pub config: Arc<ServerConfig>,
}

pub fn create_axum_router(model: Arc<dyn Regressor>, config: Arc<ServerConfig>) -> Router {
    let app_state = Arc::new(AppState { model, config });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(info_routes::info_router())
        .merge(predict_routes::predict_router())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
