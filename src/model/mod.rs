//! Trained-model side of the service: the tabular input the model consumes,
//! the [`Regressor`] seam the web layer depends on, and the XGBoost
//! tree-ensemble evaluator behind it.

use serde::Serialize;
use thiserror::Error;

pub mod frame;
pub mod loader;
pub mod multi_output;
pub mod xgboost;

pub use frame::FeatureFrame;
pub use loader::load_model;
pub use multi_output::MultiOutputRegressor;
pub use xgboost::GradientBoostedTrees;

/// Feature columns, in the order the model was trained on.
pub const FEATURE_COLUMNS: [&str; 2] = ["Latitude", "Longitude"];

/// Output columns, in the order the model emits them.
pub const TARGET_COLUMNS: [&str; 7] = ["AQI", "PM2_5", "PM10", "O3", "NO2", "CO", "SO2"];

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model file not found at: {0}")]
    NotFound(String),
    #[error("Failed to read model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse model: {0}")]
    Parse(String),
    #[error("Unsupported model: {0}")]
    Unsupported(String),
    #[error("Invalid tree {tree}: {reason}")]
    InvalidTree { tree: usize, reason: String },
    #[error("Feature mismatch: model expects {expected:?}, got {actual:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
    #[error("Model produced {actual} outputs per row, expected {expected}")]
    OutputShape { expected: usize, actual: usize },
    #[error("Incompatible model: {0}")]
    Incompatible(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Parse(err.to_string())
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub booster: String,
    pub objective: String,
    pub features: Vec<String>,
    pub targets: Vec<String>,
    pub num_trees: usize,
}

/// A trained multi-output regressor.
///
/// Implementations are immutable after construction and are shared across
/// request handlers, hence `Send + Sync`.
pub trait Regressor: Send + Sync {
    fn feature_names(&self) -> &[String];

    fn target_names(&self) -> &[String];

    /// Runs inference for every row of `frame`. Row `i` of the result holds
    /// one value per target, in [`Regressor::target_names`] order.
    fn predict(&self, frame: &FeatureFrame) -> Result<Vec<Vec<f64>>, ModelError>;

    fn summary(&self) -> ModelSummary;
}

pub(crate) fn check_features(expected: &[String], frame: &FeatureFrame) -> Result<(), ModelError> {
    if expected != frame.columns() {
        return Err(ModelError::FeatureMismatch {
            expected: expected.to_vec(),
            actual: frame.columns().to_vec(),
        });
    }
    Ok(())
}

pub(crate) fn default_feature_names() -> Vec<String> {
    FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn default_target_names() -> Vec<String> {
    TARGET_COLUMNS.iter().map(|s| s.to_string()).collect()
}
