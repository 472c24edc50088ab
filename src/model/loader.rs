use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::{
    FEATURE_COLUMNS, GradientBoostedTrees, ModelError, MultiOutputRegressor, Regressor,
    TARGET_COLUMNS, default_feature_names, default_target_names,
};

/// Per-target layout: one single-output XGBoost document per target.
#[derive(Deserialize)]
struct BundleDocument {
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    #[serde(default)]
    targets: Option<Vec<String>>,
    estimators: Vec<Value>,
}

/// Loads the model artifact at `path` and checks that it consumes
/// [`FEATURE_COLUMNS`] and produces [`TARGET_COLUMNS`].
pub fn load_model(path: &Path) -> Result<Arc<dyn Regressor>, ModelError> {
    if !path.exists() {
        return Err(ModelError::NotFound(path.display().to_string()));
    }
    let contents = fs::read_to_string(path)?;
    let model = parse_model(serde_json::from_str(&contents)?)?;

    let summary = model.summary();
    info!(
        path = %path.display(),
        objective = %summary.objective,
        num_trees = summary.num_trees,
        "Model loaded successfully."
    );
    Ok(model)
}

pub fn parse_model(document: Value) -> Result<Arc<dyn Regressor>, ModelError> {
    let model: Arc<dyn Regressor> = if document.get("estimators").is_some() {
        Arc::new(parse_bundle(document)?)
    } else {
        Arc::new(GradientBoostedTrees::from_value(document)?)
    };
    check_compatible(model.as_ref())?;
    Ok(model)
}

fn parse_bundle(document: Value) -> Result<MultiOutputRegressor, ModelError> {
    let bundle: BundleDocument = serde_json::from_value(document)?;
    let estimators = bundle
        .estimators
        .into_iter()
        .map(GradientBoostedTrees::from_value)
        .collect::<Result<Vec<_>, _>>()?;

    MultiOutputRegressor::new(
        bundle.feature_names.unwrap_or_else(default_feature_names),
        bundle.targets.unwrap_or_else(default_target_names),
        estimators,
    )
}

fn check_compatible(model: &dyn Regressor) -> Result<(), ModelError> {
    if model.feature_names() != FEATURE_COLUMNS {
        return Err(ModelError::Incompatible(format!(
            "model expects features {:?}, service provides {FEATURE_COLUMNS:?}",
            model.feature_names()
        )));
    }
    if model.target_names() != TARGET_COLUMNS {
        return Err(ModelError::Incompatible(format!(
            "model predicts {:?}, service requires {TARGET_COLUMNS:?}",
            model.target_names()
        )));
    }
    Ok(())
}
