use super::{
    FeatureFrame, GradientBoostedTrees, ModelError, ModelSummary, Regressor, check_features,
};

/// One single-output booster per target, evaluated on the same frame and
/// stitched together column-wise.
#[derive(Debug, Clone)]
pub struct MultiOutputRegressor {
    feature_names: Vec<String>,
    target_names: Vec<String>,
    estimators: Vec<GradientBoostedTrees>,
}

impl MultiOutputRegressor {
    pub fn new(
        feature_names: Vec<String>,
        target_names: Vec<String>,
        estimators: Vec<GradientBoostedTrees>,
    ) -> Result<Self, ModelError> {
        if estimators.len() != target_names.len() {
            return Err(ModelError::Incompatible(format!(
                "{} estimators for {} targets",
                estimators.len(),
                target_names.len()
            )));
        }
        for (i, estimator) in estimators.iter().enumerate() {
            if estimator.num_outputs() != 1 {
                return Err(ModelError::Incompatible(format!(
                    "estimator {i} has {} outputs, expected 1",
                    estimator.num_outputs()
                )));
            }
            if estimator.feature_names() != feature_names.as_slice() {
                return Err(ModelError::Incompatible(format!(
                    "estimator {i} expects features {:?}, bundle declares {feature_names:?}",
                    estimator.feature_names()
                )));
            }
        }
        Ok(MultiOutputRegressor {
            feature_names,
            target_names,
            estimators,
        })
    }
}

impl Regressor for MultiOutputRegressor {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn target_names(&self) -> &[String] {
        &self.target_names
    }

    fn predict(&self, frame: &FeatureFrame) -> Result<Vec<Vec<f64>>, ModelError> {
        check_features(&self.feature_names, frame)?;

        let mut rows = vec![Vec::with_capacity(self.estimators.len()); frame.n_rows()];
        for estimator in &self.estimators {
            for (row, column) in rows.iter_mut().zip(estimator.predict(frame)?) {
                row.extend(column);
            }
        }
        Ok(rows)
    }

    fn summary(&self) -> ModelSummary {
        let objective = self
            .estimators
            .first()
            .map(|e| e.objective().to_string())
            .unwrap_or_default();
        ModelSummary {
            booster: "gbtree".to_string(),
            objective,
            features: self.feature_names.clone(),
            targets: self.target_names.clone(),
            num_trees: self.estimators.iter().map(GradientBoostedTrees::num_trees).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{self, NORTH, SOUTH};
    use crate::model::{default_feature_names, default_target_names};

    fn estimators() -> Vec<GradientBoostedTrees> {
        (0..7)
            .map(|t| {
                GradientBoostedTrees::from_value(fixtures::booster(
                    vec![fixtures::stump(30.0, SOUTH[t], NORTH[t], true)],
                    vec![0],
                    "0E0",
                    1,
                    "reg:squarederror",
                ))
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_matches_native_multi_target_booster() {
        let bundle =
            MultiOutputRegressor::new(default_feature_names(), default_target_names(), estimators())
                .unwrap();
        let native = GradientBoostedTrees::from_value(fixtures::air_quality_booster()).unwrap();

        let frame = FeatureFrame::from_records(vec![
            [("Latitude", 28.6), ("Longitude", 77.2)],
            [("Latitude", 51.5), ("Longitude", -0.1)],
            [("Latitude", 12.9), ("Longitude", 77.5)],
        ])
        .unwrap();

        assert_eq!(bundle.predict(&frame).unwrap(), native.predict(&frame).unwrap());
        assert_eq!(bundle.summary().num_trees, 7);
    }

    #[test]
    fn test_estimator_count_must_match_targets() {
        let mut short = estimators();
        short.pop();
        let result =
            MultiOutputRegressor::new(default_feature_names(), default_target_names(), short);
        assert!(matches!(result, Err(ModelError::Incompatible(_))));
    }

    #[test]
    fn test_rejects_multi_output_estimator() {
        let mut mixed = estimators();
        mixed[0] = GradientBoostedTrees::from_value(fixtures::air_quality_booster()).unwrap();
        let result =
            MultiOutputRegressor::new(default_feature_names(), default_target_names(), mixed);
        assert!(matches!(result, Err(ModelError::Incompatible(_))));
    }
}
