use crate::model::{FEATURE_COLUMNS, FeatureFrame, ModelError, Regressor, TARGET_COLUMNS};
use crate::web::error::AppError;
use crate::web::models::prediction_models::{PredictionInput, PredictionOutput};

/// Nearest integer, ties to even.
pub fn round_to_int(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// One decimal place, ties to even.
///
/// Model outputs are widened from `f32`, so `value * 10.0` is exact in
/// `f64` and this agrees with decimal rounding of the `f32` value. An
/// arbitrary `f64` such as `0.35` can round differently.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

pub fn build_frame(locations: &[PredictionInput]) -> Result<FeatureFrame, AppError> {
    let frame = FeatureFrame::from_records(locations.iter().map(|loc| {
        [
            (FEATURE_COLUMNS[0], loc.latitude),
            (FEATURE_COLUMNS[1], loc.longitude),
        ]
    }))
    .map_err(AppError::Internal)?;

    if frame.columns() != FEATURE_COLUMNS {
        return Err(AppError::Validation(
            "Input data must contain 'Latitude' and 'Longitude' columns.".to_string(),
        ));
    }
    Ok(frame)
}

fn format_row(row: &[f64]) -> Result<PredictionOutput, AppError> {
    let [aqi, pm2_5, pm10, o3, no2, co, so2] =
        <[f64; 7]>::try_from(row).map_err(|_| ModelError::OutputShape {
            expected: TARGET_COLUMNS.len(),
            actual: row.len(),
        })?;
    if let Some(i) = row.iter().position(|v| !v.is_finite()) {
        return Err(AppError::Inference(format!(
            "model returned a non-finite value for {}",
            TARGET_COLUMNS[i]
        )));
    }

    Ok(PredictionOutput {
        aqi: round_to_int(aqi),
        pm2_5: round_to_int(pm2_5),
        pm10: round_to_int(pm10),
        o3: round_to_int(o3),
        no2: round_to_int(no2),
        co: round_to_tenth(co),
        so2: round_to_tenth(so2),
    })
}

/// Runs one inference call for the whole batch. Output `i` belongs to
/// location `i`; any failure fails the whole batch.
pub fn predict(
    model: &dyn Regressor,
    locations: &[PredictionInput],
) -> Result<Vec<PredictionOutput>, AppError> {
    let frame = build_frame(locations)?;
    let predictions = model.predict(&frame)?;

    if predictions.len() != locations.len() {
        return Err(AppError::Inference(format!(
            "model returned {} rows for {} locations",
            predictions.len(),
            locations.len()
        )));
    }

    predictions.iter().map(|row| format_row(row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GradientBoostedTrees, ModelSummary, fixtures};

    struct FixedModel {
        row: Vec<f64>,
        features: Vec<String>,
        targets: Vec<String>,
    }

    impl FixedModel {
        fn new(row: Vec<f64>) -> Self {
            FixedModel {
                row,
                features: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
                targets: TARGET_COLUMNS.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl Regressor for FixedModel {
        fn feature_names(&self) -> &[String] {
            &self.features
        }

        fn target_names(&self) -> &[String] {
            &self.targets
        }

        fn predict(&self, frame: &FeatureFrame) -> Result<Vec<Vec<f64>>, ModelError> {
            Ok(vec![self.row.clone(); frame.n_rows()])
        }

        fn summary(&self) -> ModelSummary {
            ModelSummary {
                booster: "fixed".to_string(),
                objective: "none".to_string(),
                features: self.features.clone(),
                targets: self.targets.clone(),
                num_trees: 0,
            }
        }
    }

    fn location(latitude: f64, longitude: f64) -> PredictionInput {
        PredictionInput { latitude, longitude }
    }

    #[test]
    fn test_rounding_is_half_to_even() {
        assert_eq!(round_to_int(2.5), 2);
        assert_eq!(round_to_int(3.5), 4);
        assert_eq!(round_to_int(-2.5), -2);
        assert_eq!(round_to_int(41.49), 41);
        assert_eq!(round_to_tenth(0.25), 0.2);
        assert_eq!(round_to_tenth(0.75), 0.8);
        assert_eq!(round_to_tenth(1.04), 1.0);
        assert_eq!(round_to_tenth(3.46), 3.5);
    }

    #[test]
    fn test_tenth_rounding_uses_the_stored_f32_value() {
        // 0.35f32 is stored as 0.3499999940..., 0.45f32 as 0.4499999881...
        assert_eq!(round_to_tenth(f64::from(0.35f32)), 0.3);
        assert_eq!(round_to_tenth(f64::from(0.45f32)), 0.4);
        // 0.65f32 is stored as 0.6499999761..., 1.15f32 as 1.1499999761...
        assert_eq!(round_to_tenth(f64::from(0.65f32)), 0.6);
        assert_eq!(round_to_tenth(f64::from(1.15f32)), 1.1);
    }

    #[test]
    fn test_predicts_in_input_order() {
        let model = GradientBoostedTrees::from_value(fixtures::air_quality_booster()).unwrap();
        let locations = vec![location(28.6, 77.2), location(40.7, -74.0), location(19.1, 72.9)];

        let results = predict(&model, &locations).unwrap();

        assert_eq!(results.len(), 3);
        let south = PredictionOutput {
            aqi: 152,
            pm2_5: 62,
            pm10: 88,
            o3: 32,
            no2: 18,
            co: 1.2,
            so2: 4.8,
        };
        let north = PredictionOutput {
            aqi: 40,
            pm2_5: 10,
            pm10: 20,
            o3: 44,
            no2: 6,
            co: 0.5,
            so2: 1.0,
        };
        assert_eq!(results, vec![south.clone(), north, south]);
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let model = GradientBoostedTrees::from_value(fixtures::air_quality_booster()).unwrap();
        let locations = vec![location(28.6, 77.2), location(35.0, 139.7)];
        assert_eq!(predict(&model, &locations).unwrap(), predict(&model, &locations).unwrap());
    }

    #[test]
    fn test_empty_batch_fails_column_check() {
        let model = FixedModel::new(vec![0.0; 7]);
        let err = predict(&model, &[]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Input data must contain 'Latitude' and 'Longitude' columns."
        );
    }

    #[test]
    fn test_wrong_output_width_fails_whole_batch() {
        let model = FixedModel::new(vec![1.0; 6]);
        let err = predict(&model, &[location(1.0, 2.0), location(3.0, 4.0)]).unwrap_err();
        assert!(matches!(err, AppError::Inference(_)));
    }

    #[test]
    fn test_non_finite_output_is_an_error() {
        let model = FixedModel::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, f64::NAN, 7.0]);
        let err = predict(&model, &[location(1.0, 2.0)]).unwrap_err();
        assert!(err.to_string().contains("CO"));
    }

    #[test]
    fn test_model_errors_propagate() {
        let model = GradientBoostedTrees::from_value(fixtures::booster(
            vec![fixtures::leaf(1.0)],
            vec![0],
            "0E0",
            1,
            "reg:squarederror",
        ))
        .unwrap();
        // single-output model: one value per row instead of seven
        let err = predict(&model, &[location(1.0, 2.0)]).unwrap_err();
        assert!(matches!(err, AppError::Inference(_)));
    }
}
