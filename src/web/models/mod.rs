pub mod prediction_models;
