use serde::{Deserialize, Serialize};

use crate::model::ModelSummary;

/// A single location to predict for.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PredictionInput {
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PredictionBatchInput {
    pub locations: Vec<PredictionInput>,
}

/// Predicted pollutant levels for one location. Gases in ppb except CO (ppm),
/// particulates in ug/m3.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PredictionOutput {
    #[serde(rename = "AQI")]
    pub aqi: i64,
    #[serde(rename = "PM2_5")]
    pub pm2_5: i64,
    #[serde(rename = "PM10")]
    pub pm10: i64,
    #[serde(rename = "O3")]
    pub o3: i64,
    #[serde(rename = "NO2")]
    pub no2: i64,
    #[serde(rename = "CO")]
    pub co: f64,
    #[serde(rename = "SO2")]
    pub so2: f64,
}

#[derive(Serialize, Debug)]
pub struct ServiceInfo {
    pub title: &'static str,
    pub description: &'static str,
    pub version: &'static str,
}

#[derive(Serialize, Debug)]
pub struct ModelInfoResponse {
    pub source: String,
    #[serde(flatten)]
    pub summary: ModelSummary,
}
