use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw current-conditions payload as returned by the weather API for one city.
///
/// Every field the transformer treats as required is optional here: a payload
/// with missing blocks still decodes, and the transformer decides whether the
/// record can be salvaged or must be dropped. `dt` is kept as a raw JSON value
/// because the API is not trusted to always send a number.
#[derive(Debug, Clone, Deserialize)]
pub struct RawObservation {
    pub name: Option<String>,
    pub sys: Option<SysBlock>,
    pub main: Option<MainBlock>,
    #[serde(default)]
    pub weather: Vec<Condition>,
    pub wind: Option<WindBlock>,
    pub visibility: Option<f64>,
    pub dt: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SysBlock {
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainBlock {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub main: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindBlock {
    pub speed: Option<f64>,
    pub deg: Option<f64>,
}

/// One validated observation, matching a row of the `weather_data` table.
///
/// Records are append-only: once loaded they are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub weather_main: String,
    pub weather_description: String,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub visibility: f64,
    /// Local wall-clock time of the observation, second precision.
    pub data_timestamp: NaiveDateTime,
}
