use crate::model::{RawObservation, WeatherRecord};
use chrono::{Local, NaiveDateTime, TimeZone, Timelike};
use serde_json::Value;
use std::collections::HashSet;

/// Absolute floor used to filter sentinel temperature values.
const TEMPERATURE_FLOOR: f64 = -100.0;

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

/// Turns raw payloads into flat [`WeatherRecord`]s and cleans the batch.
///
/// Error policy is asymmetric on purpose: a payload missing a required field
/// is dropped (logged, siblings unaffected), while a payload whose timestamp
/// cannot be converted is salvaged with the current time.
#[derive(Debug, Clone, Default)]
pub struct WeatherTransformer;

impl WeatherTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize raw payloads into flat records. Payloads missing required
    /// fields are dropped with an error log; the rest of the batch proceeds.
    pub fn transform_weather_data(&self, raw_data: Vec<RawObservation>) -> Vec<WeatherRecord> {
        let mut records = Vec::with_capacity(raw_data.len());

        for raw in &raw_data {
            match normalize(raw) {
                Ok(record) => records.push(record),
                Err(e) => log::error!("Error transforming data: {e}"),
            }
        }

        records
    }

    /// Validate and clean a transformed batch:
    /// deduplicate by (city, data_timestamp), replace NaN in the optional
    /// numerics with 0, and drop records outside the temperature/humidity
    /// bounds.
    ///
    /// Running this twice over a batch yields the same batch.
    pub fn validate_data(&self, records: Vec<WeatherRecord>) -> Vec<WeatherRecord> {
        let mut seen: HashSet<(String, NaiveDateTime)> = HashSet::new();

        records
            .into_iter()
            .filter(|r| seen.insert((r.city.clone(), r.data_timestamp)))
            .map(|mut r| {
                for value in [&mut r.wind_speed, &mut r.wind_direction, &mut r.visibility] {
                    if value.is_nan() {
                        *value = 0.0;
                    }
                }
                r
            })
            .filter(|r| r.temperature > TEMPERATURE_FLOOR)
            .filter(|r| (0.0..=100.0).contains(&r.humidity))
            .collect()
    }
}

fn normalize(raw: &RawObservation) -> Result<WeatherRecord, TransformError> {
    let data_timestamp = convert_timestamp(raw.dt.as_ref());

    let city = raw
        .name
        .clone()
        .ok_or(TransformError::MissingField("name"))?;
    let country = raw
        .sys
        .as_ref()
        .and_then(|sys| sys.country.clone())
        .ok_or(TransformError::MissingField("sys.country"))?;

    let main = raw.main.as_ref().ok_or(TransformError::MissingField("main"))?;
    let temperature = main.temp.ok_or(TransformError::MissingField("main.temp"))?;
    let feels_like = main
        .feels_like
        .ok_or(TransformError::MissingField("main.feels_like"))?;
    let humidity = main
        .humidity
        .ok_or(TransformError::MissingField("main.humidity"))?;
    let pressure = main
        .pressure
        .ok_or(TransformError::MissingField("main.pressure"))?;

    let condition = raw
        .weather
        .first()
        .ok_or(TransformError::MissingField("weather"))?;
    let weather_main = condition
        .main
        .clone()
        .ok_or(TransformError::MissingField("weather.main"))?;
    let weather_description = condition
        .description
        .clone()
        .ok_or(TransformError::MissingField("weather.description"))?;

    Ok(WeatherRecord {
        city,
        country,
        temperature,
        feels_like,
        humidity,
        pressure,
        weather_main,
        weather_description,
        wind_speed: raw.wind.as_ref().and_then(|w| w.speed).unwrap_or(0.0),
        wind_direction: raw.wind.as_ref().and_then(|w| w.deg).unwrap_or(0.0),
        visibility: raw.visibility.unwrap_or(0.0),
        data_timestamp,
    })
}

/// Convert the source `dt` into local wall-clock time at second precision.
///
/// A numeric value that cannot be converted (out of range) is salvaged with
/// the current time; a missing or non-numeric value also falls back to now.
fn convert_timestamp(dt: Option<&Value>) -> NaiveDateTime {
    match dt {
        Some(value) if value.is_number() => {
            let secs = value
                .as_i64()
                .or_else(|| value.as_f64().map(|f| f as i64));

            match secs.and_then(|s| Local.timestamp_opt(s, 0).single()) {
                Some(local) => local.naive_local(),
                None => {
                    log::error!("Error converting timestamp: {value}");
                    now_local()
                }
            }
        }
        _ => now_local(),
    }
}

fn now_local() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
