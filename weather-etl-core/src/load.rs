use crate::{
    model::WeatherRecord,
    store::{Result, Store, TIMESTAMP_FORMAT},
};
use rusqlite::params;
use std::fmt::Debug;

/// Loading seam: appends a validated batch to the store.
///
/// Returns whether the whole batch was committed; persistence errors are
/// logged inside the implementation, never propagated.
pub trait Load: Send + Sync + Debug {
    fn load_data(&self, records: &[WeatherRecord]) -> bool;
}

/// Appends validated records to the `weather_data` table.
#[derive(Debug, Clone)]
pub struct WeatherLoader {
    store: Store,
}

impl WeatherLoader {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Insert the whole batch inside one transaction. Any row failure rolls
    /// everything back: the transaction is rolled back when dropped without
    /// a commit, and the connection closes on drop on every exit path.
    fn insert_batch(&self, records: &[WeatherRecord]) -> Result<()> {
        let mut conn = self.store.connect()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO weather_data
                 (city, country, temperature, feels_like, humidity, pressure,
                  weather_main, weather_description, wind_speed, wind_direction,
                  visibility, data_timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;

            for r in records {
                stmt.execute(params![
                    r.city,
                    r.country,
                    r.temperature,
                    r.feels_like,
                    r.humidity,
                    r.pressure,
                    r.weather_main,
                    r.weather_description,
                    r.wind_speed,
                    r.wind_direction,
                    r.visibility,
                    r.data_timestamp.format(TIMESTAMP_FORMAT).to_string(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

impl Load for WeatherLoader {
    fn load_data(&self, records: &[WeatherRecord]) -> bool {
        match self.insert_batch(records) {
            Ok(()) => {
                log::info!("Successfully loaded {} records", records.len());
                true
            }
            Err(e) => {
                log::error!("Error loading data: {e}");
                false
            }
        }
    }
}
