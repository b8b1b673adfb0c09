use crate::model::WeatherRecord;
use chrono::NaiveDateTime;
use rusqlite::{Connection, params, types::Type};
use std::{fs, path::PathBuf};

/// Timestamp layout used in the `data_timestamp` column. Plain local-time
/// strings in this layout compare correctly against SQLite's
/// `datetime('now', 'localtime', ...)`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS weather_data (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        city                TEXT NOT NULL,
        country             TEXT NOT NULL,
        temperature         REAL NOT NULL,
        feels_like          REAL NOT NULL,
        humidity            REAL NOT NULL,
        pressure            REAL NOT NULL,
        weather_main        TEXT NOT NULL,
        weather_description TEXT NOT NULL,
        wind_speed          REAL NOT NULL,
        wind_direction      REAL NOT NULL,
        visibility          REAL NOT NULL,
        data_timestamp      TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_weather_city_ts
        ON weather_data(city, data_timestamp);
";

/// SQLite-backed observation store.
///
/// Holds only the database path; every operation opens a fresh connection
/// and releases it on drop, so nothing is held across ticks.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

/// Compact history row (the windowed-history projection).
#[derive(Debug, Clone)]
pub struct HistoryRow {
    pub city: String,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub data_timestamp: NaiveDateTime,
}

/// Per-city temperature aggregate over a window.
#[derive(Debug, Clone)]
pub struct TemperatureStats {
    pub city: String,
    pub avg_temp: f64,
    pub min_temp: f64,
    pub max_temp: f64,
}

/// Weather-category occurrence count over a window.
#[derive(Debug, Clone)]
pub struct WeatherCount {
    pub weather_main: String,
    pub count: i64,
}

/// Hour-of-day averages over the last 24 hours.
#[derive(Debug, Clone)]
pub struct HourlyTrend {
    pub hour: i64,
    pub avg_temperature: f64,
    pub avg_humidity: f64,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open a fresh connection: WAL journal mode, schema ensured.
    pub fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&self.path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)?;

        Ok(conn)
    }

    /// Most recent stored observation for every city.
    pub fn latest_per_city(&self) -> Result<Vec<WeatherRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT city, country, temperature, feels_like, humidity, pressure,
                    weather_main, weather_description, wind_speed, wind_direction,
                    visibility, data_timestamp
             FROM weather_data w1
             WHERE data_timestamp = (
                 SELECT MAX(data_timestamp)
                 FROM weather_data w2
                 WHERE w2.city = w1.city
             )
             ORDER BY city",
        )?;

        let rows = stmt.query_map([], record_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// City/temperature/humidity/pressure rows within the last `days` days,
    /// newest first.
    pub fn history(&self, days: u32) -> Result<Vec<HistoryRow>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT city, temperature, humidity, pressure, data_timestamp
             FROM weather_data
             WHERE data_timestamp >= datetime('now', 'localtime', ?1)
             ORDER BY data_timestamp DESC",
        )?;

        let rows = stmt.query_map(params![days_modifier(days)], |row| {
            Ok(HistoryRow {
                city: row.get(0)?,
                temperature: row.get(1)?,
                humidity: row.get(2)?,
                pressure: row.get(3)?,
                data_timestamp: parse_timestamp(4, row.get(4)?)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Full records for one city within the last `days` days, newest first.
    pub fn city_history(&self, city: &str, days: u32) -> Result<Vec<WeatherRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT city, country, temperature, feels_like, humidity, pressure,
                    weather_main, weather_description, wind_speed, wind_direction,
                    visibility, data_timestamp
             FROM weather_data
             WHERE city = ?1 AND data_timestamp >= datetime('now', 'localtime', ?2)
             ORDER BY data_timestamp DESC",
        )?;

        let rows = stmt.query_map(params![city, days_modifier(days)], record_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Per-city average/min/max temperature within the last `days` days,
    /// warmest average first.
    pub fn temperature_stats(&self, days: u32) -> Result<Vec<TemperatureStats>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT city, AVG(temperature), MIN(temperature), MAX(temperature)
             FROM weather_data
             WHERE data_timestamp >= datetime('now', 'localtime', ?1)
             GROUP BY city
             ORDER BY AVG(temperature) DESC",
        )?;

        let rows = stmt.query_map(params![days_modifier(days)], |row| {
            Ok(TemperatureStats {
                city: row.get(0)?,
                avg_temp: row.get(1)?,
                min_temp: row.get(2)?,
                max_temp: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Weather-category distribution within the last `days` days, most
    /// common first.
    pub fn weather_distribution(&self, days: u32) -> Result<Vec<WeatherCount>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT weather_main, COUNT(*)
             FROM weather_data
             WHERE data_timestamp >= datetime('now', 'localtime', ?1)
             GROUP BY weather_main
             ORDER BY COUNT(*) DESC",
        )?;

        let rows = stmt.query_map(params![days_modifier(days)], |row| {
            Ok(WeatherCount {
                weather_main: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Hourly average temperature and humidity over the last 24 hours.
    pub fn hourly_trends(&self) -> Result<Vec<HourlyTrend>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT CAST(strftime('%H', data_timestamp) AS INTEGER) AS hour,
                    AVG(temperature), AVG(humidity)
             FROM weather_data
             WHERE data_timestamp >= datetime('now', 'localtime', '-24 hours')
             GROUP BY hour
             ORDER BY hour",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(HourlyTrend {
                hour: row.get(0)?,
                avg_temperature: row.get(1)?,
                avg_humidity: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn days_modifier(days: u32) -> String {
    format!("-{days} days")
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WeatherRecord> {
    Ok(WeatherRecord {
        city: row.get(0)?,
        country: row.get(1)?,
        temperature: row.get(2)?,
        feels_like: row.get(3)?,
        humidity: row.get(4)?,
        pressure: row.get(5)?,
        weather_main: row.get(6)?,
        weather_description: row.get(7)?,
        wind_speed: row.get(8)?,
        wind_direction: row.get(9)?,
        visibility: row.get(10)?,
        data_timestamp: parse_timestamp(11, row.get(11)?)?,
    })
}

fn parse_timestamp(index: usize, raw: String) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, Local, Timelike};

    pub(crate) fn temp_store(name: &str) -> Store {
        let dir = std::env::temp_dir().join(format!("weather-etl-store-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create temp store dir");
        let path = dir.join(format!("{name}.db"));
        let _ = fs::remove_file(&path);
        Store::new(path)
    }

    pub(crate) fn record(city: &str, ts: NaiveDateTime, temperature: f64) -> WeatherRecord {
        WeatherRecord {
            city: city.to_string(),
            country: "GB".to_string(),
            temperature,
            feels_like: temperature - 1.0,
            humidity: 80.0,
            pressure: 1012.0,
            weather_main: "Clouds".to_string(),
            weather_description: "overcast clouds".to_string(),
            wind_speed: 3.1,
            wind_direction: 200.0,
            visibility: 10000.0,
            data_timestamp: ts,
        }
    }

    pub(crate) fn insert(store: &Store, records: &[WeatherRecord]) {
        let conn = store.connect().expect("connect");
        for r in records {
            conn.execute(
                "INSERT INTO weather_data
                 (city, country, temperature, feels_like, humidity, pressure,
                  weather_main, weather_description, wind_speed, wind_direction,
                  visibility, data_timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
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
                ],
            )
            .expect("insert test row");
        }
    }

    fn now() -> NaiveDateTime {
        let now = Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }

    #[test]
    fn latest_per_city_picks_the_newest_row() {
        let store = temp_store("latest");
        let base = now();

        insert(
            &store,
            &[
                record("London", base - Duration::hours(2), 10.0),
                record("London", base, 15.2),
                record("Tokyo", base - Duration::hours(1), 22.0),
            ],
        );

        let latest = store.latest_per_city().expect("query");
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].city, "London");
        assert_eq!(latest[0].temperature, 15.2);
        assert_eq!(latest[1].city, "Tokyo");
        assert_eq!(latest[1].temperature, 22.0);
    }

    #[test]
    fn history_is_windowed_and_newest_first() {
        let store = temp_store("history");
        let base = now();

        insert(
            &store,
            &[
                record("London", base - Duration::days(30), 1.0),
                record("London", base - Duration::hours(3), 12.0),
                record("London", base, 15.2),
            ],
        );

        let rows = store.history(7).expect("query");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].temperature, 15.2);
        assert_eq!(rows[1].temperature, 12.0);
    }

    #[test]
    fn city_history_filters_on_city() {
        let store = temp_store("city-history");
        let base = now();

        insert(
            &store,
            &[
                record("London", base, 15.2),
                record("Tokyo", base, 22.0),
            ],
        );

        let rows = store.city_history("Tokyo", 7).expect("query");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].city, "Tokyo");
        assert_eq!(rows[0].data_timestamp, base);
    }

    #[test]
    fn temperature_stats_aggregates_per_city() {
        let store = temp_store("stats");
        let base = now();

        insert(
            &store,
            &[
                record("London", base - Duration::hours(2), 10.0),
                record("London", base, 20.0),
                record("Tokyo", base, 30.0),
            ],
        );

        let stats = store.temperature_stats(7).expect("query");
        assert_eq!(stats.len(), 2);
        // Warmest average first.
        assert_eq!(stats[0].city, "Tokyo");
        assert_eq!(stats[1].city, "London");
        assert_eq!(stats[1].avg_temp, 15.0);
        assert_eq!(stats[1].min_temp, 10.0);
        assert_eq!(stats[1].max_temp, 20.0);
    }

    #[test]
    fn weather_distribution_counts_categories() {
        let store = temp_store("distribution");
        let base = now();

        let mut clear = record("Tokyo", base, 22.0);
        clear.weather_main = "Clear".to_string();

        insert(
            &store,
            &[
                record("London", base, 15.2),
                record("London", base - Duration::hours(1), 14.0),
                clear,
            ],
        );

        let counts = store.weather_distribution(7).expect("query");
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].weather_main, "Clouds");
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[1].weather_main, "Clear");
        assert_eq!(counts[1].count, 1);
    }

    #[test]
    fn hourly_trends_covers_the_last_day() {
        let store = temp_store("hourly");
        let base = now();

        insert(
            &store,
            &[
                record("London", base, 15.0),
                record("London", base - Duration::days(3), 5.0),
            ],
        );

        let trends = store.hourly_trends().expect("query");
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].hour, i64::from(base.hour()));
        assert_eq!(trends[0].avg_temperature, 15.0);
        assert_eq!(trends[0].avg_humidity, 80.0);
    }

    #[test]
    fn empty_store_returns_empty_results() {
        let store = temp_store("empty");

        assert!(store.latest_per_city().expect("query").is_empty());
        assert!(store.history(7).expect("query").is_empty());
        assert!(store.temperature_stats(7).expect("query").is_empty());
    }
}
