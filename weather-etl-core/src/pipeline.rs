use crate::{
    config::Config,
    extract::{Extract, WeatherExtractor},
    load::{Load, WeatherLoader},
    store::Store,
    transform::WeatherTransformer,
};
use log::{error, info, warn};

/// Result of one extract-transform-load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Success,
    Failed,
}

/// Wires the three stages together and tracks consecutive failures.
///
/// Every stage error is absorbed here and turned into a failed tick; nothing
/// escapes the orchestrator except the exhaustion signal the caller reads
/// via [`EtlPipeline::is_exhausted`].
#[derive(Debug)]
pub struct EtlPipeline {
    extractor: Box<dyn Extract>,
    transformer: WeatherTransformer,
    loader: Box<dyn Load>,
    max_failures: u32,
    consecutive_failures: u32,
}

impl EtlPipeline {
    pub fn new(extractor: Box<dyn Extract>, loader: Box<dyn Load>, max_failures: u32) -> Self {
        Self {
            extractor,
            transformer: WeatherTransformer::new(),
            loader,
            max_failures,
            consecutive_failures: 0,
        }
    }

    /// Build a pipeline with the real extractor and loader from config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Box::new(WeatherExtractor::new(config)),
            Box::new(WeatherLoader::new(Store::new(&config.database))),
            config.max_failures,
        )
    }

    /// Execute one full cycle. A successful run resets the failure counter;
    /// any failure increments it.
    pub async fn run_tick(&mut self) -> TickOutcome {
        let outcome = self.execute_stages().await;

        match outcome {
            TickOutcome::Success => self.consecutive_failures = 0,
            TickOutcome::Failed => {
                self.consecutive_failures += 1;
                warn!(
                    "Pipeline tick failed ({} consecutive failure(s), ceiling {})",
                    self.consecutive_failures, self.max_failures
                );
            }
        }

        outcome
    }

    async fn execute_stages(&self) -> TickOutcome {
        info!("Starting ETL pipeline...");

        info!("Extracting weather data...");
        let raw_data = self.extractor.fetch_all_cities().await;

        if raw_data.is_empty() {
            warn!("No data extracted");
            return TickOutcome::Failed;
        }

        info!("Transforming data...");
        let records = self.transformer.transform_weather_data(raw_data);
        let records = self.transformer.validate_data(records);

        if records.is_empty() {
            warn!("No valid data after transformation");
            return TickOutcome::Failed;
        }

        info!("Loading data into database...");
        if self.loader.load_data(&records) {
            info!("ETL pipeline completed successfully");
            TickOutcome::Success
        } else {
            error!("ETL pipeline failed during loading");
            TickOutcome::Failed
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// True once the consecutive-failure ceiling has been reached; the
    /// controlling process must stop scheduling and exit non-zero.
    pub fn is_exhausted(&self) -> bool {
        self.consecutive_failures >= self.max_failures
    }
}
