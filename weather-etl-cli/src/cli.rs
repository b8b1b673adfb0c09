use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use weather_etl_core::{
    Config, EtlPipeline, Scheduler, Store, TickOutcome, logging,
    store::{HistoryRow, TemperatureStats},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-etl", version, about = "Hourly weather observation ETL pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline once, then keep running it on the hourly schedule.
    Run,

    /// Run a single extract-transform-load cycle and exit.
    Once,

    /// Store the weather API key in the configuration file.
    Configure,

    /// Show the most recent stored observation for every city.
    Latest,

    /// Show stored observations within a time window.
    History {
        /// Window size in days.
        #[arg(long, default_value_t = 7)]
        days: u32,

        /// Limit output to a single city.
        #[arg(long)]
        city: Option<String>,
    },

    /// Show aggregate statistics over a time window.
    Stats {
        /// Window size in days.
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Run => run_daemon().await,
            Command::Once => run_once().await,
            Command::Configure => configure(),
            Command::Latest => latest(),
            Command::History { days, city } => history(days, city.as_deref()),
            Command::Stats { days } => stats(days),
        }
    }
}

/// `run`: immediate tick, then the hourly loop. Returns Ok (exit 0) on an
/// interrupt-driven shutdown; the failure ceiling surfaces as an error and a
/// non-zero exit.
async fn run_daemon() -> Result<()> {
    let config = Config::load()?;
    logging::init(&config)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
        })
        .context("Failed to install interrupt handler")?;
    }

    let mut pipeline = build_pipeline(&config)?;
    let scheduler = Scheduler::new(
        config.schedule_interval(),
        config.poll_interval(),
        shutdown,
    );

    scheduler.run(&mut pipeline).await
}

async fn run_once() -> Result<()> {
    let config = Config::load()?;
    logging::init(&config)?;

    let mut pipeline = build_pipeline(&config)?;
    match pipeline.run_tick().await {
        TickOutcome::Success => Ok(()),
        TickOutcome::Failed => Err(anyhow!("Pipeline run failed; see the log for details")),
    }
}

fn build_pipeline(config: &Config) -> Result<EtlPipeline> {
    config.require_api_key()?;
    Ok(EtlPipeline::from_config(config))
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    config.api_key = api_key;
    config.save()?;

    println!(
        "Configuration saved to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

fn latest() -> Result<()> {
    let config = Config::load()?;
    let store = Store::new(&config.database);

    let records = store.latest_per_city()?;
    if records.is_empty() {
        println!("No observations stored yet.");
        return Ok(());
    }

    for r in records {
        println!(
            "{:<12} {:>6.1}°C (feels like {:.1}°C)  {:>5.1}% humidity  {:<20} {}",
            r.city,
            r.temperature,
            r.feels_like,
            r.humidity,
            r.weather_description,
            r.data_timestamp.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}

fn history(days: u32, city: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let store = Store::new(&config.database);

    match city {
        Some(city) => {
            let records = store.city_history(city, days)?;
            if records.is_empty() {
                println!("No observations for {city} in the last {days} day(s).");
                return Ok(());
            }
            for r in records {
                println!(
                    "{}  {:>6.1}°C  {:>5.1}%  {:>7.1} hPa  {}",
                    r.data_timestamp.format("%Y-%m-%d %H:%M:%S"),
                    r.temperature,
                    r.humidity,
                    r.pressure,
                    r.weather_description,
                );
            }
        }
        None => {
            let rows = store.history(days)?;
            if rows.is_empty() {
                println!("No observations in the last {days} day(s).");
                return Ok(());
            }
            for HistoryRow {
                city,
                temperature,
                humidity,
                pressure,
                data_timestamp,
            } in rows
            {
                println!(
                    "{}  {:<12} {:>6.1}°C  {:>5.1}%  {:>7.1} hPa",
                    data_timestamp.format("%Y-%m-%d %H:%M:%S"),
                    city,
                    temperature,
                    humidity,
                    pressure,
                );
            }
        }
    }
    Ok(())
}

fn stats(days: u32) -> Result<()> {
    let config = Config::load()?;
    let store = Store::new(&config.database);

    let temperature = store.temperature_stats(days)?;
    if temperature.is_empty() {
        println!("No observations in the last {days} day(s).");
        return Ok(());
    }

    println!("Temperature over the last {days} day(s):");
    for TemperatureStats {
        city,
        avg_temp,
        min_temp,
        max_temp,
    } in temperature
    {
        println!("  {city:<12} avg {avg_temp:>6.1}°C  min {min_temp:>6.1}°C  max {max_temp:>6.1}°C");
    }

    println!("\nWeather conditions:");
    for count in store.weather_distribution(days)? {
        println!("  {:<16} {:>4}", count.weather_main, count.count);
    }

    println!("\nHourly averages over the last 24 hours:");
    for trend in store.hourly_trends()? {
        println!(
            "  {:02}:00  {:>6.1}°C  {:>5.1}% humidity",
            trend.hour, trend.avg_temperature, trend.avg_humidity
        );
    }

    Ok(())
}
