use crate::{config::Config, model::RawObservation};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt::Debug;

/// Extraction seam: produces the raw payloads for one tick.
///
/// Per-city failures are handled inside the implementation; the caller only
/// sees the payloads that were fetched successfully.
#[async_trait]
pub trait Extract: Send + Sync + Debug {
    async fn fetch_all_cities(&self) -> Vec<RawObservation>;
}

/// Fetches current observations for the configured cities, one request per
/// city, sequentially.
#[derive(Debug, Clone)]
pub struct WeatherExtractor {
    api_key: String,
    base_url: String,
    cities: Vec<String>,
    http: Client,
}

impl WeatherExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.api_base_url.clone(),
            cities: config.cities.clone(),
            http: Client::new(),
        }
    }

    /// Fetch the current observation for a single city, in metric units.
    pub async fn fetch_city(&self, city: &str) -> Result<RawObservation> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to send weather request for {city}"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read weather response body for {city}"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "Weather request for {} failed with status {}: {}",
                city,
                status,
                truncate_body(&body),
            ));
        }

        let parsed: RawObservation = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse weather JSON for {city}"))?;

        Ok(parsed)
    }
}

#[async_trait]
impl Extract for WeatherExtractor {
    /// Fetch all configured cities. A city that fails is logged and omitted;
    /// the batch continues with the next one.
    async fn fetch_all_cities(&self) -> Vec<RawObservation> {
        let mut payloads = Vec::with_capacity(self.cities.len());

        for city in &self.cities {
            match self.fetch_city(city).await {
                Ok(payload) => payloads.push(payload),
                Err(e) => log::error!("Error fetching data for {city}: {e:#}"),
            }
        }

        payloads
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        format!("{}...", &body[..MAX])
    } else {
        body.to_string()
    }
}
