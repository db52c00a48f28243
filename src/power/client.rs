use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use crate::config::PowerConfig;
use crate::error::ChainError;
use crate::models::{Location, QueryParameters};

pub(crate) const USER_AGENT: &str = concat!("PowerFetch/", env!("CARGO_PKG_VERSION"));

/// Client for the NASA POWER hourly point endpoint
#[derive(Clone)]
pub struct PowerClient {
    client: Client,
    base_url: String,
}

impl PowerClient {
    pub fn new(config: &PowerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(USER_AGENT)
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Full request URL for one point
    #[must_use]
    pub fn point_url(&self, location: &Location, params: &QueryParameters) -> String {
        let mut query: Vec<(&str, String)> = params.power_query_pairs();
        query.insert(2, ("latitude", location.latitude.to_string()));
        query.insert(3, ("longitude", location.longitude.to_string()));

        let query = query
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.base_url)
    }

    /// Fetch the raw CSV for one location
    #[instrument(skip(self, params), fields(location = %location))]
    pub async fn fetch_point(
        &self,
        location: &Location,
        params: &QueryParameters,
    ) -> std::result::Result<String, ChainError> {
        let url = self.point_url(location, params);
        debug!("POWER API request URL: {}", url);
        let start_time = Instant::now();

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("POWER API returned {} for {}", status, location);
            return Err(ChainError::Fetch {
                status: status.as_u16(),
                body,
            });
        }

        let csv = response.text().await?;
        info!(
            "Retrieved {} bytes for {} in {:.3}s",
            csv.len(),
            location,
            start_time.elapsed().as_secs_f64()
        );
        Ok(csv)
    }
}
