//! HTTP client for the drone and pilot endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use birdnest_core::{DroneSnapshot, PilotRecord};

use crate::error::FetchError;
use crate::pilot::parse_pilot;
use crate::snapshot::parse_snapshot;
use crate::source::{DroneFeed, PilotDirectory};

pub const DEFAULT_DRONES_URL: &str = "https://assignments.reaktor.com/birdnest/drones";
pub const DEFAULT_PILOTS_URL: &str = "https://assignments.reaktor.com/birdnest/pilots";

/// Client for the Birdnest monitoring endpoints.
#[derive(Debug, Clone)]
pub struct BirdnestClient {
    client: Client,
    drones_url: String,
    pilots_url: String,
}

impl BirdnestClient {
    /// Create a client. Every request is bounded by `timeout`.
    pub fn new(
        drones_url: impl Into<String>,
        pilots_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("birdnest/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            drones_url: drones_url.into(),
            pilots_url: pilots_url.into(),
        })
    }

    /// URL of the pilot behind `serial`, with the serial as the last path segment.
    pub fn pilot_url(&self, serial: &str) -> Result<Url, FetchError> {
        let mut url =
            Url::parse(&self.pilots_url).map_err(|err| FetchError::parse("pilot url", err))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::parse("pilot url", "url cannot be a base"))?
            .pop_if_empty()
            .push(serial);
        Ok(url)
    }

    async fn get_bytes(&self, url: Url) -> Result<(StatusCode, Vec<u8>), FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;
        Ok((status, body.to_vec()))
    }
}

fn status_error(url: &Url, status: StatusCode, body: &[u8]) -> FetchError {
    FetchError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).chars().take(200).collect(),
    }
}

#[async_trait]
impl DroneFeed for BirdnestClient {
    async fn fetch_snapshot(&self) -> Result<DroneSnapshot, FetchError> {
        let url =
            Url::parse(&self.drones_url).map_err(|err| FetchError::parse("drones url", err))?;
        let (status, body) = self.get_bytes(url.clone()).await?;
        if !status.is_success() {
            return Err(status_error(&url, status, &body));
        }

        let xml = std::str::from_utf8(&body).map_err(|err| FetchError::parse("drone snapshot", err))?;
        let snapshot = parse_snapshot(xml)?;
        tracing::trace!("Fetched snapshot with {} drones", snapshot.drones.len());
        Ok(snapshot)
    }
}

#[async_trait]
impl PilotDirectory for BirdnestClient {
    async fn resolve(&self, drone_serial: &str) -> Result<PilotRecord, FetchError> {
        let url = self.pilot_url(drone_serial)?;
        let (status, body) = self.get_bytes(url.clone()).await?;

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                serial: drone_serial.to_string(),
            });
        }
        if !status.is_success() {
            return Err(status_error(&url, status, &body));
        }

        parse_pilot(&body)
    }
}
