//! Assessor photo retrieval.
//!
//! Photos live under a path derived from the PIN. Requests run one at a time
//! with a randomized pause between them to stay under the host's rate limit.

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::ports::{Storage, Throttle};
use crate::utils::error::{HousesError, Result};

pub const DEFAULT_IMAGE_BASE_URL: &str =
    "https://prodassets.cookcountyassessor.com/s3fs-public/pin_detail";
pub const DEFAULT_IMAGE_SUFFIX: &str = "AA";
pub const DEFAULT_IMAGE_EXTENSION: &str = "JPG";

/// Build the photo URL for a PIN: `{base}/{p[0:3]}-{p[3:5]}/{p[5:8]}/{pin}_{suffix}.{ext}`.
pub fn image_url(base_url: &str, pin: &str, suffix: &str, extension: &str) -> Result<String> {
    if pin.len() < 8 || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(HousesError::InvalidPin {
            pin: pin.to_string(),
            reason: "expected at least 8 ASCII digits".to_string(),
        });
    }

    Ok(format!(
        "{}/{}-{}/{}/{}_{}.{}",
        base_url.trim_end_matches('/'),
        &pin[0..3],
        &pin[3..5],
        &pin[5..8],
        pin,
        suffix,
        extension
    ))
}

/// Pause drawn uniformly from `[min, max)`; `min` when the range is empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayPolicy {
    pub min: Duration,
    pub max: Duration,
}

impl DelayPolicy {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..self.max)
    }
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(10))
    }
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioThrottle;

#[async_trait]
impl Throttle for TokioThrottle {
    async fn pause(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Clone)]
pub struct ImageEndpoint {
    pub base_url: String,
    pub suffix: String,
    pub extension: String,
}

impl Default for ImageEndpoint {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            suffix: DEFAULT_IMAGE_SUFFIX.to_string(),
            extension: DEFAULT_IMAGE_EXTENSION.to_string(),
        }
    }
}

pub struct ImageFetcher<S: Storage, T: Throttle> {
    client: Client,
    storage: S,
    throttle: T,
    policy: DelayPolicy,
    endpoint: ImageEndpoint,
}

impl<S: Storage, T: Throttle> ImageFetcher<S, T> {
    pub fn new(client: Client, storage: S, throttle: T) -> Self {
        Self {
            client,
            storage,
            throttle,
            policy: DelayPolicy::default(),
            endpoint: ImageEndpoint::default(),
        }
    }

    pub fn with_policy(mut self, policy: DelayPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_endpoint(mut self, endpoint: ImageEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Fetch one photo. `Ok(None)` when the host answered with something that
    /// is not an image.
    pub async fn fetch_one(&self, pin: &str) -> Result<Option<String>> {
        let url = image_url(
            &self.endpoint.base_url,
            pin,
            &self.endpoint.suffix,
            &self.endpoint.extension,
        )?;
        debug!("Attempting to retrieve image at {}", url);

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        let format = match image::guess_format(&bytes) {
            Ok(format) => format,
            Err(_) => {
                debug!("{}: response was not a valid image", pin);
                return Ok(None);
            }
        };
        let extension = format.extensions_str().first().copied().unwrap_or("img");

        let file_name = format!("{}.{}", pin, extension);
        self.storage.write_file(&file_name, &bytes).await?;

        let path = self.storage.locate(&file_name);
        debug!("{}: created image at {}", pin, path);
        Ok(Some(path))
    }

    /// Fetch photos for every PIN in order. Failures become `None` for that PIN.
    pub async fn fetch_all(&self, pins: &[String]) -> Vec<Option<String>> {
        let mut paths = Vec::with_capacity(pins.len());

        for (i, pin) in pins.iter().enumerate() {
            if i > 0 {
                self.throttle.pause(self.policy.sample()).await;
            }
            info!("Fetching image {} of {}...", i + 1, pins.len());

            let path = match self.fetch_one(pin).await {
                Ok(path) => path,
                Err(e) => {
                    warn!("{}: image retrieval failed: {}", pin, e);
                    None
                }
            };
            paths.push(path);
        }

        let saved = paths.iter().filter(|p| p.is_some()).count();
        info!("Image retrieval complete: {} of {} saved", saved, pins.len());
        paths
    }
}
