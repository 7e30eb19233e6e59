use async_trait::async_trait;
use futures_util::StreamExt;
use image::ImageFormat;
use log::debug;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("No image found for {0}")]
    NotFound(String),

    #[error("Transient failure fetching {url}: {reason}")]
    Transient { url: String, reason: String },

    #[error("Payload from {0} is not a recognized image")]
    NotAnImage(String),

    #[error("Image from {url} is larger than {limit} bytes")]
    TooLarge { url: String, limit: usize },
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }

    fn transient(url: &str, error: reqwest::Error) -> Self {
        FetchError::Transient {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }

    /// 404/410 mean "nothing there"; throttling, timeouts and server errors
    /// are worth trying again later; everything else is treated as not found.
    fn from_status(url: &str, status: StatusCode) -> Self {
        let retryable = status.is_server_error()
            || status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::REQUEST_TIMEOUT;
        if retryable {
            FetchError::Transient {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            }
        } else {
            FetchError::NotFound(format!("{} (HTTP {})", url, status))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageQuery {
    /// Free-text search terms, already joined with `+`.
    Keywords(String),
    /// A known image URL.
    Direct(String),
}

#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub source_url: String,
}

impl FetchedImage {
    pub fn from_bytes(bytes: Vec<u8>, source_url: impl Into<String>) -> Result<Self, FetchError> {
        let source_url = source_url.into();
        let format = image::guess_format(&bytes)
            .map_err(|_| FetchError::NotAnImage(source_url.clone()))?;
        Ok(Self {
            bytes,
            format,
            source_url,
        })
    }

    pub fn mime_type(&self) -> &'static str {
        match self.format {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            _ => "application/octet-stream",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self.format {
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            _ => "jpg",
        }
    }
}

/// Something that turns a query into image bytes.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, query: &ImageQuery) -> Result<FetchedImage, FetchError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSourceConfig {
    pub base_url: String,
    pub size: String,
    pub category: String,
    /// Keyword lookups must end up on a host containing this string.
    pub allowed_host: String,
    pub lookup_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub max_bytes: usize,
}

impl Default for ImageSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://source.unsplash.com".to_string(),
            size: "800x800".to_string(),
            category: "food".to_string(),
            allowed_host: "unsplash.com".to_string(),
            lookup_timeout_secs: 10,
            download_timeout_secs: 15,
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Stock-photo service that redirects a keyword URL to a matching photo.
pub struct StockPhotoSource {
    client: reqwest::Client,
    config: ImageSourceConfig,
}

impl StockPhotoSource {
    pub fn new(config: ImageSourceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn search_url(&self, keywords: &str) -> String {
        format!(
            "{}/{}/?{},{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.size,
            self.config.category,
            keywords
        )
    }

    async fn resolve(&self, keywords: &str) -> Result<String, FetchError> {
        let url = self.search_url(keywords);
        debug!("🔍 HEAD {}", url);

        let response = self
            .client
            .head(&url)
            .timeout(Duration::from_secs(self.config.lookup_timeout_secs))
            .send()
            .await
            .map_err(|e| FetchError::transient(&url, e))?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::from_status(&url, response.status()));
        }

        let final_url = response.url().clone();
        let on_allowed_host = final_url
            .host_str()
            .map_or(false, |host| host.contains(&self.config.allowed_host));
        if !on_allowed_host {
            return Err(FetchError::NotFound(format!("{} (redirected to {})", url, final_url)));
        }

        Ok(final_url.to_string())
    }

    async fn download(&self, url: &str) -> Result<FetchedImage, FetchError> {
        debug!("📥 GET {}", url);
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(self.config.download_timeout_secs))
            .send()
            .await
            .map_err(|e| FetchError::transient(url, e))?;

        if !response.status().is_success() {
            return Err(FetchError::from_status(url, response.status()));
        }

        let limit = self.config.max_bytes;
        if response.content_length().map_or(false, |length| length as usize > limit) {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit,
            });
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::transient(url, e))?;
            if bytes.len() + chunk.len() > limit {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    limit,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        FetchedImage::from_bytes(bytes, url)
    }
}

#[async_trait]
impl ImageSource for StockPhotoSource {
    async fn fetch(&self, query: &ImageQuery) -> Result<FetchedImage, FetchError> {
        let url = match query {
            ImageQuery::Keywords(keywords) => self.resolve(keywords).await?,
            ImageQuery::Direct(url) => url.clone(),
        };
        self.download(&url).await
    }
}
