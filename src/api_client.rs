use crate::image_source::FetchedImage;
use crate::promotions::PromotionDraft;
use async_trait::async_trait;
use log::debug;
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API returned error: {message}")]
    ApiError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    MenuItem,
    Promotion,
}

impl RecordKind {
    pub fn collection(&self) -> &'static str {
        match self {
            RecordKind::MenuItem => "menu-items",
            RecordKind::Promotion => "promotions",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::MenuItem => write!(f, "menu item"),
            RecordKind::Promotion => write!(f, "promotion"),
        }
    }
}

/// A menu item or promotion as far as image seeding is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRecord {
    pub id: u64,
    pub kind: RecordKind,
    /// Every non-empty name the record carries, most preferred first.
    pub names: Vec<String>,
    pub has_image: bool,
}

impl StoreRecord {
    pub fn display_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or("unnamed")
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.names.iter().any(|candidate| candidate == name)
    }
}

/// Lookup and update of named records in the menu backend.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_records(&self, kind: RecordKind) -> Result<Vec<StoreRecord>, ApiError>;

    async fn attach_image(
        &self,
        record: &StoreRecord,
        file_name: &str,
        image: &FetchedImage,
    ) -> Result<(), ApiError>;

    async fn promotion_exists(&self, title: &str) -> Result<bool, ApiError>;

    async fn create_promotion(&self, draft: &PromotionDraft) -> Result<(), ApiError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
        }
    }
}

/// List endpoints answer either with a bare array or with a paged envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> Listing<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Listing::Plain(items) | Listing::Paged { results: items } => items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MenuItemPayload {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    name_uz: Option<String>,
    #[serde(default)]
    name_ru: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromotionPayload {
    id: u64,
    title: String,
    #[serde(default)]
    image: Option<String>,
}

fn has_value(field: &Option<String>) -> bool {
    field.as_deref().map_or(false, |value| !value.trim().is_empty())
}

impl From<MenuItemPayload> for StoreRecord {
    fn from(item: MenuItemPayload) -> Self {
        let has_image = has_value(&item.image);
        let names = [item.name_uz, item.name, item.name_ru]
            .into_iter()
            .flatten()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        Self {
            id: item.id,
            kind: RecordKind::MenuItem,
            names,
            has_image,
        }
    }
}

impl From<PromotionPayload> for StoreRecord {
    fn from(promotion: PromotionPayload) -> Self {
        Self {
            id: promotion.id,
            kind: RecordKind::Promotion,
            has_image: has_value(&promotion.image),
            names: vec![promotion.title],
        }
    }
}

fn parse_records(kind: RecordKind, body: &str) -> Result<Vec<StoreRecord>, ApiError> {
    let records = match kind {
        RecordKind::MenuItem => serde_json::from_str::<Listing<MenuItemPayload>>(body)?
            .into_items()
            .into_iter()
            .map(StoreRecord::from)
            .collect(),
        RecordKind::Promotion => serde_json::from_str::<Listing<PromotionPayload>>(body)?
            .into_items()
            .into_iter()
            .map(StoreRecord::from)
            .collect(),
    };
    Ok(records)
}

pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn collection_url(&self, kind: RecordKind) -> String {
        format!("{}/{}/", self.base_url, kind.collection())
    }

    fn record_url(&self, kind: RecordKind, id: u64) -> String {
        format!("{}/{}/{}/", self.base_url, kind.collection(), id)
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await?;
        let snippet: String = body.chars().take(200).collect();
        Err(ApiError::ApiError {
            message: format!("HTTP {}: {}", status, snippet),
        })
    }
}

#[async_trait]
impl RecordStore for ApiClient {
    async fn list_records(&self, kind: RecordKind) -> Result<Vec<StoreRecord>, ApiError> {
        let url = self.collection_url(kind);
        debug!("📡 GET {}", url);

        let mut request = self.client.get(&url);
        if kind == RecordKind::MenuItem {
            request = request.query(&[("show_all", "true")]);
        }
        let response = Self::ensure_success(request.send().await?).await?;
        let body = response.text().await?;

        parse_records(kind, &body)
    }

    async fn attach_image(
        &self,
        record: &StoreRecord,
        file_name: &str,
        image: &FetchedImage,
    ) -> Result<(), ApiError> {
        let url = self.record_url(record.kind, record.id);
        debug!("📤 PATCH {} ({} bytes)", url, image.bytes.len());

        let part = multipart::Part::bytes(image.bytes.clone())
            .file_name(file_name.to_string())
            .mime_str(image.mime_type())?;
        let form = multipart::Form::new().part("image", part);

        let response = self.client.patch(&url).multipart(form).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn promotion_exists(&self, title: &str) -> Result<bool, ApiError> {
        let promotions = self.list_records(RecordKind::Promotion).await?;
        Ok(promotions.iter().any(|record| record.is_named(title)))
    }

    async fn create_promotion(&self, draft: &PromotionDraft) -> Result<(), ApiError> {
        let url = self.collection_url(RecordKind::Promotion);
        let body = draft.to_request(chrono::Utc::now());
        debug!("📤 POST {} ({})", url, draft.title);

        let response = self.client.post(&url).json(&body).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_items_prefer_uzbek_name() {
        let body = r#"[
            {"id": 7, "name": "Miso Ramen", "name_uz": "Miso ramen", "name_ru": "", "image": null},
            {"id": 8, "name": "Gyoza", "image": "/media/menu/gyoza.jpg"}
        ]"#;
        let records = parse_records(RecordKind::MenuItem, body).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].names, vec!["Miso ramen", "Miso Ramen"]);
        assert_eq!(records[0].display_name(), "Miso ramen");
        assert!(!records[0].has_image);
        assert!(records[1].has_image);
        assert!(records[1].is_named("Gyoza"));
    }

    #[test]
    fn test_paged_promotion_listing() {
        let body = r#"{"count": 1, "results": [{"id": 3, "title": "Happy Hour", "image": ""}]}"#;
        let records = parse_records(RecordKind::Promotion, body).unwrap();

        assert_eq!(
            records,
            vec![StoreRecord {
                id: 3,
                kind: RecordKind::Promotion,
                names: vec!["Happy Hour".to_string()],
                has_image: false,
            }]
        );
    }

    #[test]
    fn test_unnamed_record() {
        let records = parse_records(RecordKind::MenuItem, r#"[{"id": 1}]"#).unwrap();
        assert_eq!(records[0].display_name(), "unnamed");
    }

    #[test]
    fn test_malformed_listing_is_a_json_error() {
        let result = parse_records(RecordKind::Promotion, r#"{"detail": "nope"}"#);
        assert!(matches!(result, Err(ApiError::JsonError(_))));
    }

    #[test]
    fn test_urls_use_trailing_slash_collections() {
        let client = ApiClient::new(&ApiConfig {
            endpoint: "https://api.example.test/api/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();

        assert_eq!(
            client.collection_url(RecordKind::MenuItem),
            "https://api.example.test/api/menu-items/"
        );
        assert_eq!(
            client.record_url(RecordKind::Promotion, 12),
            "https://api.example.test/api/promotions/12/"
        );
    }
}
