use crate::config::ConfigError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    Percentage(u8),
    /// Flat amount in the menu's currency minor units.
    Fixed(u64),
}

fn default_duration_days() -> i64 {
    365
}

fn default_active() -> bool {
    true
}

/// A promotion to create if no promotion with the same title exists yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionDraft {
    pub title: String,
    pub description: String,
    pub discount: Discount,
    #[serde(default = "default_duration_days")]
    pub duration_days: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Body of `POST /promotions/`.
#[derive(Debug, Serialize)]
pub struct PromotionRequest<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub discount_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<u64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
}

impl PromotionDraft {
    pub fn to_request(&self, now: DateTime<Utc>) -> PromotionRequest<'_> {
        let (discount_type, discount_percentage, discount_amount) = match self.discount {
            Discount::Percentage(percent) => ("percentage", Some(percent), None),
            Discount::Fixed(amount) => ("fixed", None, Some(amount)),
        };

        PromotionRequest {
            title: &self.title,
            description: &self.description,
            discount_type,
            discount_percentage,
            discount_amount,
            start_date: now,
            end_date: now + Duration::days(self.duration_days),
            is_active: self.is_active,
        }
    }
}

/// Reads a JSON array of promotion drafts.
pub fn load_drafts(path: &Path) -> Result<Vec<PromotionDraft>, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
