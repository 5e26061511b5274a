use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{CardWatchError, Result};
use crate::matching::fold_digits;
use crate::models::source::{PriceType, SourceMetadata, SourceRecord, SourceType};

// ---------------------------------------------------------------------------
// SourcePayload - what a scraper hands over for one listing
// ---------------------------------------------------------------------------

/// Scraped listing data, as produced by the marketplace scrapers.
///
/// Field names follow the scrapers' camelCase JSON. Prices that are absent or
/// zero are treated as "not published" and never recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePayload {
    pub source_type: Option<SourceType>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub product_id: Option<String>,
    pub currency: Option<String>,
    pub market_price: Option<f64>,
    pub ungraded_price: Option<f64>,
    pub grade7_price: Option<f64>,
    pub grade8_price: Option<f64>,
    pub grade9_price: Option<f64>,
    pub grade95_price: Option<f64>,
    pub grade10_price: Option<f64>,
    pub set_display: Option<String>,
    pub rarity: Option<String>,
    pub image_url: Option<String>,
    pub jp_no: Option<String>,
    pub card_number: Option<String>,
}

impl SourcePayload {
    /// Parse and validate a raw scraper payload.
    ///
    /// Rejects non-object values and payloads without a recognised
    /// `sourceType`; nothing is coerced.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            CardWatchError::MalformedPayload(format!(
                "expected a JSON object, got {}",
                json_kind(value)
            ))
        })?;

        let source_type = match obj.get("sourceType") {
            None | Some(serde_json::Value::Null) => {
                return Err(CardWatchError::MalformedPayload(
                    "missing sourceType".to_string(),
                ))
            }
            Some(serde_json::Value::String(s)) => s
                .parse::<SourceType>()
                .map_err(|_| CardWatchError::MalformedPayload(format!("unknown sourceType '{}'", s)))?,
            Some(other) => {
                return Err(CardWatchError::MalformedPayload(format!(
                    "sourceType must be a string, got {}",
                    json_kind(other)
                )))
            }
        };

        let mut rest = obj.clone();
        rest.remove("sourceType");
        let mut payload: SourcePayload = serde_json::from_value(serde_json::Value::Object(rest))
            .map_err(|e| CardWatchError::MalformedPayload(e.to_string()))?;
        payload.source_type = Some(source_type);
        Ok(payload)
    }

    /// The source type, which every validated payload carries.
    pub fn require_source_type(&self) -> Result<SourceType> {
        self.source_type
            .ok_or_else(|| CardWatchError::MalformedPayload("missing sourceType".to_string()))
    }

    /// Published prices keyed by type. Zero, negative and non-finite values are skipped.
    pub fn prices(&self) -> BTreeMap<PriceType, f64> {
        [
            (PriceType::Market, self.market_price),
            (PriceType::Ungraded, self.ungraded_price),
            (PriceType::Grade7, self.grade7_price),
            (PriceType::Grade8, self.grade8_price),
            (PriceType::Grade9, self.grade9_price),
            (PriceType::Grade95, self.grade95_price),
            (PriceType::Grade10, self.grade10_price),
        ]
        .into_iter()
        .filter_map(|(t, p)| p.filter(|v| v.is_finite() && *v > 0.0).map(|v| (t, v)))
        .collect()
    }

    /// Card number reported by the scraper itself.
    ///
    /// Prefers an explicit `cardNumber`; otherwise takes the leading number
    /// of a `jpNo` such as `"112/101"`.
    pub fn scraped_number(&self) -> Option<String> {
        if let Some(n) = self.card_number.as_deref().map(|n| fold_digits(n.trim())) {
            if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) {
                return Some(n);
            }
        }
        let jp_no = fold_digits(self.jp_no.as_deref()?.trim());
        let (head, tail) = jp_no.split_once('/')?;
        let is_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        if is_digits(head) && is_digits(tail) {
            Some(head.to_string())
        } else {
            None
        }
    }

    /// Convert into a stored observation stamped at `checked_at`.
    ///
    /// `fallback_url` is used when the scraper did not echo the listing URL.
    pub fn to_record(&self, fallback_url: &str, checked_at: DateTime<Utc>) -> Result<SourceRecord> {
        let source_type = self.require_source_type()?;
        let url = self
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(fallback_url);

        Ok(SourceRecord {
            source_type,
            url: strip_query(url).to_string(),
            product_id: self.product_id.clone().filter(|p| !p.is_empty()),
            currency: self
                .currency
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| config::DEFAULT_CURRENCY.to_string()),
            price_by_type: self.prices(),
            metadata: SourceMetadata {
                set_display: non_empty(&self.set_display),
                rarity: non_empty(&self.rarity),
                image_url: non_empty(&self.image_url),
                number: self.scraped_number(),
            },
            last_checked_at: Some(checked_at),
        })
    }
}

/// Listing URLs are stored without their query string.
pub fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
