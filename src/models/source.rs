use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::CardWatchError;

// ---------------------------------------------------------------------------
// SourceType - the marketplace a record was scraped from
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceType {
    #[serde(rename = "tcgplayer")]
    TcgPlayer,
    #[serde(rename = "pricecharting")]
    PriceCharting,
}

impl SourceType {
    pub const ALL: [SourceType; 2] = [SourceType::TcgPlayer, SourceType::PriceCharting];

    /// Detect the marketplace from a listing URL by host substring.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.contains(config::TCGPLAYER_HOST) {
            Some(SourceType::TcgPlayer)
        } else if url.contains(config::PRICECHARTING_HOST) {
            Some(SourceType::PriceCharting)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::TcgPlayer => "tcgplayer",
            SourceType::PriceCharting => "pricecharting",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SourceType::TcgPlayer => "TCGplayer",
            SourceType::PriceCharting => "PriceCharting",
        }
    }

    /// Price types this marketplace publishes.
    pub fn price_types(&self) -> &'static [PriceType] {
        match self {
            SourceType::TcgPlayer => &[PriceType::Market],
            SourceType::PriceCharting => &[
                PriceType::Ungraded,
                PriceType::Grade7,
                PriceType::Grade8,
                PriceType::Grade9,
                PriceType::Grade95,
                PriceType::Grade10,
            ],
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = CardWatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcgplayer" => Ok(SourceType::TcgPlayer),
            "pricecharting" => Ok(SourceType::PriceCharting),
            other => Err(CardWatchError::InvalidArgument(format!(
                "Unknown source type: {}",
                other
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// PriceType - closed set of price tiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceType {
    Market,
    Ungraded,
    Grade7,
    Grade8,
    Grade9,
    Grade95,
    Grade10,
}

impl PriceType {
    pub const ALL: [PriceType; 7] = [
        PriceType::Market,
        PriceType::Ungraded,
        PriceType::Grade7,
        PriceType::Grade8,
        PriceType::Grade9,
        PriceType::Grade95,
        PriceType::Grade10,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceType::Market => "market",
            PriceType::Ungraded => "ungraded",
            PriceType::Grade7 => "grade7",
            PriceType::Grade8 => "grade8",
            PriceType::Grade9 => "grade9",
            PriceType::Grade95 => "grade95",
            PriceType::Grade10 => "grade10",
        }
    }

    /// The marketplace whose figure wins when both sources carry this type.
    pub fn authority(&self) -> SourceType {
        match self {
            PriceType::Market => SourceType::TcgPlayer,
            _ => SourceType::PriceCharting,
        }
    }
}

impl fmt::Display for PriceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceType {
    type Err = CardWatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PriceType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CardWatchError::InvalidArgument(format!("Unknown price type: {}", s)))
    }
}

// ---------------------------------------------------------------------------
// SourceRecord - one marketplace observation of a card
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    pub set_display: Option<String>,
    pub rarity: Option<String>,
    pub image_url: Option<String>,
    pub number: Option<String>,
}

impl SourceMetadata {
    /// Overwrite fields that `newer` carries; absent fields keep their value.
    pub fn overwrite_with(&mut self, newer: &SourceMetadata) {
        if let Some(v) = &newer.set_display {
            self.set_display = Some(v.clone());
        }
        if let Some(v) = &newer.rarity {
            self.rarity = Some(v.clone());
        }
        if let Some(v) = &newer.image_url {
            self.image_url = Some(v.clone());
        }
        if let Some(v) = &newer.number {
            self.number = Some(v.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub source_type: SourceType,
    pub url: String,
    pub product_id: Option<String>,
    pub currency: String,
    #[serde(default)]
    pub price_by_type: BTreeMap<PriceType, f64>,
    #[serde(default)]
    pub metadata: SourceMetadata,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl SourceRecord {
    pub fn new(source_type: SourceType, url: impl Into<String>) -> Self {
        Self {
            source_type,
            url: url.into(),
            product_id: None,
            currency: config::DEFAULT_CURRENCY.to_string(),
            price_by_type: BTreeMap::new(),
            metadata: SourceMetadata::default(),
            last_checked_at: None,
        }
    }

    pub fn with_price(mut self, price_type: PriceType, price: f64) -> Self {
        self.price_by_type.insert(price_type, price);
        self
    }

    pub fn price(&self, price_type: PriceType) -> Option<f64> {
        self.price_by_type.get(&price_type).copied()
    }

    /// Per-type upsert: every price in `prices` replaces the stored one,
    /// types missing from `prices` are left as they are.
    pub fn upsert_prices(&mut self, prices: &BTreeMap<PriceType, f64>) {
        for (price_type, price) in prices {
            self.price_by_type.insert(*price_type, *price);
        }
    }

    /// Drop every price type this record's marketplace does not publish.
    pub fn retain_own_prices(&mut self) {
        let own = self.source_type.price_types();
        self.price_by_type.retain(|t, _| own.contains(t));
    }
}
