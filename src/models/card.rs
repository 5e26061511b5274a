use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::identity::CardIdentity;
use crate::models::source::{PriceType, SourceRecord, SourceType};

// ---------------------------------------------------------------------------
// CardMetadata - consolidated descriptive fields of a card
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMetadata {
    pub set_display: Option<String>,
    pub rarity: Option<String>,
    pub image_url: Option<String>,
    pub number: Option<String>,
}

// ---------------------------------------------------------------------------
// Card - the merge unit, owning one record per marketplace
// ---------------------------------------------------------------------------

/// A physical card and every marketplace observation of it.
///
/// All `sources` are mutually the same card, and there is at most one
/// record per [`SourceType`]. A card with more than one source is merged.
/// `merge_group_id` only links independent pre-existing cards that were
/// grouped under another card during a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub identity: CardIdentity,
    #[serde(default)]
    pub metadata: CardMetadata,
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
    pub merge_group_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn is_merged(&self) -> bool {
        self.sources.len() > 1 || self.merge_group_id.is_some()
    }

    pub fn source(&self, source_type: SourceType) -> Option<&SourceRecord> {
        self.sources.iter().find(|s| s.source_type == source_type)
    }

    pub fn source_mut(&mut self, source_type: SourceType) -> Option<&mut SourceRecord> {
        self.sources.iter_mut().find(|s| s.source_type == source_type)
    }

    /// Displayed price for `price_type`.
    ///
    /// Read from the type's authoritative marketplace first, then from any
    /// other source carrying it.
    pub fn price(&self, price_type: PriceType) -> Option<f64> {
        self.source(price_type.authority())
            .and_then(|s| s.price(price_type))
            .or_else(|| self.sources.iter().find_map(|s| s.price(price_type)))
    }

    /// Every displayable price across all sources.
    pub fn fused_prices(&self) -> BTreeMap<PriceType, f64> {
        PriceType::ALL
            .iter()
            .filter_map(|t| self.price(*t).map(|p| (*t, p)))
            .collect()
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        self.sources.iter().filter_map(|s| s.last_checked_at).max()
    }
}

// ---------------------------------------------------------------------------
// CardView - display projection of a card
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLink {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub url: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub id: String,
    pub name: String,
    pub number: String,
    pub is_merged: bool,
    pub source_count: usize,
    pub sources: Vec<SourceLink>,
    pub pricing: BTreeMap<PriceType, f64>,
    pub set_display: Option<String>,
    pub rarity: Option<String>,
    pub image_url: Option<String>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub merged_urls: Vec<String>,
    pub merged_sources: Vec<SourceType>,
}

impl From<&Card> for CardView {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id.clone(),
            name: card.identity.name.clone(),
            number: card.identity.number.clone(),
            is_merged: card.is_merged(),
            source_count: card.sources.len(),
            sources: card
                .sources
                .iter()
                .map(|s| SourceLink {
                    source_type: s.source_type,
                    url: s.url.clone(),
                    display_name: s.source_type.display_name().to_string(),
                })
                .collect(),
            pricing: card.fused_prices(),
            set_display: card.metadata.set_display.clone(),
            rarity: card.metadata.rarity.clone(),
            image_url: card.metadata.image_url.clone(),
            last_checked_at: card.last_checked_at(),
            created_at: card.created_at,
            updated_at: card.updated_at,
            merged_urls: card.sources.iter().map(|s| s.url.clone()).collect(),
            merged_sources: card.sources.iter().map(|s| s.source_type).collect(),
        }
    }
}

impl CardView {
    pub fn price(&self, price_type: PriceType) -> Option<f64> {
        self.pricing.get(&price_type).copied()
    }
}

// ---------------------------------------------------------------------------
// WatchEntry - a profile watching a card
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchEntry {
    pub profile_id: String,
    pub card_id: String,
}
