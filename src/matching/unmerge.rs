//! Reversal of merges: one single-source card per marketplace record.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::models::{Card, CardMetadata};

/// A card produced by [`unmerge`], tagged with the card it was split from.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitCard {
    pub origin_id: String,
    pub card: Card,
}

/// Split `target` and the rest of its merge group back into single-source cards.
///
/// `group` holds the cards sharing `target.merge_group_id` as found by the
/// caller; `target` itself may or may not be among them. Every resulting
/// card keeps only the price types its own marketplace publishes (a
/// TCGplayer card loses graded prices, a PriceCharting card loses `market`)
/// and has no merge group. The first source of each original card keeps
/// that card's id, so existing references stay valid.
///
/// Returns `None` when `target` was never merged.
pub fn unmerge(target: &Card, group: Vec<Card>) -> Option<Vec<SplitCard>> {
    if !target.is_merged() {
        return None;
    }

    let mut members = vec![target.clone()];
    for card in group {
        if !members.iter().any(|m| m.id == card.id) {
            members.push(card);
        }
    }

    let split: Vec<SplitCard> = members.iter().flat_map(split_card).collect();
    info!(
        card_id = %target.id,
        members = members.len(),
        cards = split.len(),
        "unmerged card"
    );
    Some(split)
}

fn split_card(card: &Card) -> Vec<SplitCard> {
    let now = Utc::now();

    card.sources
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let mut record = record.clone();
            record.retain_own_prices();

            let (id, metadata, created_at) = if i == 0 {
                (card.id.clone(), card.metadata.clone(), card.created_at)
            } else {
                let metadata = CardMetadata {
                    set_display: record.metadata.set_display.clone(),
                    rarity: record.metadata.rarity.clone(),
                    image_url: record.metadata.image_url.clone(),
                    number: record
                        .metadata
                        .number
                        .clone()
                        .or_else(|| card.metadata.number.clone()),
                };
                (Uuid::new_v4().to_string(), metadata, now)
            };

            SplitCard {
                origin_id: card.id.clone(),
                card: Card {
                    id,
                    identity: card.identity.clone(),
                    metadata,
                    sources: vec![record],
                    merge_group_id: None,
                    created_at,
                    updated_at: now,
                },
            }
        })
        .collect()
}
