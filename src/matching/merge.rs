//! Field-level fusion of a new marketplace observation into existing cards.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Card, CardIdentity, CardMetadata, SourceMetadata, SourceRecord};

/// Result of [`merge_or_create`].
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The created card, or the primary candidate with the record fused in.
    pub card: Card,
    /// `false` only when a fresh card was created.
    pub was_merged: bool,
    /// Further candidates that now point at `card` through `merge_group_id`.
    pub regrouped: Vec<Card>,
    /// Groups the regrouped candidates belonged to before. Their remaining
    /// members have to be moved into `card`'s group by the caller.
    pub absorbed_groups: Vec<String>,
}

/// Fuse `new_record` into the first candidate, or start a new card.
///
/// Candidates are taken in the caller's order (storage insertion order) and
/// never re-ranked. Only the first one absorbs the record; any others join
/// its merge group without their prices being re-fused, and matching never
/// chains through them.
///
/// The caller must hold the candidate scan and the write of the outcome
/// under one transaction (or equivalent per-identity lock). Otherwise two
/// concurrent additions of the same card can both see no candidates and
/// create two cards.
pub fn merge_or_create(
    new_record: SourceRecord,
    new_identity: CardIdentity,
    candidates: Vec<Card>,
) -> MergeOutcome {
    let mut candidates = candidates.into_iter();
    let Some(mut primary) = candidates.next() else {
        let card = create_card(new_record, new_identity);
        info!(card_id = %card.id, name = %card.identity.name, "created card");
        return MergeOutcome {
            card,
            was_merged: false,
            regrouped: Vec::new(),
            absorbed_groups: Vec::new(),
        };
    };

    fill_metadata_gaps(&mut primary.metadata, &new_record.metadata);

    let source_type = new_record.source_type;
    let card_id = primary.id.clone();
    match primary.source_mut(source_type) {
        Some(existing) => {
            debug!(card_id = %card_id, source = %source_type, "updating existing source");
            existing.upsert_prices(&new_record.price_by_type);
            existing.metadata.overwrite_with(&new_record.metadata);
            existing.url = new_record.url;
            if new_record.product_id.is_some() {
                existing.product_id = new_record.product_id;
            }
            existing.currency = new_record.currency;
            existing.last_checked_at = new_record.last_checked_at.or(existing.last_checked_at);
        }
        None => {
            debug!(card_id = %card_id, source = %source_type, "attaching new source");
            primary.sources.push(new_record);
        }
    }

    let mut regrouped: Vec<Card> = candidates.filter(|c| c.id != primary.id).collect();
    let mut absorbed_groups: Vec<String> = Vec::new();
    if !regrouped.is_empty() {
        let group_id = primary
            .merge_group_id
            .clone()
            .unwrap_or_else(|| primary.id.clone());
        primary.merge_group_id = Some(group_id.clone());
        for sibling in &mut regrouped {
            if let Some(old) = sibling.merge_group_id.replace(group_id.clone()) {
                if old != group_id && !absorbed_groups.contains(&old) {
                    absorbed_groups.push(old);
                }
            }
            sibling.updated_at = Utc::now();
        }
    }

    primary.updated_at = Utc::now();
    info!(
        card_id = %primary.id,
        sources = primary.sources.len(),
        regrouped = regrouped.len(),
        "merged card"
    );

    MergeOutcome {
        card: primary,
        was_merged: true,
        regrouped,
        absorbed_groups,
    }
}

/// Apply a re-scraped observation to the matching source of `card`.
///
/// A refresh only moves prices (per-type upsert) and `last_checked_at`;
/// metadata and URLs stay as first recorded. Returns `false` when the card
/// has no source of that type.
pub fn refresh_source(card: &mut Card, fresh: &SourceRecord) -> bool {
    let Some(source) = card.source_mut(fresh.source_type) else {
        return false;
    };
    source.upsert_prices(&fresh.price_by_type);
    source.last_checked_at = fresh.last_checked_at.or(Some(Utc::now()));
    card.updated_at = Utc::now();
    true
}

fn create_card(record: SourceRecord, identity: CardIdentity) -> Card {
    let now = Utc::now();
    let mut metadata = CardMetadata::default();
    fill_metadata_gaps(&mut metadata, &record.metadata);
    if metadata.number.is_none() && !identity.number.is_empty() {
        metadata.number = Some(identity.number.clone());
    }

    Card {
        id: Uuid::new_v4().to_string(),
        identity,
        metadata,
        sources: vec![record],
        merge_group_id: None,
        created_at: now,
        updated_at: now,
    }
}

/// First writer wins, but any writer may fill a gap.
fn fill_metadata_gaps(target: &mut CardMetadata, incoming: &SourceMetadata) {
    fill(&mut target.set_display, &incoming.set_display);
    fill(&mut target.rarity, &incoming.rarity);
    fill(&mut target.image_url, &incoming.image_url);
    fill(&mut target.number, &incoming.number);
}

fn fill(slot: &mut Option<String>, incoming: &Option<String>) {
    let populated = slot.as_deref().is_some_and(|s| !s.trim().is_empty());
    if populated {
        return;
    }
    if let Some(value) = incoming.as_deref().filter(|s| !s.trim().is_empty()) {
        *slot = Some(value.to_string());
    }
}
