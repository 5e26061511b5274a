//! Merge engine: creation, fusion, per-type upsert and regrouping.

use chrono::{Duration, Utc};

use cardwatch::matching::{merge_or_create, refresh_source};
use cardwatch::models::{Card, CardIdentity, PriceType, SourceRecord, SourceType};

const TCG_URL: &str = "https://www.tcgplayer.com/product/523476/pokemon-sv4a-gardevoir-ex-348";
const PC_URL: &str = "https://www.pricecharting.com/game/pokemon-japanese-shiny-treasure-ex/gardevoir-ex-348";

fn gardevoir() -> CardIdentity {
    CardIdentity::new("Gardevoir ex", "348")
}

fn tcg_record(market: f64) -> SourceRecord {
    let mut record = SourceRecord::new(SourceType::TcgPlayer, TCG_URL).with_price(PriceType::Market, market);
    record.product_id = Some("523476".into());
    record.metadata.rarity = Some("Rare".into());
    record.metadata.set_display = Some("SV4a: Shiny Treasure ex".into());
    record.last_checked_at = Some(Utc::now() - Duration::hours(1));
    record
}

fn pc_record() -> SourceRecord {
    let mut record = SourceRecord::new(SourceType::PriceCharting, PC_URL)
        .with_price(PriceType::Ungraded, 15.00)
        .with_price(PriceType::Grade9, 25.00);
    record.metadata.rarity = Some("Common".into());
    record.metadata.image_url = Some("https://cdn.pricecharting.com/gardevoir.jpg".into());
    record.last_checked_at = Some(Utc::now());
    record
}

fn new_card(record: SourceRecord) -> Card {
    merge_or_create(record, gardevoir(), Vec::new()).card
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[test]
fn no_candidates_creates_card() {
    let outcome = merge_or_create(tcg_record(10.50), gardevoir(), Vec::new());
    assert!(!outcome.was_merged);
    assert!(outcome.regrouped.is_empty());

    let card = outcome.card;
    assert!(!card.id.is_empty());
    assert_eq!(card.identity, gardevoir());
    assert_eq!(card.sources.len(), 1);
    assert!(!card.is_merged());
    assert_eq!(card.merge_group_id, None);
    assert_eq!(card.metadata.rarity.as_deref(), Some("Rare"));
    assert_eq!(card.metadata.number.as_deref(), Some("348"));
    assert_eq!(card.price(PriceType::Market), Some(10.50));
}

#[test]
fn created_cards_get_distinct_ids() {
    let a = new_card(tcg_record(1.0));
    let b = new_card(tcg_record(1.0));
    assert_ne!(a.id, b.id);
}

// ---------------------------------------------------------------------------
// Fusion across marketplaces
// ---------------------------------------------------------------------------

#[test]
fn second_marketplace_fuses_disjoint_prices() {
    let existing = new_card(tcg_record(10.50));
    let existing_id = existing.id.clone();

    let outcome = merge_or_create(pc_record(), gardevoir(), vec![existing]);
    assert!(outcome.was_merged);

    let card = outcome.card;
    assert_eq!(card.id, existing_id);
    assert_eq!(card.sources.len(), 2);
    assert!(card.is_merged());
    assert_eq!(card.price(PriceType::Market), Some(10.50));
    assert_eq!(card.price(PriceType::Ungraded), Some(15.00));
    assert_eq!(card.price(PriceType::Grade9), Some(25.00));
    assert_eq!(card.price(PriceType::Grade10), None);
    assert_eq!(card.fused_prices().len(), 3);
}

#[test]
fn card_metadata_is_first_writer_wins() {
    let existing = new_card(tcg_record(10.50));
    let card = merge_or_create(pc_record(), gardevoir(), vec![existing]).card;

    assert_eq!(card.metadata.rarity.as_deref(), Some("Rare"));
    assert_eq!(card.metadata.set_display.as_deref(), Some("SV4a: Shiny Treasure ex"));
    // Gaps are filled by later writers.
    assert_eq!(
        card.metadata.image_url.as_deref(),
        Some("https://cdn.pricecharting.com/gardevoir.jpg")
    );
    // Each source keeps what its own marketplace said.
    assert_eq!(
        card.source(SourceType::PriceCharting)
            .and_then(|s| s.metadata.rarity.as_deref()),
        Some("Common")
    );
}

#[test]
fn last_checked_at_is_latest_across_sources() {
    let existing = new_card(tcg_record(10.50));
    let pc = pc_record();
    let pc_checked = pc.last_checked_at;
    let card = merge_or_create(pc, gardevoir(), vec![existing]).card;
    assert_eq!(card.last_checked_at(), pc_checked);
}

// ---------------------------------------------------------------------------
// Same marketplace again
// ---------------------------------------------------------------------------

#[test]
fn same_marketplace_updates_in_place() {
    let existing = new_card(tcg_record(10.50));
    let card = merge_or_create(tcg_record(12.00), gardevoir(), vec![existing]).card;

    assert_eq!(card.sources.len(), 1);
    assert!(!card.is_merged());
    assert_eq!(card.price(PriceType::Market), Some(12.00));
}

#[test]
fn re_adding_is_idempotent() {
    let first = merge_or_create(pc_record(), gardevoir(), vec![new_card(tcg_record(10.50))]).card;
    let second = merge_or_create(pc_record(), gardevoir(), vec![first.clone()]).card;

    assert_eq!(second.id, first.id);
    assert_eq!(second.sources.len(), 2);
    assert_eq!(second.fused_prices(), first.fused_prices());
    assert_eq!(second.metadata, first.metadata);
}

#[test]
fn price_upsert_is_per_type() {
    let existing = merge_or_create(pc_record(), gardevoir(), Vec::new()).card;
    let update = SourceRecord::new(SourceType::PriceCharting, PC_URL).with_price(PriceType::Grade10, 60.00);

    let card = merge_or_create(update, gardevoir(), vec![existing]).card;
    assert_eq!(card.price(PriceType::Ungraded), Some(15.00));
    assert_eq!(card.price(PriceType::Grade9), Some(25.00));
    assert_eq!(card.price(PriceType::Grade10), Some(60.00));
}

#[test]
fn missing_product_id_keeps_stored_one() {
    let existing = new_card(tcg_record(10.50));
    let mut update = tcg_record(11.00);
    update.product_id = None;

    let card = merge_or_create(update, gardevoir(), vec![existing]).card;
    let source = card.source(SourceType::TcgPlayer).unwrap();
    assert_eq!(source.product_id.as_deref(), Some("523476"));
}

// ---------------------------------------------------------------------------
// Several candidates
// ---------------------------------------------------------------------------

#[test]
fn first_candidate_absorbs_and_others_are_regrouped() {
    let first = new_card(tcg_record(10.50));
    let second = merge_or_create(pc_record(), gardevoir(), Vec::new()).card;
    let (first_id, second_id) = (first.id.clone(), second.id.clone());

    let update = tcg_record(11.00);
    let outcome = merge_or_create(update, gardevoir(), vec![first, second]);

    assert_eq!(outcome.card.id, first_id);
    assert_eq!(outcome.card.merge_group_id.as_deref(), Some(first_id.as_str()));
    assert_eq!(outcome.card.sources.len(), 1);
    assert!(outcome.card.is_merged());

    assert_eq!(outcome.regrouped.len(), 1);
    let sibling = &outcome.regrouped[0];
    assert_eq!(sibling.id, second_id);
    assert_eq!(sibling.merge_group_id.as_deref(), Some(first_id.as_str()));
    // Siblings are linked, not re-fused.
    assert_eq!(sibling.price(PriceType::Market), None);
    assert_eq!(sibling.price(PriceType::Ungraded), Some(15.00));
}

#[test]
fn existing_group_id_is_reused() {
    let mut first = new_card(tcg_record(10.50));
    first.merge_group_id = Some("group-1".into());
    let second = merge_or_create(pc_record(), gardevoir(), Vec::new()).card;

    let outcome = merge_or_create(tcg_record(11.00), gardevoir(), vec![first, second]);
    assert_eq!(outcome.card.merge_group_id.as_deref(), Some("group-1"));
    assert_eq!(outcome.regrouped[0].merge_group_id.as_deref(), Some("group-1"));
}

#[test]
fn sibling_groups_are_reported_as_absorbed() {
    let first = new_card(tcg_record(10.50));
    let mut second = merge_or_create(pc_record(), gardevoir(), Vec::new()).card;
    second.merge_group_id = Some(second.id.clone());
    let (first_id, old_group) = (first.id.clone(), second.id.clone());

    let outcome = merge_or_create(tcg_record(11.00), gardevoir(), vec![first, second]);
    assert_eq!(outcome.regrouped[0].merge_group_id.as_deref(), Some(first_id.as_str()));
    assert_eq!(outcome.absorbed_groups, vec![old_group]);
}

#[test]
fn shared_group_is_not_absorbed() {
    let mut first = new_card(tcg_record(10.50));
    first.merge_group_id = Some("group-1".into());
    let mut second = merge_or_create(pc_record(), gardevoir(), Vec::new()).card;
    second.merge_group_id = Some("group-1".into());

    let outcome = merge_or_create(tcg_record(11.00), gardevoir(), vec![first, second]);
    assert!(outcome.absorbed_groups.is_empty());
}

// ---------------------------------------------------------------------------
// Read rule and refresh
// ---------------------------------------------------------------------------

#[test]
fn price_prefers_authoritative_marketplace() {
    let mut tcg = tcg_record(10.50);
    tcg.price_by_type.insert(PriceType::Grade9, 99.00);
    let card = merge_or_create(pc_record(), gardevoir(), vec![new_card(tcg)]).card;

    assert_eq!(card.price(PriceType::Grade9), Some(25.00));
    assert_eq!(card.price(PriceType::Market), Some(10.50));
}

#[test]
fn refresh_moves_prices_and_check_time_only() {
    let mut card = merge_or_create(pc_record(), gardevoir(), vec![new_card(tcg_record(10.50))]).card;
    let before = card.source(SourceType::TcgPlayer).cloned().unwrap();

    let mut fresh = SourceRecord::new(SourceType::TcgPlayer, "https://www.tcgplayer.com/product/1/other")
        .with_price(PriceType::Market, 13.25);
    fresh.metadata.rarity = Some("Ultra Rare".into());
    let checked = Utc::now();
    fresh.last_checked_at = Some(checked);

    assert!(refresh_source(&mut card, &fresh));
    let after = card.source(SourceType::TcgPlayer).unwrap();
    assert_eq!(after.price(PriceType::Market), Some(13.25));
    assert_eq!(after.last_checked_at, Some(checked));
    assert_eq!(after.url, before.url);
    assert_eq!(after.metadata, before.metadata);
    assert_eq!(card.price(PriceType::Ungraded), Some(15.00));
}

#[test]
fn refresh_without_matching_source_is_a_no_op() {
    let mut card = new_card(tcg_record(10.50));
    assert!(!refresh_source(&mut card, &pc_record()));
    assert_eq!(card.sources.len(), 1);
}
