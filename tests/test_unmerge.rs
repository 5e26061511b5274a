//! Splitting merged cards back into single-source cards.

use cardwatch::matching::{merge_or_create, unmerge};
use cardwatch::models::{Card, CardIdentity, PriceType, SourceRecord, SourceType};

const TCG_URL: &str = "https://www.tcgplayer.com/product/523476/pokemon-sv4a-gardevoir-ex-348";
const PC_URL: &str = "https://www.pricecharting.com/game/pokemon-japanese-shiny-treasure-ex/gardevoir-ex-348";

fn gardevoir() -> CardIdentity {
    CardIdentity::new("Gardevoir ex", "348")
}

fn tcg_record() -> SourceRecord {
    let mut record = SourceRecord::new(SourceType::TcgPlayer, TCG_URL).with_price(PriceType::Market, 10.50);
    record.metadata.rarity = Some("Rare".into());
    record
}

fn pc_record() -> SourceRecord {
    let mut record = SourceRecord::new(SourceType::PriceCharting, PC_URL)
        .with_price(PriceType::Ungraded, 15.00)
        .with_price(PriceType::Grade9, 25.00);
    record.metadata.rarity = Some("Common".into());
    record.metadata.set_display = Some("Pokemon Japanese Shiny Treasure ex".into());
    record
}

fn merged_card() -> Card {
    let card = merge_or_create(tcg_record(), gardevoir(), Vec::new()).card;
    merge_or_create(pc_record(), gardevoir(), vec![card]).card
}

#[test]
fn unmerged_card_is_refused() {
    let card = merge_or_create(tcg_record(), gardevoir(), Vec::new()).card;
    assert!(unmerge(&card, Vec::new()).is_none());
}

#[test]
fn merged_card_splits_per_source() {
    let card = merged_card();
    let split = unmerge(&card, Vec::new()).unwrap();
    assert_eq!(split.len(), 2);

    for piece in &split {
        assert_eq!(piece.origin_id, card.id);
        assert_eq!(piece.card.sources.len(), 1);
        assert_eq!(piece.card.merge_group_id, None);
        assert!(!piece.card.is_merged());
        assert_eq!(piece.card.identity, gardevoir());
    }
}

#[test]
fn first_source_keeps_the_original_id() {
    let card = merged_card();
    let split = unmerge(&card, Vec::new()).unwrap();

    assert_eq!(split[0].card.id, card.id);
    assert_eq!(split[0].card.created_at, card.created_at);
    assert_eq!(split[0].card.metadata, card.metadata);
    assert_ne!(split[1].card.id, card.id);
}

#[test]
fn split_cards_only_keep_their_own_price_types() {
    let mut card = merged_card();
    // A TCGplayer record that picked up a graded price during the merge.
    card.sources[0].price_by_type.insert(PriceType::Grade9, 25.00);

    let split = unmerge(&card, Vec::new()).unwrap();
    let tcg = &split[0].card;
    let pc = &split[1].card;

    assert_eq!(tcg.price(PriceType::Market), Some(10.50));
    assert_eq!(tcg.price(PriceType::Grade9), None);
    assert_eq!(pc.price(PriceType::Market), None);
    assert_eq!(pc.price(PriceType::Ungraded), Some(15.00));
    assert_eq!(pc.price(PriceType::Grade9), Some(25.00));
}

#[test]
fn later_sources_take_metadata_from_their_record() {
    let split = unmerge(&merged_card(), Vec::new()).unwrap();
    let pc = &split[1].card;
    assert_eq!(pc.metadata.rarity.as_deref(), Some("Common"));
    assert_eq!(
        pc.metadata.set_display.as_deref(),
        Some("Pokemon Japanese Shiny Treasure ex")
    );
    assert_eq!(pc.metadata.number.as_deref(), Some("348"));
}

#[test]
fn whole_merge_group_is_split() {
    let first = merge_or_create(tcg_record(), gardevoir(), Vec::new()).card;
    let second = merge_or_create(pc_record(), gardevoir(), Vec::new()).card;
    let outcome = merge_or_create(tcg_record(), gardevoir(), vec![first, second]);

    let target = outcome.card;
    let mut group = outcome.regrouped;
    // The target may come back with its group; it is not split twice.
    group.push(target.clone());

    let split = unmerge(&target, group).unwrap();
    assert_eq!(split.len(), 2);
    assert_eq!(split[0].origin_id, target.id);
    assert_ne!(split[1].origin_id, target.id);
    assert!(split.iter().all(|p| p.card.merge_group_id.is_none()));
    assert!(split.iter().all(|p| p.card.id == p.origin_id));
}
