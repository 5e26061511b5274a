//! Shared test fixtures for the card watch integration tests.
//!
//! Provides an in-memory [`CardWatch`] plus scraper payloads and listing URLs
//! for a handful of real cards as both marketplaces title them.

#![allow(dead_code)]

use cardwatch::models::{SourcePayload, SourceType};
use cardwatch::CardWatch;

pub const GARDEVOIR_TCG_URL: &str =
    "https://www.tcgplayer.com/product/523476/pokemon-sv4a-shiny-treasure-ex-gardevoir-ex-348";
pub const GARDEVOIR_PC_URL: &str =
    "https://www.pricecharting.com/game/pokemon-japanese-shiny-treasure-ex/gardevoir-ex-348";

pub const TATSUGIRI_TCG_URL: &str =
    "https://www.tcgplayer.com/product/512345/pokemon-sv01-scarlet-violet-tatsugiri-112101";
pub const MAGIKARP_PC_URL: &str =
    "https://www.pricecharting.com/game/pokemon-japanese-clay-burst/magikarp-080-073";

/// In-memory watch store with the schema in place.
pub fn setup() -> CardWatch {
    CardWatch::builder().in_memory(true).build().unwrap()
}

/// TCGplayer listing for Gardevoir ex 348 with a market price of 10.50.
pub fn gardevoir_tcg() -> SourcePayload {
    SourcePayload {
        source_type: Some(SourceType::TcgPlayer),
        name: Some("Gardevoir ex - 348/190 - SV4a: Shiny Treasure ex (SV4a)".into()),
        product_id: Some("523476".into()),
        market_price: Some(10.50),
        set_display: Some("SV4a: Shiny Treasure ex".into()),
        rarity: Some("Rare".into()),
        image_url: Some("https://tcgplayer-cdn.tcgplayer.com/product/523476_200w.jpg".into()),
        ..Default::default()
    }
}

/// PriceCharting listing for the same card with graded prices.
pub fn gardevoir_pc() -> SourcePayload {
    SourcePayload {
        source_type: Some(SourceType::PriceCharting),
        name: Some("Gardevoir ex #348 Pokemon Japanese Shiny Treasure ex".into()),
        ungraded_price: Some(15.00),
        grade9_price: Some(25.00),
        grade10_price: Some(60.00),
        set_display: Some("Pokemon Japanese Shiny Treasure ex".into()),
        rarity: Some("Common".into()),
        ..Default::default()
    }
}

/// A payload for `source` carrying only `name` and one price.
pub fn payload(source: SourceType, name: &str, price: f64) -> SourcePayload {
    let mut payload = SourcePayload {
        source_type: Some(source),
        name: Some(name.to_string()),
        ..Default::default()
    };
    match source {
        SourceType::TcgPlayer => payload.market_price = Some(price),
        SourceType::PriceCharting => payload.ungraded_price = Some(price),
    }
    payload
}
