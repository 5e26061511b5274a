//! Card aggregate persistence over the `cards`, `card_sources` and
//! `card_prices` tables.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use duckdb::types::Value;
use serde::Deserialize;

use crate::connection::{opt_text, text, Connection};
use crate::error::Result;
use crate::matching;
use crate::models::{Card, CardIdentity, CardMetadata, PriceType, SourceMetadata, SourceRecord, SourceType};
use crate::sql_builder::SqlBuilder;

/// SQL twin of `normalize_number`: leading zeros stripped, all-zero is `"0"`.
const NORMALIZED_NUMBER_EQ: &str = "coalesce(nullif(ltrim(trim(number), '0'), ''), '0') = ?";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CardRow {
    id: String,
    name: String,
    number: String,
    set_display: Option<String>,
    rarity: Option<String>,
    image_url: Option<String>,
    meta_number: Option<String>,
    merge_group_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SourceRow {
    card_id: String,
    source_type: String,
    url: String,
    product_id: Option<String>,
    currency: String,
    set_display: Option<String>,
    rarity: Option<String>,
    image_url: Option<String>,
    number: Option<String>,
    last_checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    card_id: String,
    source_type: String,
    price_type: String,
    price: f64,
}

// ---------------------------------------------------------------------------
// CardQuery
// ---------------------------------------------------------------------------

/// Reads and writes whole [`Card`] aggregates.
pub struct CardQuery<'a> {
    conn: &'a Connection,
}

impl<'a> CardQuery<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Retrieve a single card by id.
    pub fn get(&self, id: &str) -> Result<Option<Card>> {
        let (sql, params) = SqlBuilder::new("cards").where_eq("id", id).limit(1).build();
        Ok(self.load(&sql, &params)?.into_iter().next())
    }

    /// Retrieve cards by id, in storage insertion order.
    pub fn get_many(&self, ids: &[&str]) -> Result<Vec<Card>> {
        let (sql, params) = SqlBuilder::new("cards")
            .where_in("id", ids)
            .order_by(&["seq ASC"])
            .build();
        self.load(&sql, &params)
    }

    /// Every stored card, in storage insertion order.
    pub fn all(&self) -> Result<Vec<Card>> {
        let (sql, params) = SqlBuilder::new("cards").order_by(&["seq ASC"]).build();
        self.load(&sql, &params)
    }

    /// Cards sharing a merge group id.
    pub fn merge_group(&self, group_id: &str) -> Result<Vec<Card>> {
        let (sql, params) = SqlBuilder::new("cards")
            .where_eq("merge_group_id", group_id)
            .order_by(&["seq ASC"])
            .build();
        self.load(&sql, &params)
    }

    /// Stored cards that match `identity`, in storage insertion order.
    ///
    /// Only cards whose zero-stripped number agrees are loaded; the name
    /// rules then run in memory.
    pub fn find_candidates(&self, identity: &CardIdentity) -> Result<Vec<Card>> {
        let number = identity.normalized_number();
        let (sql, params) = SqlBuilder::new("cards")
            .where_clause(NORMALIZED_NUMBER_EQ, &[number])
            .order_by(&["seq ASC"])
            .build();
        Ok(self
            .load(&sql, &params)?
            .into_iter()
            .filter(|card| matching::same(&card.identity, identity))
            .collect())
    }

    pub fn count(&self) -> Result<i64> {
        let value = self.conn.execute_scalar("SELECT COUNT(*) FROM cards", &[])?;
        Ok(value.and_then(|v| v.as_i64()).unwrap_or(0))
    }

    /// Insert or replace a card together with all of its sources and prices.
    pub fn save(&self, card: &Card) -> Result<()> {
        self.conn.transaction(|| {
            let exists = self
                .conn
                .execute_scalar("SELECT COUNT(*) FROM cards WHERE id = ?", &[text(&card.id)])?
                .and_then(|v| v.as_i64())
                .unwrap_or(0)
                > 0;

            let mut params = vec![
                text(&card.identity.name),
                text(&card.identity.number),
                opt_text(card.metadata.set_display.as_deref()),
                opt_text(card.metadata.rarity.as_deref()),
                opt_text(card.metadata.image_url.as_deref()),
                opt_text(card.metadata.number.as_deref()),
                opt_text(card.merge_group_id.as_deref()),
                text(card.updated_at.to_rfc3339()),
            ];

            if exists {
                params.push(text(&card.id));
                self.conn.execute_update(
                    "UPDATE cards SET name = ?, number = ?, set_display = ?, rarity = ?, \
                     image_url = ?, meta_number = ?, merge_group_id = ?, updated_at = ? \
                     WHERE id = ?",
                    &params,
                )?;
            } else {
                params.push(text(card.created_at.to_rfc3339()));
                params.push(text(&card.id));
                self.conn.execute_update(
                    "INSERT INTO cards (name, number, set_display, rarity, image_url, \
                     meta_number, merge_group_id, updated_at, created_at, id) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    &params,
                )?;
            }

            self.delete_children(&card.id)?;
            for (ordinal, source) in card.sources.iter().enumerate() {
                self.insert_source(&card.id, ordinal, source)?;
            }
            Ok(())
        })
    }

    /// Delete a card with its sources and prices. Returns whether it existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        self.conn.transaction(|| {
            self.delete_children(id)?;
            let (sql, params) = SqlBuilder::delete("cards").where_eq("id", id).build();
            Ok(self.conn.execute_update(&sql, &params)? > 0)
        })
    }

    fn delete_children(&self, card_id: &str) -> Result<()> {
        for table in ["card_prices", "card_sources"] {
            let (sql, params) = SqlBuilder::delete(table).where_eq("card_id", card_id).build();
            self.conn.execute_update(&sql, &params)?;
        }
        Ok(())
    }

    fn insert_source(&self, card_id: &str, ordinal: usize, source: &SourceRecord) -> Result<()> {
        self.conn.execute_update(
            "INSERT INTO card_sources (card_id, ordinal, source_type, url, product_id, currency, \
             set_display, rarity, image_url, number, last_checked_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            &[
                text(card_id),
                Value::BigInt(ordinal as i64),
                text(source.source_type.as_str()),
                text(&source.url),
                opt_text(source.product_id.as_deref()),
                text(&source.currency),
                opt_text(source.metadata.set_display.as_deref()),
                opt_text(source.metadata.rarity.as_deref()),
                opt_text(source.metadata.image_url.as_deref()),
                opt_text(source.metadata.number.as_deref()),
                opt_text(source.last_checked_at.map(|t| t.to_rfc3339()).as_deref()),
            ],
        )?;

        for (price_type, price) in &source.price_by_type {
            self.conn.execute_update(
                "INSERT INTO card_prices (card_id, source_type, price_type, price) VALUES (?, ?, ?, ?)",
                &[
                    text(card_id),
                    text(source.source_type.as_str()),
                    text(price_type.as_str()),
                    Value::Double(*price),
                ],
            )?;
        }
        Ok(())
    }

    /// Run a card SELECT and attach each card's sources and prices.
    fn load(&self, sql: &str, params: &[Value]) -> Result<Vec<Card>> {
        let rows: Vec<CardRow> = self.conn.execute_into(sql, params)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();

        let (sql, params) = SqlBuilder::new("card_prices").where_in("card_id", &ids).build();
        let mut prices: HashMap<(String, String), BTreeMap<PriceType, f64>> = HashMap::new();
        for row in self.conn.execute_into::<PriceRow>(&sql, &params)? {
            prices
                .entry((row.card_id, row.source_type))
                .or_default()
                .insert(row.price_type.parse()?, row.price);
        }

        let (sql, params) = SqlBuilder::new("card_sources")
            .where_in("card_id", &ids)
            .order_by(&["card_id", "ordinal ASC"])
            .build();
        let mut sources: HashMap<String, Vec<SourceRecord>> = HashMap::new();
        for row in self.conn.execute_into::<SourceRow>(&sql, &params)? {
            let source_type: SourceType = row.source_type.parse()?;
            let price_by_type = prices
                .remove(&(row.card_id.clone(), row.source_type))
                .unwrap_or_default();
            sources.entry(row.card_id).or_default().push(SourceRecord {
                source_type,
                url: row.url,
                product_id: row.product_id,
                currency: row.currency,
                price_by_type,
                metadata: SourceMetadata {
                    set_display: row.set_display,
                    rarity: row.rarity,
                    image_url: row.image_url,
                    number: row.number,
                },
                last_checked_at: row.last_checked_at,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| Card {
                sources: sources.remove(&row.id).unwrap_or_default(),
                id: row.id,
                identity: CardIdentity::new(row.name, row.number),
                metadata: CardMetadata {
                    set_display: row.set_display,
                    rarity: row.rarity,
                    image_url: row.image_url,
                    number: row.meta_number,
                },
                merge_group_id: row.merge_group_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }
}
