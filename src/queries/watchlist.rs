//! Per-profile watchlist workflows: add, list, refresh, delete and unmerge.

use std::cell::RefCell;
use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::ViewCache;
use crate::connection::{text, Connection};
use crate::error::{CardWatchError, Result};
use crate::matching::{self, MergeOutcome};
use crate::models::{CardView, SourcePayload, SourceRecord, SourceType, WatchEntry};
use crate::queries::cards::CardQuery;
use crate::sql_builder::SqlBuilder;

// ---------------------------------------------------------------------------
// PriceFetcher
// ---------------------------------------------------------------------------

/// Re-scrapes one stored marketplace record during a refresh.
///
/// Implemented by the scraping layer; closures work too.
pub trait PriceFetcher {
    fn fetch(&self, source: &SourceRecord) -> Result<SourcePayload>;
}

impl<F> PriceFetcher for F
where
    F: Fn(&SourceRecord) -> Result<SourcePayload>,
{
    fn fetch(&self, source: &SourceRecord) -> Result<SourcePayload> {
        self(source)
    }
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

const WATCH_COLUMNS: &[&str] = &[r#"profile_id AS "profileId""#, r#"card_id AS "cardId""#];

// ---------------------------------------------------------------------------
// WatchlistQuery
// ---------------------------------------------------------------------------

/// Watchlist operations for named profiles.
///
/// Every write runs in a single DuckDB transaction covering the candidate
/// scan and the write, and invalidates the view cache afterwards.
pub struct WatchlistQuery<'a> {
    conn: &'a Connection,
    cache: &'a RefCell<ViewCache>,
}

impl<'a> WatchlistQuery<'a> {
    pub fn new(conn: &'a Connection, cache: &'a RefCell<ViewCache>) -> Self {
        Self { conn, cache }
    }

    fn cards(&self) -> CardQuery<'a> {
        CardQuery::new(self.conn)
    }

    // -- Add -------------------------------------------------------------

    /// Add a scraped listing to `profile`'s watchlist.
    ///
    /// The listing is merged into the first stored card that matches it, or
    /// becomes a new card. Adding the same listing twice updates it in place.
    pub fn add_card(&self, profile: &str, url: &str, payload: &SourcePayload) -> Result<CardView> {
        let source_type = payload.require_source_type()?;
        let url_source = SourceType::from_url(url)
            .ok_or_else(|| CardWatchError::UnsupportedSource(url.to_string()))?;
        if url_source != source_type {
            return Err(CardWatchError::MalformedPayload(format!(
                "sourceType {} does not match URL {}",
                source_type, url
            )));
        }

        let slug = matching::parse_listing_url(url);
        let title = payload
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| slug.as_ref().map(|s| s.name.clone()))
            .ok_or_else(|| CardWatchError::Extraction(url.to_string()))?;
        let hint = slug
            .and_then(|s| s.number_hint)
            .or_else(|| payload.scraped_number());

        let identity = matching::extract(&title, url, hint.as_deref())?;
        let record = payload.to_record(url, Utc::now())?;
        debug!(profile, name = %identity.name, number = %identity.number, "adding card");

        let outcome: MergeOutcome = self.conn.transaction(|| {
            let profile_id = self.ensure_profile(profile)?;
            let cards = self.cards();
            let candidates = cards.find_candidates(&identity)?;
            let outcome = matching::merge_or_create(record, identity, candidates);
            cards.save(&outcome.card)?;
            for sibling in &outcome.regrouped {
                cards.save(sibling)?;
            }
            let group_id = outcome.card.merge_group_id.as_deref().unwrap_or_default();
            for old_group in &outcome.absorbed_groups {
                for mut member in cards.merge_group(old_group)? {
                    debug!(card_id = %member.id, from = %old_group, to = %group_id, "moving merge group member");
                    member.merge_group_id = Some(group_id.to_string());
                    member.updated_at = Utc::now();
                    cards.save(&member)?;
                }
            }
            self.watch(&profile_id, &outcome.card.id)?;
            Ok(outcome)
        })?;

        self.cache.borrow_mut().invalidate_all();
        info!(
            profile,
            card_id = %outcome.card.id,
            merged = outcome.was_merged,
            "card added to watchlist"
        );
        Ok(CardView::from(&outcome.card))
    }

    // -- List ------------------------------------------------------------

    /// Display data for every card `profile` watches, oldest watch first.
    pub fn cards_for_profile(&self, profile: &str) -> Result<Vec<CardView>> {
        if let Some(views) = self.cache.borrow_mut().get(profile) {
            debug!(profile, "watchlist served from cache");
            return Ok(views);
        }

        let profile_id = self.ensure_profile(profile)?;
        let card_ids = self.watched_card_ids(&profile_id)?;
        let ids: Vec<&str> = card_ids.iter().map(String::as_str).collect();
        let mut by_id: HashMap<String, CardView> = self
            .cards()
            .get_many(&ids)?
            .iter()
            .map(|c| (c.id.clone(), CardView::from(c)))
            .collect();
        let views: Vec<CardView> = card_ids.iter().filter_map(|id| by_id.remove(id)).collect();

        self.cache.borrow_mut().put(profile, views.clone());
        Ok(views)
    }

    // -- Refresh ---------------------------------------------------------

    /// Re-scrape every source of a card and store the new prices.
    ///
    /// Best effort: a source whose fetch fails, or returns a payload for a
    /// different marketplace, is left stale and the rest still update.
    pub fn refresh_card(&self, card_id: &str, fetcher: &dyn PriceFetcher) -> Result<CardView> {
        let mut card = self
            .cards()
            .get(card_id)?
            .ok_or_else(|| CardWatchError::NotFound(format!("Card not found: {}", card_id)))?;

        let mut fresh: Vec<SourceRecord> = Vec::new();
        for source in &card.sources {
            let fetched = fetcher.fetch(source).and_then(|payload| {
                if payload.require_source_type()? != source.source_type {
                    return Err(CardWatchError::MalformedPayload(format!(
                        "expected a {} payload",
                        source.source_type
                    )));
                }
                payload.to_record(&source.url, Utc::now())
            });
            match fetched {
                Ok(record) => fresh.push(record),
                Err(e) => warn!(
                    card_id,
                    source = %source.source_type,
                    url = %source.url,
                    error = %e,
                    "refresh failed, keeping stale source"
                ),
            }
        }

        let mut updated = 0;
        for record in &fresh {
            if matching::refresh_source(&mut card, record) {
                updated += 1;
            }
        }
        if updated > 0 {
            self.cards().save(&card)?;
            self.cache.borrow_mut().invalidate_all();
        }
        info!(card_id, updated, sources = card.sources.len(), "card refreshed");
        Ok(CardView::from(&card))
    }

    // -- Delete ----------------------------------------------------------

    /// Remove a card from `profile`'s watchlist.
    ///
    /// The card itself is deleted once nobody watches it any more.
    pub fn delete_card(&self, card_id: &str, profile: &str) -> Result<()> {
        self.conn.transaction(|| {
            let profile_id = self
                .profile_id(profile)?
                .ok_or_else(|| CardWatchError::NotFound(format!("Profile not found: {}", profile)))?;

            let (sql, params) = SqlBuilder::delete("user_cards")
                .where_eq("profile_id", &profile_id)
                .where_eq("card_id", card_id)
                .build();
            self.conn.execute_update(&sql, &params)?;

            if self.watchers(card_id)?.is_empty() {
                self.cards().delete(card_id)?;
                info!(card_id, "deleted unwatched card");
            }
            Ok(())
        })?;
        self.cache.borrow_mut().invalidate_all();
        Ok(())
    }

    // -- Unmerge ---------------------------------------------------------

    /// Split a merged card (and its merge group) back into single-source cards.
    ///
    /// Watchers of an original card end up watching every card split from
    /// it. Returns `false` when the card does not exist or was never merged.
    pub fn unmerge(&self, card_id: &str) -> Result<bool> {
        let changed = self.conn.transaction(|| {
            let cards = self.cards();
            let Some(target) = cards.get(card_id)? else {
                return Ok(false);
            };
            let group = match target.merge_group_id.as_deref() {
                Some(group_id) => cards.merge_group(group_id)?,
                None => Vec::new(),
            };
            let Some(split) = matching::unmerge(&target, group) else {
                return Ok(false);
            };

            let mut watchers_by_origin: HashMap<String, Vec<String>> = HashMap::new();
            for piece in &split {
                if !watchers_by_origin.contains_key(&piece.origin_id) {
                    let watchers = self.watchers(&piece.origin_id)?;
                    watchers_by_origin.insert(piece.origin_id.clone(), watchers);
                }
            }

            for origin in watchers_by_origin.keys() {
                if !split.iter().any(|p| &p.card.id == origin) {
                    cards.delete(origin)?;
                }
            }
            for piece in &split {
                cards.save(&piece.card)?;
                for profile_id in watchers_by_origin.get(&piece.origin_id).into_iter().flatten() {
                    self.watch(profile_id, &piece.card.id)?;
                }
            }
            Ok(true)
        })?;

        if changed {
            self.cache.borrow_mut().invalidate_all();
        }
        Ok(changed)
    }

    // -- Profiles and watch entries ----------------------------------------

    /// Id of the named profile, if it exists.
    pub fn profile_id(&self, name: &str) -> Result<Option<String>> {
        let (sql, params) = SqlBuilder::new("profiles")
            .select(&["id"])
            .where_eq("name", name)
            .limit(1)
            .build();
        let rows: Vec<IdRow> = self.conn.execute_into(&sql, &params)?;
        Ok(rows.into_iter().next().map(|r| r.id))
    }

    /// Id of the named profile, creating it on first use.
    pub fn ensure_profile(&self, name: &str) -> Result<String> {
        if let Some(id) = self.profile_id(name)? {
            return Ok(id);
        }
        let id = Uuid::new_v4().to_string();
        self.conn.execute_update(
            "INSERT INTO profiles (id, name, created_at) VALUES (?, ?, ?)",
            &[text(&id), text(name), text(Utc::now().to_rfc3339())],
        )?;
        info!(profile = name, "created profile");
        Ok(id)
    }

    /// Profile ids watching `card_id`.
    pub fn watchers(&self, card_id: &str) -> Result<Vec<String>> {
        let (sql, params) = SqlBuilder::new("user_cards")
            .select(WATCH_COLUMNS)
            .where_eq("card_id", card_id)
            .order_by(&["created_at ASC", "rowid ASC"])
            .build();
        let rows: Vec<WatchEntry> = self.conn.execute_into(&sql, &params)?;
        Ok(rows.into_iter().map(|r| r.profile_id).collect())
    }

    fn watched_card_ids(&self, profile_id: &str) -> Result<Vec<String>> {
        let (sql, params) = SqlBuilder::new("user_cards")
            .select(WATCH_COLUMNS)
            .where_eq("profile_id", profile_id)
            .order_by(&["created_at ASC", "rowid ASC"])
            .build();
        let rows: Vec<WatchEntry> = self.conn.execute_into(&sql, &params)?;
        Ok(rows.into_iter().map(|r| r.card_id).collect())
    }

    /// Record that `profile_id` watches `card_id`; a no-op if it already does.
    fn watch(&self, profile_id: &str, card_id: &str) -> Result<()> {
        let (sql, params) = SqlBuilder::new("user_cards")
            .select(WATCH_COLUMNS)
            .where_eq("profile_id", profile_id)
            .where_eq("card_id", card_id)
            .limit(1)
            .build();
        let existing: Vec<WatchEntry> = self.conn.execute_into(&sql, &params)?;
        if existing.is_empty() {
            self.conn.execute_update(
                "INSERT INTO user_cards (profile_id, card_id, created_at) VALUES (?, ?, ?)",
                &[text(profile_id), text(card_id), text(Utc::now().to_rfc3339())],
            )?;
        }
        Ok(())
    }
}
