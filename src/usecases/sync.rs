//! Sync Orchestrator - Chain → Enrichment → Table-store Upsert
//!
//! One sync run replaces the store's market snapshot with the chain's
//! current view:
//!
//! 1. Fetch all markets from the chain (fatal on failure)
//! 2. List all existing store rows
//! 3. Build each market's desired row (dates, collateral, metadata,
//!    conditional resolution reason)
//! 4. Diff against existing rows by `Market ID` — creates, updates,
//!    deletes; unchanged rows produce no write
//! 5. Apply in batches of at most 10 rows per store call
//! 6. Stamp `last_synced_at` on the first remaining row
//!
//! The upsert replaces the original wipe-and-rewrite cycle so the store
//! is never empty mid-run. Store failures propagate to the caller;
//! enrichment failures only cost the affected columns.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::domain::{ChainMarket, MarketId};
use crate::ports::enrichment::{MetadataFetch, ResolutionExplain};
use crate::ports::market_source::MarketSource;
use crate::ports::market_store::{Fields, MarketStore, StoredRow, MAX_BATCH_ROWS};

/// Every column the sync job owns. Columns in this list that a desired
/// row no longer carries are cleared on update; anything else in the
/// table (like `last_synced_at`) is left alone.
const MANAGED_COLUMNS: &[&str] = &[
    "Market ID",
    "Status",
    "Creator",
    "Resolver",
    "Outcome Count",
    "Collateral Amount",
    "Metadata URI",
    "Block Number",
    "Created Date",
    "Expires Date",
    "Resolved Date",
    "Paused Date",
    "Title",
    "Description",
    "Category",
    "Tags",
    "Image URL",
    "Rules Description",
    "Resolution Sources",
    "Outcomes",
    "reason_it_was_resolved",
];

/// Outcome of one sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Markets fetched from the chain.
    pub markets: usize,
    /// Rows created.
    pub created: usize,
    /// Rows updated.
    pub updated: usize,
    /// Rows deleted.
    pub deleted: usize,
    /// Rows already up to date.
    pub unchanged: usize,
}

/// Row mutations one sync run will apply.
#[derive(Debug, Default)]
pub struct SyncPlan {
    pub creates: Vec<Fields>,
    pub updates: Vec<(String, Fields)>,
    pub deletes: Vec<String>,
    pub unchanged: usize,
}

/// Orchestrates one full sync run.
pub struct SyncOrchestrator {
    source: Arc<dyn MarketSource>,
    store: Arc<dyn MarketStore>,
    metadata: Arc<dyn MetadataFetch>,
    explainer: Arc<dyn ResolutionExplain>,
}

impl SyncOrchestrator {
    pub fn new(
        source: Arc<dyn MarketSource>,
        store: Arc<dyn MarketStore>,
        metadata: Arc<dyn MetadataFetch>,
        explainer: Arc<dyn ResolutionExplain>,
    ) -> Self {
        Self {
            source,
            store,
            metadata,
            explainer,
        }
    }

    /// Run one full sync.
    #[instrument(skip_all)]
    pub async fn run(&self) -> Result<SyncReport> {
        let markets = self
            .source
            .fetch_markets()
            .await
            .context("Market fetch failed")?;
        info!(markets = markets.len(), "Fetched markets from chain");

        let existing = self
            .store
            .list_all()
            .await
            .context("Failed to list existing rows")?;

        let mut desired = Vec::with_capacity(markets.len());
        for market in &markets {
            desired.push(self.build_row(market).await);
        }

        let plan = plan_sync(&existing, desired);
        info!(
            creates = plan.creates.len(),
            updates = plan.updates.len(),
            deletes = plan.deletes.len(),
            unchanged = plan.unchanged,
            "Sync plan ready"
        );

        let report = SyncReport {
            markets: markets.len(),
            created: plan.creates.len(),
            updated: plan.updates.len(),
            deleted: plan.deletes.len(),
            unchanged: plan.unchanged,
        };

        for chunk in plan.creates.chunks(MAX_BATCH_ROWS) {
            self.store.create_batch(chunk).await?;
        }
        for chunk in plan.updates.chunks(MAX_BATCH_ROWS) {
            self.store.update_batch(chunk).await?;
        }
        for chunk in plan.deletes.chunks(MAX_BATCH_ROWS) {
            self.store.delete_batch(chunk).await?;
        }

        if !markets.is_empty() {
            self.stamp().await?;
        }

        info!(
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            "Sync run complete"
        );
        Ok(report)
    }

    /// Build the desired row for one market.
    async fn build_row(&self, market: &ChainMarket) -> (MarketId, Fields) {
        let mut fields = Fields::new();
        fields.insert("Market ID".to_string(), json!(market.market_id));
        fields.insert("Status".to_string(), json!(market.status.to_string()));
        fields.insert("Creator".to_string(), json!(market.creator));
        fields.insert("Resolver".to_string(), json!(market.resolver));
        fields.insert("Outcome Count".to_string(), json!(market.outcome_count));
        fields.insert(
            "Collateral Amount".to_string(),
            json!(market.collateral_amount),
        );
        fields.insert("Metadata URI".to_string(), json!(market.metadata_uri));
        fields.insert("Block Number".to_string(), json!(market.block_number));

        for (name, date) in market.date_fields() {
            fields.insert(name.to_string(), json!(date));
        }

        let metadata = self.metadata.fetch_metadata(&market.metadata_uri).await;
        if let Some(meta) = &metadata {
            if let Some(title) = &meta.title {
                fields.insert("Title".to_string(), json!(title));
            }
            if let Some(description) = &meta.description {
                fields.insert("Description".to_string(), json!(description));
            }
            if let Some(category) = &meta.category {
                fields.insert("Category".to_string(), json!(category));
            }
            if !meta.tags.is_empty() {
                fields.insert("Tags".to_string(), json!(meta.tags.join(", ")));
            }
            if let Some(image_url) = &meta.image_url {
                fields.insert("Image URL".to_string(), json!(image_url));
            }
            if let Some(rules) = meta.rules.as_ref().and_then(|r| r.description.as_ref()) {
                fields.insert("Rules Description".to_string(), json!(rules));
            }
            if !meta.resolution_sources.is_empty() {
                fields.insert(
                    "Resolution Sources".to_string(),
                    json!(meta.resolution_sources.join("\n")),
                );
            }
            if let Some(outcomes) = meta.outcomes_column() {
                fields.insert("Outcomes".to_string(), json!(outcomes));
            }
        }

        if market.is_resolved() {
            let sources = metadata
                .as_ref()
                .map(|m| m.resolution_sources.clone())
                .unwrap_or_default();
            let title = metadata.as_ref().and_then(|m| m.title.as_deref());

            if let Some(reason) = self
                .explainer
                .explain(&market.market_id, &sources, title)
                .await
            {
                fields.insert("reason_it_was_resolved".to_string(), json!(reason));
            }
        }

        (market.market_id.clone(), fields)
    }

    /// Overwrite the sync sentinel on the first remaining row.
    async fn stamp(&self) -> Result<()> {
        let rows = self
            .store
            .list_all()
            .await
            .context("Failed to re-list rows for sync stamp")?;

        if let Some(first) = rows.first() {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            self.store
                .write_sync_stamp(&first.id, &now)
                .await
                .context("Failed to write sync stamp")?;
            info!(record = %first.id, stamped_at = %now, "Updated last_synced_at");
        }

        Ok(())
    }
}

/// Diff desired rows against existing rows by `Market ID`.
///
/// Rows without a `Market ID` column count as stale and are deleted.
pub fn plan_sync(existing: &[StoredRow], desired: Vec<(MarketId, Fields)>) -> SyncPlan {
    let by_id: HashMap<&str, &StoredRow> = existing
        .iter()
        .filter_map(|row| row.market_id().map(|id| (id, row)))
        .collect();

    let mut plan = SyncPlan::default();
    let mut seen: HashSet<MarketId> = HashSet::new();

    for (market_id, fields) in desired {
        match by_id.get(market_id.as_str()) {
            None => plan.creates.push(fields),
            Some(row) => {
                let patch = diff_fields(&row.fields, &fields);
                if patch.is_empty() {
                    plan.unchanged += 1;
                } else {
                    plan.updates.push((row.id.clone(), patch));
                }
            }
        }
        seen.insert(market_id);
    }

    for row in existing {
        let stale = match row.market_id() {
            Some(id) => !seen.contains(id),
            None => true,
        };
        if stale {
            plan.deletes.push(row.id.clone());
        }
    }

    plan
}

/// Columns to write so `existing` becomes `desired`.
///
/// Managed columns the desired row dropped are cleared with nulls;
/// an empty patch means the row is already up to date.
fn diff_fields(existing: &Fields, desired: &Fields) -> Fields {
    let mut patch = Fields::new();

    for (column, value) in desired {
        if existing.get(column) != Some(value) {
            patch.insert(column.clone(), value.clone());
        }
    }

    for column in MANAGED_COLUMNS {
        if !desired.contains_key(*column) && existing.contains_key(*column) {
            patch.insert((*column).to_string(), Value::Null);
        }
    }

    patch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn row(id: &str, market_id: &str, extra: &[(&str, Value)]) -> StoredRow {
        let mut f = fields(extra);
        f.insert("Market ID".to_string(), json!(market_id));
        StoredRow {
            id: id.to_string(),
            fields: f,
        }
    }

    #[test]
    fn test_fresh_store_plans_only_creates() {
        let desired = vec![
            ("1".to_string(), fields(&[("Market ID", json!("1"))])),
            ("2".to_string(), fields(&[("Market ID", json!("2"))])),
        ];

        let plan = plan_sync(&[], desired);
        assert_eq!(plan.creates.len(), 2);
        assert!(plan.updates.is_empty());
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn test_vanished_markets_plan_deletes() {
        let existing = vec![row("recA", "1", &[]), row("recB", "2", &[])];
        let plan = plan_sync(&existing, Vec::new());

        assert_eq!(plan.deletes, vec!["recA".to_string(), "recB".to_string()]);
        assert!(plan.creates.is_empty());
    }

    #[test]
    fn test_unchanged_row_produces_no_write() {
        let existing = vec![row("recA", "1", &[("Status", json!("ACTIVE"))])];
        let desired = vec![(
            "1".to_string(),
            fields(&[("Market ID", json!("1")), ("Status", json!("ACTIVE"))]),
        )];

        let plan = plan_sync(&existing, desired);
        assert_eq!(plan.unchanged, 1);
        assert!(plan.updates.is_empty());
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn test_changed_row_patches_only_the_difference() {
        let existing = vec![row(
            "recA",
            "1",
            &[("Status", json!("ACTIVE")), ("Title", json!("Old"))],
        )];
        let desired = vec![(
            "1".to_string(),
            fields(&[
                ("Market ID", json!("1")),
                ("Status", json!("RESOLVED")),
                ("Title", json!("Old")),
            ]),
        )];

        let plan = plan_sync(&existing, desired);
        assert_eq!(plan.updates.len(), 1);

        let (record_id, patch) = &plan.updates[0];
        assert_eq!(record_id, "recA");
        assert_eq!(patch.get("Status"), Some(&json!("RESOLVED")));
        assert!(!patch.contains_key("Title"));
        assert!(!patch.contains_key("Market ID"));
    }

    #[test]
    fn test_dropped_managed_column_is_cleared() {
        // Metadata disappeared between runs: Title must be nulled out.
        let existing = vec![row("recA", "1", &[("Title", json!("Gone soon"))])];
        let desired = vec![("1".to_string(), fields(&[("Market ID", json!("1"))]))];

        let plan = plan_sync(&existing, desired);
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].1.get("Title"), Some(&Value::Null));
    }

    #[test]
    fn test_sentinel_column_is_not_cleared() {
        let existing = vec![row(
            "recA",
            "1",
            &[("last_synced_at", json!("2026-08-08T00:00:00.000Z"))],
        )];
        let desired = vec![("1".to_string(), fields(&[("Market ID", json!("1"))]))];

        let plan = plan_sync(&existing, desired);
        assert_eq!(plan.unchanged, 1);
        assert!(plan.updates.is_empty());
    }

    #[test]
    fn test_rows_without_market_id_are_deleted() {
        let orphan = StoredRow {
            id: "recX".to_string(),
            fields: fields(&[("Title", json!("no id"))]),
        };

        let plan = plan_sync(&[orphan], Vec::new());
        assert_eq!(plan.deletes, vec!["recX".to_string()]);
    }
}
