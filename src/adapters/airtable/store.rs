//! Airtable Market Store - `MarketStore` Implementation
//!
//! Maps the port's row operations onto the Airtable REST API: offset
//! pagination for listing, `filterByFormula` selects for queries, and
//! batched create/update/delete calls capped at the store's 10-row
//! limit. Filter formulas are built from escaped values only — user
//! input is never interpolated raw.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use crate::ports::market_store::{
  Fields, MarketFilters, MarketStore, StoredRow, MAX_BATCH_ROWS,
};

use super::client::AirtableClient;
use super::types::{CreateRecords, NewRecord, RecordPage, UpdateRecord, UpdateRecords};

/// Column holding the sync sentinel.
const SYNC_STAMP_COLUMN: &str = "last_synced_at";

/// Page size for full-table listings.
const LIST_PAGE_SIZE: usize = 100;

/// `MarketStore` backed by one Airtable table.
pub struct AirtableStore {
  client: AirtableClient,
  /// Row cap applied when a query carries no explicit limit.
  default_limit: usize,
}

impl AirtableStore {
  pub fn new(client: AirtableClient, default_limit: usize) -> Self {
    Self {
      client,
      default_limit,
    }
  }

  /// Run one select and parse the page.
  async fn select_page(&self, query: &[(String, String)]) -> Result<RecordPage> {
    let response = self.client.select(query).await?;
    response
      .json::<RecordPage>()
      .await
      .context("Failed to parse Airtable select response")
  }

  /// In-memory substring fallback for searches the formula missed.
  ///
  /// `SEARCH()` is case-sensitive and literal; when it matches nothing
  /// we re-list and substring-match titles/descriptions ourselves so a
  /// near-miss query still finds its market.
  async fn fuzzy_search(&self, term: &str, limit: usize) -> Result<Vec<StoredRow>> {
    let needle = term.to_lowercase();
    let mut rows: Vec<StoredRow> = self
      .list_all()
      .await?
      .into_iter()
      .filter(|row| {
        ["Title", "Description"].iter().any(|column| {
          row
            .text(column)
            .is_some_and(|value| value.to_lowercase().contains(&needle))
        })
      })
      .collect();

    rows.truncate(limit);
    debug!(term, hits = rows.len(), "Formula search empty, used fuzzy fallback");
    Ok(rows)
  }
}

#[async_trait]
impl MarketStore for AirtableStore {
  async fn list_all(&self) -> Result<Vec<StoredRow>> {
    let mut rows = Vec::new();
    let mut offset: Option<String> = None;

    loop {
      let mut query = vec![("pageSize".to_string(), LIST_PAGE_SIZE.to_string())];
      if let Some(cursor) = offset.take() {
        query.push(("offset".to_string(), cursor));
      }

      let page = self.select_page(&query).await?;
      rows.extend(page.records.into_iter().map(StoredRow::from));

      match page.offset {
        Some(cursor) => offset = Some(cursor),
        None => break,
      }
    }

    Ok(rows)
  }

  #[instrument(skip(self))]
  async fn query_markets(&self, filters: &MarketFilters) -> Result<Vec<StoredRow>> {
    let limit = filters.limit.unwrap_or(self.default_limit);

    let mut query = vec![
      ("maxRecords".to_string(), limit.to_string()),
      ("sort[0][field]".to_string(), "Created Date".to_string()),
      ("sort[0][direction]".to_string(), "desc".to_string()),
    ];
    if let Some(formula) = build_filter_formula(filters) {
      query.push(("filterByFormula".to_string(), formula));
    }

    let page = self.select_page(&query).await?;
    let rows: Vec<StoredRow> = page.records.into_iter().map(StoredRow::from).collect();

    if rows.is_empty() {
      if let Some(term) = filters.search.as_deref() {
        return self.fuzzy_search(term, limit).await;
      }
    }

    Ok(rows)
  }

  async fn find_market(&self, market_id: &str) -> Result<Option<StoredRow>> {
    let formula = format!("{{Market ID}} = '{}'", escape_formula_text(market_id));
    let query = vec![
      ("maxRecords".to_string(), "1".to_string()),
      ("filterByFormula".to_string(), formula),
    ];

    let page = self.select_page(&query).await?;
    Ok(page.records.into_iter().next().map(StoredRow::from))
  }

  async fn create_batch(&self, rows: &[Fields]) -> Result<()> {
    anyhow::ensure!(
      rows.len() <= MAX_BATCH_ROWS,
      "create_batch takes at most {MAX_BATCH_ROWS} rows, got {}",
      rows.len()
    );

    let body = CreateRecords {
      records: rows.iter().map(|fields| NewRecord { fields }).collect(),
      typecast: true,
    };

    self
      .client
      .create(serde_json::to_string(&body)?)
      .await
      .context("Batch create failed")?;
    Ok(())
  }

  async fn update_batch(&self, updates: &[(String, Fields)]) -> Result<()> {
    anyhow::ensure!(
      updates.len() <= MAX_BATCH_ROWS,
      "update_batch takes at most {MAX_BATCH_ROWS} rows, got {}",
      updates.len()
    );

    let body = UpdateRecords {
      records: updates
        .iter()
        .map(|(id, fields)| UpdateRecord { id, fields })
        .collect(),
      typecast: true,
    };

    self
      .client
      .update(serde_json::to_string(&body)?)
      .await
      .context("Batch update failed")?;
    Ok(())
  }

  async fn delete_batch(&self, record_ids: &[String]) -> Result<()> {
    anyhow::ensure!(
      record_ids.len() <= MAX_BATCH_ROWS,
      "delete_batch takes at most {MAX_BATCH_ROWS} rows, got {}",
      record_ids.len()
    );

    self
      .client
      .delete(record_ids)
      .await
      .context("Batch delete failed")?;
    Ok(())
  }

  async fn write_sync_stamp(&self, record_id: &str, iso_timestamp: &str) -> Result<()> {
    let mut fields = Fields::new();
    fields.insert(SYNC_STAMP_COLUMN.to_string(), json!(iso_timestamp));

    let body = UpdateRecords {
      records: vec![UpdateRecord {
        id: record_id,
        fields: &fields,
      }],
      typecast: true,
    };

    self
      .client
      .update(serde_json::to_string(&body)?)
      .await
      .context("Sync-stamp write failed")?;
    Ok(())
  }

  async fn last_synced_at(&self) -> Result<Option<String>> {
    let query = vec![
      ("maxRecords".to_string(), "1".to_string()),
      (
        "filterByFormula".to_string(),
        format!("NOT({{{SYNC_STAMP_COLUMN}}} = '')"),
      ),
    ];

    let page = self.select_page(&query).await?;
    Ok(
      page
        .records
        .into_iter()
        .next()
        .and_then(|record| {
          record
            .fields
            .get(SYNC_STAMP_COLUMN)
            .and_then(|v| v.as_str())
            .map(str::to_string)
        }),
    )
  }

  async fn is_healthy(&self) -> bool {
    let query = vec![("pageSize".to_string(), "1".to_string())];
    self.select_page(&query).await.is_ok()
  }
}

/// Escape a value for embedding in a single-quoted formula string.
pub fn escape_formula_text(value: &str) -> String {
  value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Build the `filterByFormula` expression for a market query.
///
/// Returns `None` when no filter is set (full listing).
pub fn build_filter_formula(filters: &MarketFilters) -> Option<String> {
  let mut clauses = Vec::new();

  if let Some(status) = filters.status.as_deref() {
    clauses.push(format!("{{Status}} = '{}'", escape_formula_text(status)));
  }
  if let Some(category) = filters.category.as_deref() {
    clauses.push(format!("{{Category}} = '{}'", escape_formula_text(category)));
  }
  if let Some(search) = filters.search.as_deref() {
    let term = escape_formula_text(search);
    clauses.push(format!(
      "OR(SEARCH('{term}', {{Title}}), SEARCH('{term}', {{Description}}))"
    ));
  }

  match clauses.len() {
    0 => None,
    1 => clauses.pop(),
    _ => Some(format!("AND({})", clauses.join(", "))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_no_filters_no_formula() {
    assert_eq!(build_filter_formula(&MarketFilters::default()), None);
  }

  #[test]
  fn test_single_filter_stands_alone() {
    let filters = MarketFilters {
      status: Some("ACTIVE".to_string()),
      ..Default::default()
    };
    assert_eq!(
      build_filter_formula(&filters).unwrap(),
      "{Status} = 'ACTIVE'"
    );
  }

  #[test]
  fn test_multiple_filters_join_with_and() {
    let filters = MarketFilters {
      status: Some("RESOLVED".to_string()),
      search: Some("bitcoin".to_string()),
      ..Default::default()
    };
    assert_eq!(
      build_filter_formula(&filters).unwrap(),
      "AND({Status} = 'RESOLVED', \
       OR(SEARCH('bitcoin', {Title}), SEARCH('bitcoin', {Description})))"
    );
  }

  #[test]
  fn test_quotes_and_backslashes_are_escaped() {
    assert_eq!(escape_formula_text("O'Brien"), "O\\'Brien");
    assert_eq!(escape_formula_text(r"a\b"), r"a\\b");

    let filters = MarketFilters {
      search: Some("') , DELETE_ROWS('".to_string()),
      ..Default::default()
    };
    let formula = build_filter_formula(&filters).unwrap();
    assert!(formula.contains(r"\') , DELETE_ROWS(\'"));
  }
}
