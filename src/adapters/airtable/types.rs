//! Airtable API Request/Response Types
//!
//! Defines the serialization types for the Airtable REST API. Row
//! columns travel as loose JSON maps (`ports::market_store::Fields`);
//! only the envelope is typed.

use serde::{Deserialize, Serialize};

use crate::ports::market_store::{Fields, StoredRow};

/// One page of a select (list) response.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordPage {
  /// Records on this page.
  #[serde(default)]
  pub records: Vec<WireRecord>,
  /// Continuation token; absent on the last page.
  pub offset: Option<String>,
}

/// One record as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct WireRecord {
  /// Store-assigned record id (`rec...`).
  pub id: String,
  /// Column name → value.
  #[serde(default)]
  pub fields: Fields,
  /// Server-side creation timestamp.
  #[serde(rename = "createdTime")]
  pub created_time: Option<String>,
}

impl From<WireRecord> for StoredRow {
  fn from(record: WireRecord) -> Self {
    Self {
      id: record.id,
      fields: record.fields,
    }
  }
}

/// Batch-create request body (max 10 records).
#[derive(Debug, Serialize)]
pub struct CreateRecords<'a> {
  pub records: Vec<NewRecord<'a>>,
  /// Let the store coerce cell types (dates, numbers) from strings.
  pub typecast: bool,
}

/// One record to create.
#[derive(Debug, Serialize)]
pub struct NewRecord<'a> {
  pub fields: &'a Fields,
}

/// Batch-update request body (max 10 records).
#[derive(Debug, Serialize)]
pub struct UpdateRecords<'a> {
  pub records: Vec<UpdateRecord<'a>>,
  pub typecast: bool,
}

/// One record to update in place.
#[derive(Debug, Serialize)]
pub struct UpdateRecord<'a> {
  pub id: &'a str,
  pub fields: &'a Fields,
}
