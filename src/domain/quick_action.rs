//! Quick actions - deterministic UI suggestions.
//!
//! Market-id mentions are detected by scanning the user's text, never by
//! asking the model; the resulting quick actions are attached to the chat
//! response regardless of what the model answered.

use serde::Serialize;

/// A UI-actionable suggestion derived from the user's message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickAction {
    /// Action discriminator; currently always `show_market`.
    #[serde(rename = "type")]
    pub action_type: String,
    /// Button label.
    pub label: String,
    /// The mentioned market id.
    #[serde(rename = "marketId")]
    pub market_id: String,
    /// Market page URL.
    #[serde(rename = "marketUrl")]
    pub market_url: String,
}

impl QuickAction {
    /// Build a `show_market` action for one detected id.
    pub fn show_market(market_id: &str, page_base_url: &str) -> Self {
        Self {
            action_type: "show_market".to_string(),
            label: format!("View Market {market_id}"),
            market_id: market_id.to_string(),
            market_url: format!("{}/markets/{market_id}", page_base_url.trim_end_matches('/')),
        }
    }
}

/// Extract market-id mentions from a message.
///
/// Recognizes `market 42`, `Market #42`, `market id: 42`, `market42` and
/// similar shapes, case-insensitive. Returns the ids in order of first
/// mention, deduplicated.
pub fn detect_market_ids(message: &str) -> Vec<String> {
    let lower = message.to_ascii_lowercase();
    let mut ids: Vec<String> = Vec::new();
    let mut cursor = 0;

    while let Some(found) = lower[cursor..].find("market") {
        let after_keyword = cursor + found + "market".len();
        match match_id_at(&lower, after_keyword) {
            Some((id, end)) => {
                if !ids.contains(&id) {
                    ids.push(id);
                }
                cursor = end;
            }
            None => cursor = after_keyword,
        }
    }

    ids
}

/// Match the `[id] [:#] <digits>` tail after a `market` keyword.
///
/// Returns the digit run and the scan position after it.
fn match_id_at(lower: &str, after_keyword: usize) -> Option<(String, usize)> {
    let bytes = lower.as_bytes();

    let skip_ws = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        i
    };

    let digits_after_separator = |mut i: usize| -> Option<(String, usize)> {
        if i < bytes.len() && (bytes[i] == b':' || bytes[i] == b'#') {
            i += 1;
        }
        i = skip_ws(i);
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        (i > start).then(|| (lower[start..i].to_string(), i))
    };

    let i = skip_ws(after_keyword);

    // Prefer the `market id 42` form, but fall back so that a stray `id`
    // prefix (`market identity`) doesn't hide a later plain match.
    if lower[i..].starts_with("id") {
        if let Some(hit) = digits_after_separator(skip_ws(i + 2)) {
            return Some(hit);
        }
    }

    digits_after_separator(i)
}
