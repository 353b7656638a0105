//! Item aggregate, status set, and request-level validation helpers.
//!
//! This module lives in `core` (zero internal deps) so both the store
//! adapters and the HTTP layer share one definition of what a valid item is.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 255;

/// Page size used when the caller omits one or asks for an invalid size.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest page size a listing will honour.
pub const MAX_PAGE_SIZE: i64 = 200;

/// Wire format of a deadline (date granularity, no time of day).
pub const DEADLINE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// The closed set of item statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Now,
    Future,
    History,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Now, Status::Future, Status::History];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Now => "now",
            Status::Future => "future",
            Status::History => "history",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "now" => Ok(Status::Now),
            "future" => Ok(Status::Future),
            "history" => Ok(Status::History),
            other => Err(CoreError::InvalidArgument(format!(
                "Invalid status '{other}'. Must be one of: now, future, history"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A to-do item as persisted by the item store.
///
/// `completed_at` is set if and only if `status` is [`Status::History`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub notes: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: Status,
    pub sort_weight: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl Item {
    /// Whether the completion invariant holds for this row.
    pub fn completion_consistent(&self) -> bool {
        (self.status == Status::History) == self.completed_at.is_some()
    }
}

/// A row about to be inserted. The store assigns `created_at`/`updated_at`.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub notes: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: Status,
    pub sort_weight: i64,
    pub completed_at: Option<Timestamp>,
}

/// Partial column update applied by bulk moves and reorders.
///
/// `None` leaves a column untouched; `completed_at: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub status: Option<Status>,
    pub sort_weight: Option<i64>,
    pub completed_at: Option<Option<Timestamp>>,
}

/// An item together with its direct children, ordered by weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemNode {
    #[serde(flatten)]
    pub item: Item,
    pub children: Vec<Item>,
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Filter for root-item listings.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<Status>,
    pub keyword: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ListFilter {
    /// 1-based page, defaulting to the first page.
    pub fn page(&self) -> i64 {
        match self.page {
            Some(p) if p > 0 => p,
            _ => 1,
        }
    }

    /// Page size, falling back to [`DEFAULT_PAGE_SIZE`] outside `1..=MAX_PAGE_SIZE`.
    pub fn page_size(&self) -> i64 {
        match self.page_size {
            Some(s) if s > 0 && s <= MAX_PAGE_SIZE => s,
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.page_size())
    }

    /// Trimmed keyword, `None` when blank.
    pub fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// One page of root items, plus the unpaginated total.
#[derive(Debug, Clone, Serialize)]
pub struct ItemPage {
    pub items: Vec<ItemNode>,
    pub total: i64,
}

// ---------------------------------------------------------------------------
// Validation and parsing
// ---------------------------------------------------------------------------

/// Validate that a title is non-blank and at most [`MAX_TITLE_LEN`] characters.
pub fn validate_title(title: &str) -> CoreResult<()> {
    if title.trim().is_empty() {
        return Err(CoreError::InvalidArgument(
            "title must not be empty".to_string(),
        ));
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(CoreError::InvalidArgument(format!(
            "title must be at most {MAX_TITLE_LEN} characters, got {len}"
        )));
    }
    Ok(())
}

/// Validate a caller-supplied id list for a bulk operation.
///
/// The list must be non-empty, contain no blank ids, and contain no
/// duplicates (persisted order must match requested order one-to-one).
pub fn validate_ids(ids: &[String]) -> CoreResult<()> {
    if ids.is_empty() {
        return Err(CoreError::InvalidArgument(
            "id list must not be empty".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if id.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "id list must not contain blank ids".to_string(),
            ));
        }
        if !seen.insert(id.as_str()) {
            return Err(CoreError::InvalidArgument(format!(
                "id list contains duplicate id '{id}'"
            )));
        }
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` deadline.
pub fn parse_deadline(raw: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DEADLINE_FORMAT)
        .map_err(|_| CoreError::InvalidArgument(format!("invalid deadline format '{raw}'")))
}

/// Parse an RFC 3339 timestamp (used for explicit completion times).
pub fn parse_timestamp(raw: &str) -> CoreResult<Timestamp> {
    chrono::DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|_| CoreError::InvalidArgument(format!("invalid completed time '{raw}'")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    // -- Status --------------------------------------------------------------

    #[test]
    fn status_round_trips_through_str() {
        for status in Status::ALL {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
    }

    #[test]
    fn status_rejects_unknown_values() {
        assert_matches!("done".parse::<Status>(), Err(CoreError::InvalidArgument(_)));
        assert_matches!("".parse::<Status>(), Err(CoreError::InvalidArgument(_)));
        assert_matches!("NOW".parse::<Status>(), Err(CoreError::InvalidArgument(_)));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&Status::History).unwrap();
        assert_eq!(json, "\"history\"");
    }

    // -- validate_title ------------------------------------------------------

    #[test]
    fn title_accepts_normal_text() {
        assert!(validate_title("Buy milk").is_ok());
    }

    #[test]
    fn title_rejects_blank() {
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
    }

    #[test]
    fn title_length_is_counted_in_chars() {
        let at_limit = "é".repeat(MAX_TITLE_LEN);
        assert!(validate_title(&at_limit).is_ok());
        let over = "a".repeat(MAX_TITLE_LEN + 1);
        assert!(validate_title(&over).is_err());
    }

    // -- validate_ids --------------------------------------------------------

    #[test]
    fn ids_reject_empty_list() {
        assert_matches!(validate_ids(&[]), Err(CoreError::InvalidArgument(_)));
    }

    #[test]
    fn ids_reject_duplicates_and_blanks() {
        let dup = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        assert!(validate_ids(&dup).is_err());
        let blank = vec!["a".to_string(), " ".to_string()];
        assert!(validate_ids(&blank).is_err());
    }

    #[test]
    fn ids_accept_distinct_list() {
        let ids = vec!["a".to_string(), "b".to_string()];
        assert!(validate_ids(&ids).is_ok());
    }

    // -- parsing -------------------------------------------------------------

    #[test]
    fn deadline_parses_iso_date() {
        let date = parse_deadline("2026-03-01").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn deadline_rejects_garbage() {
        assert!(parse_deadline("03/01/2026").is_err());
        assert!(parse_deadline("2026-02-30").is_err());
    }

    #[test]
    fn timestamp_parses_rfc3339_with_offset() {
        let ts = parse_timestamp("2026-01-02T10:00:00+02:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-01-02T08:00:00+00:00");
    }

    #[test]
    fn timestamp_rejects_plain_date() {
        assert!(parse_timestamp("2026-01-02").is_err());
    }

    // -- ListFilter ----------------------------------------------------------

    #[test]
    fn list_filter_defaults() {
        let filter = ListFilter::default();
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(filter.offset(), 0);
        assert_eq!(filter.keyword(), None);
    }

    #[test]
    fn list_filter_clamps_page_size() {
        let filter = ListFilter {
            page: Some(3),
            page_size: Some(MAX_PAGE_SIZE + 1),
            ..Default::default()
        };
        assert_eq!(filter.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(filter.offset(), 2 * DEFAULT_PAGE_SIZE);

        let zero = ListFilter {
            page: Some(0),
            page_size: Some(0),
            ..Default::default()
        };
        assert_eq!(zero.page(), 1);
        assert_eq!(zero.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn list_filter_trims_keyword() {
        let filter = ListFilter {
            keyword: Some("  milk ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.keyword(), Some("milk"));
    }
}
