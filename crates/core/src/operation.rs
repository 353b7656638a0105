//! Operation log vocabulary: action kinds, scopes, tokens and entries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::snapshot::Snapshot;
use crate::types::Timestamp;

/// Length of an undo token in characters.
pub const TOKEN_LEN: usize = 26;

/// Default lifetime of an undo token, in seconds.
pub const DEFAULT_UNDO_TTL_SECS: i64 = 5;

// ---------------------------------------------------------------------------
// Action kinds
// ---------------------------------------------------------------------------

/// The mutation an operation log entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Update,
    Move,
    Complete,
    Delete,
    BulkMove,
    BulkComplete,
    BulkDelete,
    Resort,
}

/// What the item store must do to reverse an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// Remove every row named by the after snapshots.
    DeleteAfter,
    /// Upsert every row from the before snapshots, overwriting all columns.
    RestoreBefore,
}

impl ActionKind {
    pub const ALL: [ActionKind; 9] = [
        ActionKind::Create,
        ActionKind::Update,
        ActionKind::Move,
        ActionKind::Complete,
        ActionKind::Delete,
        ActionKind::BulkMove,
        ActionKind::BulkComplete,
        ActionKind::BulkDelete,
        ActionKind::Resort,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Move => "move",
            ActionKind::Complete => "complete",
            ActionKind::Delete => "delete",
            ActionKind::BulkMove => "bulk_move",
            ActionKind::BulkComplete => "bulk_complete",
            ActionKind::BulkDelete => "bulk_delete",
            ActionKind::Resort => "resort",
        }
    }

    /// Label of the entry recorded when this action is redeemed.
    ///
    /// Create and delete swap; everything else maps to itself because the
    /// before/after swap already carries the reversal.
    pub fn reverse(self) -> ActionKind {
        match self {
            ActionKind::Create => ActionKind::Delete,
            ActionKind::Delete => ActionKind::Create,
            ActionKind::Update => ActionKind::Update,
            ActionKind::Move => ActionKind::Move,
            ActionKind::Complete => ActionKind::Complete,
            ActionKind::BulkMove => ActionKind::BulkMove,
            ActionKind::BulkComplete => ActionKind::BulkComplete,
            ActionKind::BulkDelete => ActionKind::BulkDelete,
            ActionKind::Resort => ActionKind::Resort,
        }
    }

    /// Inverse effect applied to the item store on redemption.
    pub fn replay(self) -> Replay {
        match self {
            ActionKind::Create => Replay::DeleteAfter,
            ActionKind::Delete | ActionKind::BulkDelete => Replay::RestoreBefore,
            ActionKind::Update
            | ActionKind::Move
            | ActionKind::Complete
            | ActionKind::BulkMove
            | ActionKind::BulkComplete
            | ActionKind::Resort => Replay::RestoreBefore,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| CoreError::UnsupportedAction(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Whether an operation touched one item or a caller-supplied set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Single,
    Bulk,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Single => "single",
            Scope::Bulk => "bulk",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Scope::Single),
            "bulk" => Ok(Scope::Bulk),
            other => Err(CoreError::InvalidArgument(format!(
                "Invalid scope '{other}'. Must be one of: single, bulk"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// Opaque single-use capability granting the reversal of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UndoToken(String);

impl UndoToken {
    /// Generate a fresh token from a random (v4) UUID.
    ///
    /// v4 rather than v7 so tokens carry no creation-order information.
    pub fn generate() -> Self {
        let mut raw = Uuid::new_v4().simple().to_string();
        raw.truncate(TOKEN_LEN);
        UndoToken(raw)
    }

    /// Wrap a token string read back from storage or a request.
    pub fn new(raw: impl Into<String>) -> Self {
        UndoToken(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UndoToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// The content of an entry before the engine stamps token and times on it.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDraft {
    pub action: ActionKind,
    pub scope: Scope,
    pub item_ids: Vec<String>,
    pub before: Vec<Snapshot>,
    pub after: Vec<Snapshot>,
}

impl OperationDraft {
    /// Draft for a single-item mutation.
    pub fn single(
        action: ActionKind,
        item_id: impl Into<String>,
        before: Option<Snapshot>,
        after: Option<Snapshot>,
    ) -> Self {
        OperationDraft {
            action,
            scope: Scope::Single,
            item_ids: vec![item_id.into()],
            before: before.into_iter().collect(),
            after: after.into_iter().collect(),
        }
    }

    /// Draft for a bulk mutation; snapshots must align with `item_ids`.
    pub fn bulk(
        action: ActionKind,
        item_ids: Vec<String>,
        before: Vec<Snapshot>,
        after: Vec<Snapshot>,
    ) -> Self {
        OperationDraft {
            action,
            scope: Scope::Bulk,
            item_ids,
            before,
            after,
        }
    }

    /// Check that each non-empty snapshot list is positionally aligned with
    /// the affected ids.
    pub fn validate(&self) -> CoreResult<()> {
        if self.item_ids.is_empty() {
            return Err(CoreError::InvalidArgument(
                "operation must affect at least one item".to_string(),
            ));
        }
        for (label, snapshots) in [("before", &self.before), ("after", &self.after)] {
            if snapshots.is_empty() {
                continue;
            }
            let aligned = snapshots.len() == self.item_ids.len()
                && snapshots.iter().zip(&self.item_ids).all(|(s, id)| &s.id == id);
            if !aligned {
                return Err(CoreError::InvalidArgument(format!(
                    "{label} snapshots are not aligned with the affected ids"
                )));
            }
        }
        Ok(())
    }
}

/// A persisted, redeemable operation log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationEntry {
    pub token: UndoToken,
    pub action: ActionKind,
    pub scope: Scope,
    pub item_ids: Vec<String>,
    pub before: Vec<Snapshot>,
    pub after: Vec<Snapshot>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub consumed_at: Option<Timestamp>,
}

impl OperationEntry {
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Expired strictly after `expires_at`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Status;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn snap(id: &str) -> Snapshot {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Snapshot {
            id: id.to_string(),
            parent_id: None,
            title: id.to_string(),
            notes: None,
            deadline: None,
            status: Status::Now,
            sort_weight: 1,
            created_at: ts,
            updated_at: ts,
            completed_at: None,
        }
    }

    #[test]
    fn create_and_delete_are_mutual_inverses() {
        assert_eq!(ActionKind::Create.reverse(), ActionKind::Delete);
        assert_eq!(ActionKind::Delete.reverse(), ActionKind::Create);
    }

    #[test]
    fn other_actions_are_self_inverse() {
        for action in ActionKind::ALL {
            if matches!(action, ActionKind::Create | ActionKind::Delete) {
                continue;
            }
            assert_eq!(action.reverse(), action, "{action} should reverse to itself");
        }
    }

    #[test]
    fn only_create_replays_as_delete() {
        for action in ActionKind::ALL {
            let expected = if action == ActionKind::Create {
                Replay::DeleteAfter
            } else {
                Replay::RestoreBefore
            };
            assert_eq!(action.replay(), expected, "{action}");
        }
    }

    #[test]
    fn action_labels_round_trip() {
        for action in ActionKind::ALL {
            assert_eq!(action.as_str().parse::<ActionKind>().unwrap(), action);
        }
    }

    #[test]
    fn unknown_action_label_is_unsupported() {
        assert_matches!(
            "archive".parse::<ActionKind>(),
            Err(CoreError::UnsupportedAction(label)) if label == "archive"
        );
    }

    #[test]
    fn scope_parses_known_values() {
        assert_eq!("single".parse::<Scope>().unwrap(), Scope::Single);
        assert_eq!("bulk".parse::<Scope>().unwrap(), Scope::Bulk);
        assert!("many".parse::<Scope>().is_err());
    }

    #[test]
    fn token_is_fixed_length_and_url_safe() {
        let token = UndoToken::generate();
        assert_eq!(token.as_str().len(), TOKEN_LEN);
        assert!(token
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn tokens_are_unique() {
        let tokens: std::collections::HashSet<_> =
            (0..1000).map(|_| UndoToken::generate()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn draft_accepts_empty_before_list() {
        let draft = OperationDraft::single(ActionKind::Create, "a", None, Some(snap("a")));
        assert!(draft.validate().is_ok());
        assert!(draft.before.is_empty());
    }

    #[test]
    fn draft_rejects_misaligned_snapshots() {
        let draft = OperationDraft::bulk(
            ActionKind::BulkMove,
            vec!["a".to_string(), "b".to_string()],
            vec![snap("b"), snap("a")],
            vec![],
        );
        assert_matches!(draft.validate(), Err(CoreError::InvalidArgument(_)));

        let short = OperationDraft::bulk(
            ActionKind::BulkMove,
            vec!["a".to_string(), "b".to_string()],
            vec![snap("a")],
            vec![],
        );
        assert!(short.validate().is_err());
    }

    #[test]
    fn expiry_is_strictly_after_deadline() {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let entry = OperationEntry {
            token: UndoToken::generate(),
            action: ActionKind::Update,
            scope: Scope::Single,
            item_ids: vec!["a".to_string()],
            before: vec![snap("a")],
            after: vec![snap("a")],
            created_at: created,
            expires_at: created + chrono::Duration::seconds(5),
            consumed_at: None,
        };
        assert!(!entry.is_expired(entry.expires_at));
        assert!(entry.is_expired(entry.expires_at + chrono::Duration::milliseconds(1)));
        assert!(!entry.is_consumed());
    }
}
