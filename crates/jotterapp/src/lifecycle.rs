//! # Item Lifecycle
//!
//! ```text
//!            archive               trash
//!   Active ──────────▶ Archived ──────────▶ Trashed ──delete──▶ Deleted
//!     ▲  ◀──────────              │            │
//!     │    unarchive              │            │
//!     │                           │            │
//!     └────────── restore ◀───────┴────────────┘  (trash also from Active)
//! ```
//!
//! - Restore always lands in `Active`, never back in `Archived`; the service
//!   exposes no "restore to archive" move.
//! - Permanent deletion is only reachable from `Trashed`.
//! - Pinning is a flag, not a state. It is allowed in every live state.
//!
//! The state machine here is only a local guard. The authoritative outcome of
//! every move is the item the service sends back, which the store applies
//! as-is.

use crate::model::{ItemMeta, Partition};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Active,
    Archived,
    Trashed,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Archive,
    Unarchive,
    Trash,
    Restore,
    TogglePin,
    Delete,
}

impl Lifecycle {
    pub fn of(meta: &ItemMeta) -> Self {
        Partition::of(meta).into()
    }

    /// The state reached by `action`, or `None` when the move is illegal.
    pub fn apply(self, action: Action) -> Option<Lifecycle> {
        use Action::*;
        use Lifecycle::*;
        match (self, action) {
            (Active, Archive) => Some(Archived),
            (Archived, Unarchive) => Some(Active),
            (Active | Archived, Trash) => Some(Trashed),
            (Trashed, Restore) => Some(Active),
            (Trashed, Delete) => Some(Deleted),
            (state, TogglePin) if state != Deleted => Some(state),
            _ => None,
        }
    }

    pub fn partition(self) -> Option<Partition> {
        match self {
            Lifecycle::Active => Some(Partition::Active),
            Lifecycle::Archived => Some(Partition::Archived),
            Lifecycle::Trashed => Some(Partition::Trashed),
            Lifecycle::Deleted => None,
        }
    }
}

impl From<Partition> for Lifecycle {
    fn from(p: Partition) -> Self {
        match p {
            Partition::Active => Lifecycle::Active,
            Partition::Archived => Lifecycle::Archived,
            Partition::Trashed => Lifecycle::Trashed,
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lifecycle::Active => "active",
            Lifecycle::Archived => "archived",
            Lifecycle::Trashed => "trashed",
            Lifecycle::Deleted => "deleted",
        })
    }
}

impl Action {
    /// Path segment of the transition endpoint. `Delete` has none; it is a
    /// `DELETE` on the item itself.
    pub fn endpoint(self) -> Option<&'static str> {
        match self {
            Action::Archive => Some("archive"),
            Action::Unarchive => Some("unarchive"),
            Action::Trash => Some("trash"),
            Action::Restore => Some("restore"),
            Action::TogglePin => Some("toggle-pin"),
            Action::Delete => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Archive => "archive",
            Action::Unarchive => "unarchive",
            Action::Trash => "trash",
            Action::Restore => "restore",
            Action::TogglePin => "pin",
            Action::Delete => "delete",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Action::*;
    use Lifecycle::*;

    #[test]
    fn legal_moves() {
        assert_eq!(Active.apply(Archive), Some(Archived));
        assert_eq!(Archived.apply(Unarchive), Some(Active));
        assert_eq!(Active.apply(Trash), Some(Trashed));
        assert_eq!(Archived.apply(Trash), Some(Trashed));
        assert_eq!(Trashed.apply(Delete), Some(Deleted));
    }

    #[test]
    fn restore_always_returns_to_active() {
        assert_eq!(Trashed.apply(Restore), Some(Active));
    }

    #[test]
    fn delete_only_from_trash() {
        assert_eq!(Active.apply(Delete), None);
        assert_eq!(Archived.apply(Delete), None);
    }

    #[test]
    fn illegal_moves_are_refused() {
        assert_eq!(Trashed.apply(Archive), None);
        assert_eq!(Active.apply(Unarchive), None);
        assert_eq!(Active.apply(Restore), None);
        assert_eq!(Deleted.apply(Restore), None);
        assert_eq!(Deleted.apply(TogglePin), None);
    }

    #[test]
    fn pin_is_orthogonal() {
        for state in [Active, Archived, Trashed] {
            assert_eq!(state.apply(TogglePin), Some(state));
        }
    }
}
