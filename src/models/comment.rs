use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::PublicComment;
use crate::guard;

/// A guestbook entry as it is persisted, owner token included.
///
/// Rows written before ownership tracking existed carry neither `edited`
/// nor `ownerToken`; both default so those rows still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub name: String,
    pub text: String,
    /// Locale-style stamp of the last write, shown next to the entry.
    #[serde(rename = "date")]
    pub last_modified_display: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub edited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_token: Option<String>,
}

/// The owner-mutable fields rewritten by an edit.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentPatch {
    pub name: String,
    pub text: String,
    pub last_modified_display: String,
}

impl Comment {
    /// Rewrites the editable fields and marks the entry as edited for good.
    pub fn apply(&mut self, patch: &CommentPatch) {
        self.name.clone_from(&patch.name);
        self.text.clone_from(&patch.text);
        self.last_modified_display
            .clone_from(&patch.last_modified_display);
        self.edited = true;
    }

    /// Projects the entry for one viewer: the owner token is dropped and
    /// `is_mine` is derived from it.
    pub fn shape(&self, viewer: Option<&str>) -> PublicComment {
        PublicComment {
            id: self.id.clone(),
            name: self.name.clone(),
            text: self.text.clone(),
            date: self.last_modified_display.clone(),
            created_at: self.created_at,
            edited: self.edited,
            is_mine: guard::can_mutate(viewer, self),
        }
    }
}
