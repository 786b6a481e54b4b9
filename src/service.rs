//! The four guestbook operations: ownership checks, input rules and
//! shaping on top of whichever [`CommentStore`] was opened.

use std::sync::Arc;

use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::error::ServiceError;
use crate::guard;
use crate::id::generate_id;
use crate::models::{Comment, CommentPatch, PublicComment};
use crate::store::{CommentStore, Subscription};
use crate::timefmt::display_stamp;

pub type Result<T> = std::result::Result<T, ServiceError>;

pub struct CommentService {
    store: Arc<dyn CommentStore>,
    time_zone: TimeZone,
}

impl CommentService {
    pub fn new(store: Arc<dyn CommentStore>, time_zone: TimeZone) -> Self {
        Self { store, time_zone }
    }

    pub fn store(&self) -> &Arc<dyn CommentStore> {
        &self.store
    }

    /// Every comment, newest first, shaped for `viewer`.
    pub fn list(&self, viewer: Option<&str>) -> Result<Vec<PublicComment>> {
        let comments = self.store.list()?;
        tracing::debug!(count = comments.len(), "listed comments");
        Ok(comments.iter().map(|c| c.shape(viewer)).collect())
    }

    pub fn create(&self, viewer: Option<&str>, name: &str, text: &str) -> Result<PublicComment> {
        let token = require_token(viewer)?;
        let name = require_field("name", name)?;
        let text = require_field("text", text)?;

        let now = Timestamp::now();
        let comment = Comment {
            id: generate_id(),
            name: name.to_string(),
            text: text.to_string(),
            last_modified_display: display_stamp(now, &self.time_zone),
            created_at: Some(now),
            edited: false,
            owner_token: Some(token.to_string()),
        };

        self.store.insert(comment.clone())?;
        tracing::info!(id = %comment.id, backend = self.store.backend().as_ref(), "comment created");
        Ok(comment.shape(Some(token)))
    }

    pub fn update(
        &self,
        viewer: Option<&str>,
        id: &str,
        name: &str,
        text: &str,
    ) -> Result<PublicComment> {
        let token = require_token(viewer)?;
        let name = require_field("name", name)?;
        let text = require_field("text", text)?;
        self.authorize(token, id)?;

        let patch = CommentPatch {
            name: name.to_string(),
            text: text.to_string(),
            last_modified_display: display_stamp(Timestamp::now(), &self.time_zone),
        };

        // Gone between the check and the write: deleted by its owner elsewhere.
        let updated = self
            .store
            .patch(id, &patch)?
            .ok_or_else(|| not_found(id))?;
        tracing::info!(id, "comment updated");
        Ok(updated.shape(Some(token)))
    }

    pub fn delete(&self, viewer: Option<&str>, id: &str) -> Result<()> {
        let token = require_token(viewer)?;
        self.authorize(token, id)?;

        if !self.store.remove(id)? {
            return Err(not_found(id));
        }
        tracing::info!(id, "comment deleted");
        Ok(())
    }

    /// Opens the change feed of the underlying store.
    pub fn subscribe(&self) -> Result<Subscription> {
        Ok(self.store.subscribe()?)
    }

    fn authorize(&self, token: &str, id: &str) -> Result<()> {
        let comment = self.store.get(id)?.ok_or_else(|| not_found(id))?;
        if !guard::can_mutate(Some(token), &comment) {
            tracing::warn!(id, "rejected mutation by non-owner");
            return Err(ServiceError::Forbidden { id: id.to_string() });
        }
        Ok(())
    }
}

/// A usable requester token. The migration owner is never one: a comment
/// written under it could not be edited by its own author.
fn require_token(viewer: Option<&str>) -> Result<&str> {
    viewer
        .filter(|t| !t.trim().is_empty() && *t != guard::LEGACY_OWNER)
        .ok_or(ServiceError::MissingToken)
}

fn require_field<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput { field });
    }
    Ok(trimmed)
}

fn not_found(id: &str) -> ServiceError {
    tracing::debug!(id, "comment not found");
    ServiceError::NotFound { id: id.to_string() }
}
