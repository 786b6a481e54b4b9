//! Client-side view of the live collection.
//!
//! The projection follows a snapshot stream, replacing its whole view on
//! every snapshot and deriving `is_mine` against the token it was built
//! with. Edit drafts live only here.

use crate::error::ServiceError;
use crate::models::PublicComment;
use crate::service::CommentService;
use crate::store::Event;

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionState {
    Idle,
    Loading,
    Live,
    Error(String),
}

/// Unsaved edit of one comment.
#[derive(Debug, Clone, PartialEq)]
pub struct EditDraft {
    pub comment_id: String,
    pub name: String,
    pub text: String,
}

pub struct Projection {
    token: Option<String>,
    state: ProjectionState,
    comments: Vec<PublicComment>,
    draft: Option<EditDraft>,
}

impl Projection {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token,
            state: ProjectionState::Idle,
            comments: Vec::new(),
            draft: None,
        }
    }

    pub fn state(&self) -> &ProjectionState {
        &self.state
    }

    pub fn comments(&self) -> &[PublicComment] {
        &self.comments
    }

    pub fn draft(&self) -> Option<&EditDraft> {
        self.draft.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Marks the subscription as opened and waiting for its first snapshot.
    pub fn begin_loading(&mut self) {
        if self.state == ProjectionState::Idle {
            self.state = ProjectionState::Loading;
        }
    }

    /// Consumes one feed event.
    ///
    /// A snapshot replaces the view wholesale and puts the projection in
    /// `Live`; a fault moves it to `Error` but keeps the last view.
    pub fn apply(&mut self, event: Event) {
        match event {
            Ok(snapshot) => {
                let viewer = self.token.as_deref();
                self.comments = snapshot.iter().map(|c| c.shape(viewer)).collect();
                self.state = ProjectionState::Live;

                let still_there = self
                    .draft
                    .as_ref()
                    .is_none_or(|d| self.comments.iter().any(|c| c.id == d.comment_id));
                if !still_there {
                    tracing::debug!("comment under edit disappeared, dropping draft");
                    self.draft = None;
                }
            }
            Err(fault) => self.fail(fault.to_string()),
        }
    }

    pub fn fail(&mut self, reason: String) {
        tracing::warn!(%reason, "realtime projection failed");
        self.state = ProjectionState::Error(reason);
    }

    /// Starts editing one of the viewer's own comments, discarding any
    /// draft for another comment. Returns `false` if the comment is not in
    /// view or is not the viewer's.
    pub fn start_edit(&mut self, id: &str) -> bool {
        let Some(comment) = self.comments.iter().find(|c| c.id == id && c.is_mine) else {
            return false;
        };
        self.draft = Some(EditDraft {
            comment_id: comment.id.clone(),
            name: comment.name.clone(),
            text: comment.text.clone(),
        });
        true
    }

    pub fn set_draft_name(&mut self, name: impl Into<String>) {
        if let Some(draft) = &mut self.draft {
            draft.name = name.into();
        }
    }

    pub fn set_draft_text(&mut self, text: impl Into<String>) {
        if let Some(draft) = &mut self.draft {
            draft.text = text.into();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.draft = None;
    }

    /// Sends the current draft through `service`. The draft is kept on
    /// failure so the visitor can fix it, and cleared on success. Returns
    /// `Ok(None)` when nothing is being edited.
    pub fn save_edit(
        &mut self,
        service: &CommentService,
    ) -> Result<Option<PublicComment>, ServiceError> {
        let Some(draft) = &self.draft else {
            return Ok(None);
        };
        let updated = service.update(
            self.token.as_deref(),
            &draft.comment_id,
            &draft.name,
            &draft.text,
        )?;
        self.draft = None;
        Ok(Some(updated))
    }

    /// Deletes a comment through `service`, dropping its draft if open.
    pub fn delete(&mut self, service: &CommentService, id: &str) -> Result<(), ServiceError> {
        service.delete(self.token.as_deref(), id)?;
        if self.draft.as_ref().is_some_and(|d| d.comment_id == id) {
            self.draft = None;
        }
        Ok(())
    }

    /// Drives the projection from `feed`, calling `on_change` after every
    /// event until the feed ends or `on_change` returns `false`.
    pub fn follow<I, F>(&mut self, feed: I, mut on_change: F)
    where
        I: IntoIterator<Item = Event>,
        F: FnMut(&Projection) -> bool,
    {
        self.begin_loading();
        for event in feed {
            self.apply(event);
            if !on_change(self) {
                return;
            }
        }
        self.fail("subscription closed".to_string());
        on_change(self);
    }
}
