use crate::models::Comment;

/// Owner value stamped on rows copied by `migrate`. Such rows are frozen.
pub const LEGACY_OWNER: &str = "migration";

/// Decides whether `requester` may edit or delete `comment`.
///
/// Only an exact match against a real recorded owner passes. Missing or
/// empty tokens on either side, and rows owned by [`LEGACY_OWNER`], are
/// always rejected.
pub fn can_mutate(requester: Option<&str>, comment: &Comment) -> bool {
    let Some(requester) = requester.filter(|t| !t.is_empty()) else {
        return false;
    };

    match comment.owner_token.as_deref() {
        None | Some("") | Some(LEGACY_OWNER) => false,
        Some(owner) => owner == requester,
    }
}
