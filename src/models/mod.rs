mod comment;
mod public;

pub use comment::{Comment, CommentPatch};
pub use public::PublicComment;
