use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// What any viewer may see of a comment. There is no owner
/// field here; `is_mine` is computed per viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicComment {
    pub id: String,
    pub name: String,
    pub text: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    pub edited: bool,
    pub is_mine: bool,
}
