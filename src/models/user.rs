use serde::{Deserialize, Serialize};

/// A user as the identity provider returns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub username: Option<String>,
    #[serde(default)]
    pub image_url: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Public profile attached to posts and comments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub username: Option<String>,
    pub image_url: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Author {
    /// An author needs a username or a first name to be shown at all.
    pub fn is_resolvable(&self) -> bool {
        has_text(&self.username) || has_text(&self.first_name)
    }

}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl From<UserRecord> for Author {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
            image_url: user.image_url,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}
