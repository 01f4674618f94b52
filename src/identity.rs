//! Lookups against the external identity provider.
//!
//! Users live outside this service. Posts and comments only store the
//! provider's user id, and the public profile is resolved per request.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};

use crate::{
    error::{AppError, Result},
    models::{Author, UserRecord},
};

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>>;

    /// Batched lookup. The provider returns at most `limit` records.
    async fn get_user_list(&self, user_ids: &[String], limit: usize) -> Result<Vec<UserRecord>>;
}

pub fn filter_user_for_client(user: UserRecord) -> Author {
    Author::from(user)
}

/// Resolves every distinct author id in one batched call.
///
/// Ids beyond `limit` are not fetched; callers fail on the missing authors
/// through [`require_author`].
pub async fn resolve_authors(
    identity: &dyn IdentityProvider,
    author_ids: impl IntoIterator<Item = &str>,
    limit: usize,
) -> Result<HashMap<String, Author>> {
    let mut seen = HashSet::new();
    let ids: Vec<String> = author_ids
        .into_iter()
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    if ids.len() > limit {
        tracing::warn!(
            distinct_authors = ids.len(),
            limit,
            "Author lookup exceeds identity page size; some authors will not resolve"
        );
    }

    let users = identity.get_user_list(&ids, limit).await?;
    tracing::debug!("Resolved {} of {} authors", users.len(), ids.len());

    Ok(users
        .into_iter()
        .map(filter_user_for_client)
        .map(|author| (author.id.clone(), author))
        .collect())
}

/// Looks up an author that must exist and be displayable.
pub fn require_author(
    authors: &HashMap<String, Author>,
    author_id: &str,
    owner: &str,
) -> Result<Author> {
    match authors.get(author_id) {
        Some(author) if author.is_resolvable() => Ok(author.clone()),
        _ => Err(AppError::Internal(format!("Author for {} not found", owner))),
    }
}

/// Client for a Clerk-style user directory.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("threadvote/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = Url::parse(base_url).map_err(|e| {
            AppError::Internal(format!("Invalid identity provider URL {}: {}", base_url, e))
        })?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// `{base}/users`, or `{base}/users/{user_id}` with the id percent-encoded
    /// as a single path segment.
    fn users_url(&self, user_id: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Identity provider URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("users")
            .extend(user_id);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let url = self.users_url(Some(user_id))?;
        let response = self.authorize(self.client.get(url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let user = response.error_for_status()?.json::<UserRecord>().await?;
        Ok(Some(user))
    }

    async fn get_user_list(&self, user_ids: &[String], limit: usize) -> Result<Vec<UserRecord>> {
        let mut query: Vec<(&str, String)> = user_ids
            .iter()
            .map(|id| ("user_id", id.clone()))
            .collect();
        query.push(("limit", limit.to_string()));

        let url = self.users_url(None)?;
        let users = self
            .authorize(self.client.get(url).query(&query))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<UserRecord>>()
            .await?;

        Ok(users)
    }
}

/// In-memory identity provider for tests and local development.
#[derive(Default)]
pub struct MockIdentityProvider {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let provider = Self::new();
        for user in users {
            provider.register(user);
        }
        provider
    }

    pub fn register(&self, user: UserRecord) {
        self.users
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(user.id.clone(), user);
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let users = self
            .users
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(users.get(user_id).cloned())
    }

    async fn get_user_list(&self, user_ids: &[String], limit: usize) -> Result<Vec<UserRecord>> {
        let users = self
            .users
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(user_ids
            .iter()
            .filter_map(|id| users.get(id).cloned())
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, username: Option<&str>, first_name: Option<&str>) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            username: username.map(str::to_string),
            image_url: format!("https://img.example/{}.png", id),
            first_name: first_name.map(str::to_string),
            last_name: None,
        }
    }

    #[tokio::test]
    async fn resolves_distinct_ids_once() {
        let identity = MockIdentityProvider::with_users([
            user("user_a", Some("alice"), None),
            user("user_b", None, Some("Bob")),
        ]);

        let authors = resolve_authors(&identity, ["user_a", "user_b", "user_a"], 100)
            .await
            .unwrap();

        assert_eq!(authors.len(), 2);
        assert_eq!(authors["user_b"].first_name.as_deref(), Some("Bob"));
    }

    #[tokio::test]
    async fn empty_input_skips_lookup() {
        let identity = MockIdentityProvider::new();
        let authors = resolve_authors(&identity, std::iter::empty(), 100)
            .await
            .unwrap();
        assert!(authors.is_empty());
    }

    #[tokio::test]
    async fn page_limit_truncates_lookup() {
        let identity = MockIdentityProvider::with_users([
            user("user_a", Some("alice"), None),
            user("user_b", Some("bob"), None),
            user("user_c", Some("carol"), None),
        ]);

        let authors = resolve_authors(&identity, ["user_a", "user_b", "user_c"], 2)
            .await
            .unwrap();

        assert_eq!(authors.len(), 2);
        let err = require_author(&authors, "user_c", "comment").unwrap_err();
        assert!(matches!(err, AppError::Internal(ref m) if m == "Author for comment not found"));
    }

    #[test]
    fn nameless_author_is_rejected() {
        let mut authors = HashMap::new();
        authors.insert(
            "user_x".to_string(),
            filter_user_for_client(user("user_x", None, None)),
        );

        assert!(matches!(
            require_author(&authors, "user_x", "post"),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn user_id_is_encoded_as_one_path_segment() {
        let provider = HttpIdentityProvider::new("https://api.clerk.com/v1/", None).unwrap();

        assert_eq!(
            provider.users_url(None).unwrap().as_str(),
            "https://api.clerk.com/v1/users"
        );
        assert_eq!(
            provider.users_url(Some("user_2abc")).unwrap().as_str(),
            "https://api.clerk.com/v1/users/user_2abc"
        );
        assert_eq!(
            provider.users_url(Some("a/b?c#d")).unwrap().as_str(),
            "https://api.clerk.com/v1/users/a%2Fb%3Fc%23d"
        );
    }

    #[test]
    fn malformed_base_url_is_rejected() {
        assert!(matches!(
            HttpIdentityProvider::new("not a url", None),
            Err(AppError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn mock_get_user_returns_none_for_unknown() {
        let identity = MockIdentityProvider::with_users([user("user_a", Some("alice"), None)]);
        assert!(identity.get_user("user_a").await.unwrap().is_some());
        assert!(identity.get_user("user_z").await.unwrap().is_none());
    }
}
