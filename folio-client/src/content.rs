//! Content access: cached reads, article publishing, profile changes.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, instrument, warn};

use folio_cache::{CacheStore, FileStorage};
use folio_core::constants::DEFAULT_AVATAR;
use folio_core::error::{FolioError, Result};
use folio_core::types::{Article, ArticleDraft, ResourceKey, Role, SessionState};
use folio_fetch::{Fetched, ResourceFetcher};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::search;
use crate::session::SessionStore;

/// A derived article listing.
#[derive(Clone, Debug)]
pub struct ArticleList {
    /// Matching articles
    pub articles: Vec<Article>,
    /// Set when the listing was built from a stale cache entry
    pub warning: Option<FolioError>,
}

/// One article with its neighbours in the list.
#[derive(Clone, Debug)]
pub struct ArticleDetail {
    /// The requested article
    pub article: Article,
    /// The article before it, if any
    pub previous: Option<Article>,
    /// The article after it, if any
    pub next: Option<Article>,
    /// Set when the list was a stale cache entry
    pub warning: Option<FolioError>,
}

/// Client facade over the backend, the resource cache and the session.
pub struct ContentClient {
    api: ApiClient,
    fetcher: ResourceFetcher,
    sessions: SessionStore,
    enable_cache: bool,
}

impl ContentClient {
    /// Creates a client. The session lives in the same storage as the cache.
    pub fn new(api: ApiClient, store: Arc<CacheStore>) -> Self {
        let sessions = SessionStore::new(Arc::clone(store.storage()));
        Self {
            api,
            fetcher: ResourceFetcher::new(store),
            sessions,
            enable_cache: true,
        }
    }

    /// Builds a client with file-backed storage from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let api = ApiClient::with_config(config)?;
        let storage = Arc::new(FileStorage::open(&config.storage_path)?);
        let store = Arc::new(CacheStore::new(storage));
        Ok(Self::new(api, store).with_cache_enabled(config.enable_cache))
    }

    /// When disabled, every read goes to the network. Stale fallback still
    /// applies.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    /// The backend client.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The resource fetcher.
    pub fn fetcher(&self) -> &ResourceFetcher {
        &self.fetcher
    }

    /// The cache store.
    pub fn store(&self) -> &Arc<CacheStore> {
        self.fetcher.store()
    }

    /// The session store.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// The current session.
    pub fn session(&self) -> SessionState {
        self.sessions.session()
    }

    fn bearer(session: &SessionState) -> Result<String> {
        session
            .bearer()
            .map(str::to_string)
            .ok_or(FolioError::Unauthenticated)
    }

    async fn resource<V>(
        &self,
        key: ResourceKey,
        bearer: Option<String>,
        force_refresh: bool,
    ) -> Result<Fetched<V>>
    where
        V: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let api = self.api.clone();
        self.fetcher
            .fetch(
                key.as_str(),
                key.ttl(),
                force_refresh || !self.enable_cache,
                move || async move {
                    api.get_resource::<V>(key.path(), key.field(), bearer.as_deref())
                        .await
                },
            )
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CACHED READS
    // ═══════════════════════════════════════════════════════════════════════

    /// The public article list.
    pub async fn articles(&self, force_refresh: bool) -> Result<Fetched<Vec<Article>>> {
        self.resource(ResourceKey::Articles, None, force_refresh).await
    }

    /// The logged-in user's avatar URL; `None` when they have not set one.
    pub async fn avatar(
        &self,
        session: &SessionState,
        force_refresh: bool,
    ) -> Result<Fetched<Option<String>>> {
        let bearer = Self::bearer(session)?;
        self.resource(ResourceKey::UserAvatar, Some(bearer), force_refresh)
            .await
    }

    /// The logged-in user's role.
    pub async fn role(&self, session: &SessionState, force_refresh: bool) -> Result<Fetched<Role>> {
        let bearer = Self::bearer(session)?;
        self.resource(ResourceKey::UserRole, Some(bearer), force_refresh)
            .await
    }

    /// One article, with the articles next to it in list order.
    pub async fn article(&self, id: &str) -> Result<ArticleDetail> {
        let listing = self.articles(false).await?;
        let index = listing
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| FolioError::NotFound(format!("article '{}'", id)))?;

        Ok(ArticleDetail {
            article: listing[index].clone(),
            previous: index.checked_sub(1).map(|i| listing[i].clone()),
            next: listing.get(index + 1).cloned(),
            warning: listing.warning().cloned(),
        })
    }

    /// Articles matching `query`, newest first.
    ///
    /// An empty query is rejected before anything is fetched.
    pub async fn search(&self, query: &str) -> Result<ArticleList> {
        search::normalize_query(query)?;
        let listing = self.articles(false).await?;
        Ok(ArticleList {
            articles: search::newest_first(search::filter(&listing, query)?),
            warning: listing.warning().cloned(),
        })
    }

    /// Articles written by `user_id`, newest first.
    pub async fn user_articles(&self, user_id: &str) -> Result<ArticleList> {
        let listing = self.articles(false).await?;
        Ok(ArticleList {
            articles: search::newest_first(search::by_user(&listing, user_id)),
            warning: listing.warning().cloned(),
        })
    }

    /// Every article, newest first.
    pub async fn all_articles_newest_first(&self) -> Result<ArticleList> {
        let listing = self.articles(false).await?;
        Ok(ArticleList {
            articles: search::newest_first(listing.to_vec()),
            warning: listing.warning().cloned(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // WRITES
    // ═══════════════════════════════════════════════════════════════════════

    /// Publishes a new article and refreshes the article list.
    #[instrument(skip_all)]
    pub async fn publish(&self, draft: ArticleDraft, session: &SessionState) -> Result<String> {
        let bearer = Self::bearer(session)?;
        let mut draft = draft.validate()?;
        if draft.user_id.is_none() {
            draft.user_id = session.user_id.clone();
        }

        let id = self.api.create_article(&draft, &bearer).await?;
        info!(%id, "Article published");

        self.refresh_articles().await;
        Ok(id)
    }

    /// Replaces article `id` and refreshes the article list.
    ///
    /// A draft without an image keeps the current one. When the image is
    /// replaced, the old one is deleted from the image store.
    #[instrument(skip(self, draft, session))]
    pub async fn update(&self, id: &str, draft: ArticleDraft, session: &SessionState) -> Result<()> {
        let bearer = Self::bearer(session)?;
        let mut draft = draft.validate()?;
        if draft.user_id.is_none() {
            draft.user_id = session.user_id.clone();
        }

        let current_image = match self.articles(true).await {
            Ok(listing) => listing
                .iter()
                .find(|a| a.id == id)
                .and_then(|a| a.image_url.clone()),
            Err(e) => {
                warn!(error = %e, "Could not load current article");
                None
            }
        }
        .filter(|url| !url.is_empty());

        if draft.image_url.is_empty() {
            if let Some(url) = &current_image {
                draft.image_url = url.clone();
            }
        }

        self.api.update_article(id, &draft, &bearer).await?;
        info!("Article updated");

        if let Some(old) = current_image.filter(|old| *old != draft.image_url) {
            self.discard_image(&old, &bearer).await;
        }

        self.refresh_articles().await;
        Ok(())
    }

    /// Uploads an image for use in an article or as an avatar.
    pub async fn upload_image(
        &self,
        data: Vec<u8>,
        file_name: &str,
        session: &SessionState,
    ) -> Result<String> {
        let bearer = Self::bearer(session)?;
        self.api.upload_image(data, file_name, &bearer).await
    }

    /// Points the user's avatar at `avatar_url` and drops the cached one.
    ///
    /// The previous uploaded avatar, if any, is deleted from the image store.
    #[instrument(skip(self, session))]
    pub async fn change_avatar(&self, avatar_url: &str, session: &SessionState) -> Result<()> {
        let bearer = Self::bearer(session)?;
        let previous = self
            .store()
            .get::<Option<String>>(ResourceKey::UserAvatar.as_str())
            .and_then(|entry| entry.value);

        self.api.update_avatar(avatar_url, &bearer).await?;
        self.fetcher.invalidate(ResourceKey::UserAvatar.as_str());
        info!("Avatar changed");

        if let Some(old) = previous.filter(|old| old != avatar_url && old != DEFAULT_AVATAR) {
            self.discard_image(&old, &bearer).await;
        }
        Ok(())
    }

    async fn discard_image(&self, url: &str, bearer: &str) {
        if let Err(e) = self.api.delete_image(url, bearer).await {
            warn!(url, error = %e, "Failed to delete replaced image");
        }
    }

    async fn refresh_articles(&self) {
        let key = ResourceKey::Articles.as_str();
        match self.articles(true).await {
            Ok(listing) if !listing.is_stale() => {}
            Ok(listing) => {
                warn!(error = ?listing.warning(), "Article list refresh failed; dropping outdated entry");
                self.fetcher.invalidate(key);
            }
            Err(e) => {
                warn!(error = %e, "Article list refresh failed");
                self.fetcher.invalidate(key);
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SESSION
    // ═══════════════════════════════════════════════════════════════════════

    /// Stores a new login and forgets the previous user's profile data.
    pub fn login(&self, user_id: &str, token: &str) -> Result<SessionState> {
        let session = self.sessions.establish(user_id, token)?;
        self.invalidate_profile();
        Ok(session)
    }

    /// Clears the session and the cached profile data.
    pub fn logout(&self) -> Result<()> {
        self.sessions.clear()?;
        self.invalidate_profile();
        Ok(())
    }

    fn invalidate_profile(&self) {
        for key in ResourceKey::PROFILE {
            self.fetcher.invalidate(key.as_str());
        }
    }
}
