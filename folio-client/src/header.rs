//! Login-state presentation for page headers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, warn};

use folio_core::constants::DEFAULT_AVATAR;
use folio_core::types::{Role, SessionState};

use crate::content::ContentClient;

/// What the header shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderView {
    /// Login link only
    LoggedOut,
    /// User menu with avatar
    LoggedIn {
        /// Logged-in user
        user_id: String,
        /// Avatar to display
        avatar_url: String,
        /// Role, deciding whether the admin link is shown
        role: Role,
    },
}

impl HeaderView {
    /// Whether the login link is shown.
    pub fn show_login_link(&self) -> bool {
        matches!(self, HeaderView::LoggedOut)
    }

    /// Whether the admin console link is shown.
    pub fn show_admin_link(&self) -> bool {
        matches!(self, HeaderView::LoggedIn { role, .. } if role.is_admin())
    }
}

type Listener = Arc<dyn Fn(&HeaderView) + Send + Sync>;
type Listeners = Mutex<Vec<(u64, Listener)>>;

/// Builds [`HeaderView`]s and pushes them to subscribers.
#[derive(Default)]
pub struct HeaderPresenter {
    listeners: Arc<Listeners>,
    next_id: AtomicU64,
}

impl HeaderPresenter {
    /// Creates a presenter with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for every rendered view until the returned
    /// [`Subscription`] is disposed or dropped.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&HeaderView) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(handler)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Builds the view for `session` and notifies subscribers.
    ///
    /// Avatar and role are fetched concurrently through the cache. If either
    /// cannot be obtained the header still renders, with the default avatar
    /// or the plain user role.
    pub async fn render(&self, session: &SessionState, content: &ContentClient) -> HeaderView {
        let view = match session.user_id.as_deref() {
            Some(user_id) if session.is_logged_in() => {
                let (avatar, role) = futures::join!(
                    content.avatar(session, false),
                    content.role(session, false)
                );

                let avatar_url = match avatar {
                    Ok(fetched) => fetched
                        .as_deref()
                        .filter(|url| !url.is_empty())
                        .unwrap_or(DEFAULT_AVATAR)
                        .to_string(),
                    Err(e) => {
                        warn!(error = %e, "Avatar unavailable, using default");
                        DEFAULT_AVATAR.to_string()
                    }
                };
                let role = match role {
                    Ok(fetched) => *fetched,
                    Err(e) => {
                        warn!(error = %e, "Role unavailable, assuming user");
                        Role::User
                    }
                };

                HeaderView::LoggedIn {
                    user_id: user_id.to_string(),
                    avatar_url,
                    role,
                }
            }
            _ => HeaderView::LoggedOut,
        };

        self.notify(&view);
        view
    }

    fn notify(&self, view: &HeaderView) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        debug!(count = listeners.len(), "Notifying header subscribers");
        for listener in listeners {
            listener(view);
        }
    }
}

/// Keeps a header handler registered. Dropping it unregisters the handler.
#[must_use = "dropping a Subscription unregisters its handler"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    /// Unregisters the handler now.
    pub fn dispose(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use folio_cache::{CacheStore, MemoryStorage};
    use folio_core::traits::ManualClock;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::api::ApiClient;
    use crate::config::ClientConfig;

    fn content(server: &MockServer) -> ContentClient {
        let clock = Arc::new(ManualClock::default());
        let store = CacheStore::with_clock(Arc::new(MemoryStorage::new()), clock);
        let api = ApiClient::with_config(&ClientConfig::default().with_base_url(server.uri())).unwrap();
        ContentClient::new(api, Arc::new(store))
    }

    #[tokio::test]
    async fn test_logged_out_makes_no_requests() {
        let server = MockServer::start().await;
        let presenter = HeaderPresenter::new();

        let view = presenter.render(&SessionState::anonymous(), &content(&server)).await;
        assert_eq!(view, HeaderView::LoggedOut);
        assert!(view.show_login_link());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_view() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/avatar"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "avatar": "https://cdn/me.png" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/user/role"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "role": "admin" })))
            .mount(&server)
            .await;

        let view = HeaderPresenter::new()
            .render(&SessionState::new("u1", "tok"), &content(&server))
            .await;
        assert_eq!(
            view,
            HeaderView::LoggedIn {
                user_id: "u1".into(),
                avatar_url: "https://cdn/me.png".into(),
                role: Role::Admin,
            }
        );
        assert!(view.show_admin_link());
    }

    #[tokio::test]
    async fn test_metadata_failure_degrades_to_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let view = HeaderPresenter::new()
            .render(&SessionState::new("u1", "tok"), &content(&server))
            .await;
        assert_eq!(
            view,
            HeaderView::LoggedIn {
                user_id: "u1".into(),
                avatar_url: DEFAULT_AVATAR.into(),
                role: Role::User,
            }
        );
        assert!(!view.show_admin_link());
    }

    #[tokio::test]
    async fn test_subscription_lifecycle() {
        let server = MockServer::start().await;
        let content = content(&server);
        let presenter = HeaderPresenter::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&seen);
        let first = presenter.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&seen);
        let second = presenter.subscribe(move |_| {
            counter.fetch_add(10, Ordering::SeqCst);
        });
        assert_eq!(presenter.subscriber_count(), 2);

        presenter.render(&SessionState::anonymous(), &content).await;
        assert_eq!(seen.load(Ordering::SeqCst), 11);

        first.dispose();
        presenter.render(&SessionState::anonymous(), &content).await;
        assert_eq!(seen.load(Ordering::SeqCst), 21);

        drop(second);
        assert_eq!(presenter.subscriber_count(), 0);
        presenter.render(&SessionState::anonymous(), &content).await;
        assert_eq!(seen.load(Ordering::SeqCst), 21);
    }

    #[test]
    fn test_subscription_outliving_presenter() {
        let presenter = HeaderPresenter::new();
        let subscription = presenter.subscribe(|_| {});
        drop(presenter);
        drop(subscription);
    }
}
