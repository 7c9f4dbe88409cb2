//! # Folio Client
//!
//! Access to the content platform backend.
//!
//! - [`ApiClient`]: the REST endpoints
//! - [`ContentClient`]: cached, de-duplicated reads of articles and profile
//!   data, plus publishing and profile changes
//! - [`SessionStore`]: persisted login state
//! - [`HeaderPresenter`]: login-state view with subscribable updates
//! - [`ChatHistory`]: assistant transcript with backend mirroring
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio_client::{ClientConfig, ContentClient};
//!
//! let client = ContentClient::from_config(&ClientConfig::from_env())?;
//! for article in client.all_articles_newest_first().await?.articles {
//!     println!("{} {}", article.formatted_date(), article.title);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod api;
mod chat;
mod config;
mod content;
mod header;
pub mod search;
mod session;

pub use api::ApiClient;
pub use chat::ChatHistory;
pub use config::{ClientConfig, Environment};
pub use content::{ArticleDetail, ArticleList, ContentClient};
pub use header::{HeaderPresenter, HeaderView, Subscription};
pub use session::SessionStore;
