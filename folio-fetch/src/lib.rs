//! # Folio Fetch
//!
//! Cached, de-duplicated access to remote resources.
//!
//! - [`InFlight`]: at most one outstanding request per key; concurrent
//!   callers share its outcome
//! - [`ResourceFetcher`]: "get-or-refresh" over a [`folio_cache::CacheStore`],
//!   with stale fallback when a refresh fails
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio_fetch::ResourceFetcher;
//!
//! let fetcher = ResourceFetcher::new(store);
//! let articles = fetcher
//!     .fetch("articles", ARTICLES_TTL, false, || api.get_articles())
//!     .await?;
//! if let Some(err) = articles.warning() {
//!     eprintln!("showing cached articles: {err}");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod fetcher;
mod inflight;

pub use fetcher::{FetchSource, Fetched, ResourceFetcher};
pub use inflight::InFlight;
