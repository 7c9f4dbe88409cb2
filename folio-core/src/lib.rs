//! # Folio Core
//!
//! Core types, errors, and traits for the Folio content client.
//!
//! This crate provides the foundational building blocks used by all other Folio crates:
//!
//! - **Types**: articles, resource keys, session state, roles, chat messages
//! - **Errors**: one cloneable error enum covering storage, network and validation
//! - **Constants**: expiry durations, storage keys, endpoint defaults
//! - **Traits**: injectable `Storage` and `Clock`
//!
//! ## Example
//!
//! ```rust
//! use folio_core::{ResourceKey, SessionState};
//!
//! assert_eq!(ResourceKey::Articles.as_str(), "articles");
//! assert!(!SessionState::anonymous().is_logged_in());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{FolioError, Result};
pub use traits::*;
pub use types::*;
