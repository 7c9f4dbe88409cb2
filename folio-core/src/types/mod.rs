//! Domain types for Folio.
//!
//! - [`ResourceKey`]: logical name of a cached remote resource
//! - [`Article`] / [`ArticleDraft`]: published and to-be-published articles
//! - [`Role`]: the current user's role
//! - [`SessionState`]: who is logged in, derived from stored credentials
//! - [`ChatMessage`]: one line of the chat transcript

mod article;
mod chat;
mod resource;
mod session;

pub use article::*;
pub use chat::*;
pub use resource::*;
pub use session::*;
