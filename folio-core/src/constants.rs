//! Client constants for Folio.
//!
//! Expiry durations are fixed at build time. They are deliberately not part
//! of `ClientConfig`.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE EXPIRY
// ═══════════════════════════════════════════════════════════════════════════════

/// How long the public article list stays fresh.
pub const ARTICLES_TTL: Duration = Duration::from_secs(60 * 60);

/// How long profile metadata (avatar, role) stays fresh.
pub const PROFILE_TTL: Duration = Duration::from_secs(30 * 60);

/// Prefix for cache records in the backing storage.
/// Keeps cache records apart from session and chat keys so `clear()` can
/// remove them without touching anything else.
pub const CACHE_KEY_PREFIX: &str = "cache:";

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE KEYS
// ═══════════════════════════════════════════════════════════════════════════════

/// Storage key holding the bearer token of the current session.
pub const TOKEN_KEY: &str = "idToken";

/// Storage key holding the current user's id.
pub const USER_ID_KEY: &str = "userId";

/// Storage key holding the local chat transcript.
pub const CHAT_HISTORY_KEY: &str = "chat_history";

// ═══════════════════════════════════════════════════════════════════════════════
// PRESENTATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Number of most recent chat messages sent along as context.
pub const MAX_CONTEXT_MESSAGES: usize = 8;

/// Maximum characters of article preview shown in result lists.
pub const PREVIEW_MAX_CHARS: usize = 100;

/// Maximum characters of a title shown on previous/next links.
pub const TITLE_MAX_CHARS: usize = 15;

/// Placeholder image for articles without one.
pub const DEFAULT_ARTICLE_IMAGE: &str = "images/pexels-aryane-vilarim-2869078-1.png";

/// Placeholder avatar for users without one.
pub const DEFAULT_AVATAR: &str = "images/default-avatar.png";

// ═══════════════════════════════════════════════════════════════════════════════
// ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Backend used when running against a local development server.
pub const DEVELOPMENT_API_BASE_URL: &str = "http://127.0.0.1:8000";

/// Production backend.
pub const PRODUCTION_API_BASE_URL: &str = "https://api.ausexticity.com";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_expires_before_articles() {
        assert!(PROFILE_TTL < ARTICLES_TTL);
        assert_eq!(ARTICLES_TTL.as_millis(), 3_600_000);
        assert_eq!(PROFILE_TTL.as_millis(), 1_800_000);
    }
}
