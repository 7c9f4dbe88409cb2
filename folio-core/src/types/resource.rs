//! Logical names for the remote resources the client caches.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{ARTICLES_TTL, PROFILE_TTL};

/// A cached remote resource.
///
/// Each key maps to a fixed expiry and to one instance of the generic
/// `GET <path>` → `{ <field>: ... }` endpoint contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKey {
    /// The public article list.
    Articles,
    /// The logged-in user's avatar URL.
    UserAvatar,
    /// The logged-in user's role.
    UserRole,
}

impl ResourceKey {
    /// Every resource key.
    pub const ALL: [ResourceKey; 3] = [
        ResourceKey::Articles,
        ResourceKey::UserAvatar,
        ResourceKey::UserRole,
    ];

    /// Keys holding per-user metadata, erased on logout.
    pub const PROFILE: [ResourceKey; 2] = [ResourceKey::UserAvatar, ResourceKey::UserRole];

    /// Name used as the cache key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKey::Articles => "articles",
            ResourceKey::UserAvatar => "user_avatar",
            ResourceKey::UserRole => "user_role",
        }
    }

    /// How long a fetched value stays fresh.
    pub fn ttl(&self) -> Duration {
        match self {
            ResourceKey::Articles => ARTICLES_TTL,
            ResourceKey::UserAvatar | ResourceKey::UserRole => PROFILE_TTL,
        }
    }

    /// Endpoint path relative to the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKey::Articles => "/api/articles",
            ResourceKey::UserAvatar => "/api/user/avatar",
            ResourceKey::UserRole => "/api/user/role",
        }
    }

    /// Field of the success body that carries the resource.
    pub fn field(&self) -> &'static str {
        match self {
            ResourceKey::Articles => "articles",
            ResourceKey::UserAvatar => "avatar",
            ResourceKey::UserRole => "role",
        }
    }

    /// Whether the request must carry a bearer credential.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, ResourceKey::Articles)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
