//! Session and role types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Who is logged in.
///
/// Never stored as such: it is derived from the stored user id and bearer
/// token each time a handler asks for it, and passed explicitly to whatever
/// needs it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Current user, as reported by the identity provider
    pub user_id: Option<String>,
    /// Bearer credential for authenticated endpoints
    pub token: Option<String>,
}

impl SessionState {
    /// A session with nobody logged in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session for `user_id` holding `token`.
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            token: Some(token.into()),
        }
    }

    /// True when both a user and a non-empty token are present.
    pub fn is_logged_in(&self) -> bool {
        self.user_id.is_some() && self.bearer().is_some()
    }

    /// The bearer token, if one is usable.
    pub fn bearer(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Role of the logged-in user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can reach the admin console
    Admin,
    /// Regular member
    #[default]
    User,
    /// Any role string this client does not know about
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Whether this role may manage users and roles.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Unknown => "unknown",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_session() {
        let session = SessionState::anonymous();
        assert!(!session.is_logged_in());
        assert!(session.bearer().is_none());
    }

    #[test]
    fn test_blank_token_is_not_a_session() {
        let session = SessionState::new("u1", "   ");
        assert!(!session.is_logged_in());
    }

    #[test]
    fn test_logged_in_session() {
        let session = SessionState::new("u1", "tok");
        assert!(session.is_logged_in());
        assert_eq!(session.bearer(), Some("tok"));
    }

    #[test]
    fn test_role_parsing() {
        let admin: Role = serde_json::from_str("\"admin\"").unwrap();
        assert!(admin.is_admin());
        let editor: Role = serde_json::from_str("\"editor\"").unwrap();
        assert_eq!(editor, Role::Unknown);
        assert_eq!(Role::User.to_string(), "user");
    }
}
