//! Linked account identity.

use serde::{Deserialize, Serialize};

/// A user account linked to an [`App`](crate::App) for user-context requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Numeric user id.
    pub id: i64,

    /// Screen name, without the leading `@`.
    pub screen_name: String,

    /// OAuth access token for this account.
    pub token: String,

    /// OAuth access token secret for this account.
    pub token_secret: String,
}

impl Account {
    /// Create an account from its id, screen name, and access token pair.
    #[must_use]
    pub fn new(
        id: i64,
        screen_name: impl Into<String>,
        token: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Self {
        Self {
            id,
            screen_name: screen_name.into(),
            token: token.into(),
            token_secret: token_secret.into(),
        }
    }
}
