//! Credential storage shared between the REST facade and stream sessions.

use parking_lot::RwLock;

use crate::account::Account;

/// A point-in-time snapshot of the credential set.
///
/// Signing always works from a snapshot so a request never observes a
/// half-updated key/secret pair.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Application (consumer) key.
    pub app_key: String,

    /// Application (consumer) secret.
    pub app_secret: String,

    /// Linked account, if any. Required for user-context requests.
    pub account: Option<Account>,

    /// Cached app-only bearer token, if one has been obtained or set.
    pub bearer_token: Option<String>,
}

/// Mutable credential store owned by one `App`.
///
/// Mutations happen only through the setters here; changing the app key or
/// secret invalidates the cached bearer token since it was minted for the
/// old pair.
#[derive(Debug, Default)]
pub struct CredentialStore {
    inner: RwLock<Credentials>,
}

impl CredentialStore {
    /// Create a store holding an app key/secret pair.
    #[must_use]
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(Credentials {
                app_key: app_key.into(),
                app_secret: app_secret.into(),
                account: None,
                bearer_token: None,
            }),
        }
    }

    /// Take a consistent snapshot of the full credential set.
    #[must_use]
    pub fn snapshot(&self) -> Credentials {
        self.inner.read().clone()
    }

    /// Application key.
    #[must_use]
    pub fn app_key(&self) -> String {
        self.inner.read().app_key.clone()
    }

    /// Application secret.
    #[must_use]
    pub fn app_secret(&self) -> String {
        self.inner.read().app_secret.clone()
    }

    /// Replace the application key, invalidating the cached bearer token.
    pub fn set_app_key(&self, app_key: impl Into<String>) {
        let mut inner = self.inner.write();
        inner.app_key = app_key.into();
        inner.bearer_token = None;
    }

    /// Replace the application secret, invalidating the cached bearer token.
    pub fn set_app_secret(&self, app_secret: impl Into<String>) {
        let mut inner = self.inner.write();
        inner.app_secret = app_secret.into();
        inner.bearer_token = None;
    }

    /// The linked account, if any.
    #[must_use]
    pub fn account(&self) -> Option<Account> {
        self.inner.read().account.clone()
    }

    /// Link an account, replacing any previous one atomically.
    pub fn set_account(&self, account: Account) {
        self.inner.write().account = Some(account);
    }

    /// Unlink the current account.
    pub fn clear_account(&self) {
        self.inner.write().account = None;
    }

    /// The cached bearer token, if any.
    #[must_use]
    pub fn bearer_token(&self) -> Option<String> {
        self.inner.read().bearer_token.clone()
    }

    /// Set or clear the cached bearer token.
    pub fn set_bearer_token(&self, token: Option<String>) {
        self.inner.write().bearer_token = token;
    }
}
