//! Dual-path request authentication.
//!
//! Every request, REST or streaming, passes through [`Authenticator::authorize`]:
//! user-context requests get an OAuth 1.0a signature over the linked
//! account's token pair; app-only requests get a bearer token, exchanged
//! lazily from the app key/secret the first time one is needed.

use std::sync::Arc;

use reqwest::Method;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::credentials::CredentialStore;
use crate::error::{AuthError, Error, Result};
use crate::oauth;
use crate::request::{AuthRequirement, RequestDescriptor, SignedRequest};
use crate::transport::Transport;

/// Signs request descriptors against the credential store.
///
/// Holds the store itself; the `App` and its stream sessions share one
/// authenticator, so sessions never need a reference back to the `App`.
pub struct Authenticator {
    store: CredentialStore,
    transport: Arc<dyn Transport>,
    token_url: String,
    /// Serializes bearer token exchanges so concurrent signers that both
    /// observe an empty cache perform at most one exchange.
    exchange_gate: Mutex<()>,
}

impl Authenticator {
    /// Create an authenticator over a credential store.
    #[must_use]
    pub fn new(store: CredentialStore, transport: Arc<dyn Transport>, token_url: String) -> Self {
        Self {
            store,
            transport,
            token_url,
            exchange_gate: Mutex::new(()),
        }
    }

    /// The underlying credential store.
    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Produce an authenticated request for the descriptor.
    pub async fn authorize(&self, descriptor: &RequestDescriptor) -> Result<SignedRequest> {
        let authorization = match descriptor.auth() {
            AuthRequirement::UserContext => {
                let credentials = self.store.snapshot();
                let account = credentials
                    .account
                    .clone()
                    .ok_or(AuthError::MissingAccountToken)?;

                oauth::user_context_header(
                    &credentials,
                    &account,
                    descriptor.method().as_str(),
                    descriptor.url(),
                    descriptor.params(),
                )?
            }
            AuthRequirement::AppOnly => {
                let token = self.bearer_token().await?;
                oauth::bearer_header(&token)
            }
        };

        Ok(SignedRequest {
            method: descriptor.method().clone(),
            url: descriptor.url().to_string(),
            params: descriptor.params().to_vec(),
            authorization,
        })
    }

    /// The cached bearer token, exchanging app credentials for one if the
    /// cache is empty.
    pub async fn bearer_token(&self) -> Result<String> {
        if let Some(token) = self.store.bearer_token() {
            return Ok(token);
        }

        let _gate = self.exchange_gate.lock().await;

        // Another signer may have filled the cache while we waited.
        if let Some(token) = self.store.bearer_token() {
            debug!("bearer token filled while waiting for exchange gate");
            return Ok(token);
        }

        let snapshot = self.store.snapshot();
        info!("exchanging app credentials for a bearer token");

        let request = SignedRequest {
            method: Method::POST,
            url: self.token_url.clone(),
            params: vec![("grant_type".into(), "client_credentials".into())],
            authorization: oauth::app_only_exchange_header(
                &snapshot.app_key,
                &snapshot.app_secret,
            ),
        };

        let response = self.transport.send(request).await.map_err(Error::Transport)?;

        if !(200..300).contains(&response.status) {
            return Err(AuthError::TokenExchangeFailed {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            }
            .into());
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let token: TokenResponse = serde_json::from_slice(&response.body)?;
        self.store.set_bearer_token(Some(token.access_token.clone()));

        Ok(token.access_token)
    }
}
