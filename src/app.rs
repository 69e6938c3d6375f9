//! The application facade: credential surface, REST calls, and the three
//! built-in stream sessions.

use std::sync::Arc;

use reqwest::Method;
use serde::Deserialize;
use tracing::debug;

use crate::account::Account;
use crate::auth::Authenticator;
use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{ApiError, Error, Result, StreamError};
use crate::request::{AuthRequirement, RequestDescriptor};
use crate::stream::{StreamEndpoint, StreamSession};
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    ApiResponse, BlockedUsersQuery, CollectionEntriesQuery, FavoritesQuery, FilterQuery,
    FindCollectionsQuery, Tweet, User, VerifyCredentialsQuery,
};

/// One configured API application.
///
/// Owns the credential store and three stream sessions (full user
/// activity, filtered public, sampled public). REST calls and stream
/// sessions run independently; a stalled stream never blocks a REST call.
pub struct App {
    config: ClientConfig,
    auth: Arc<Authenticator>,
    transport: Arc<dyn Transport>,
    user_stream: StreamSession,
    filtered_stream: StreamSession,
    sample_stream: StreamSession,
}

impl App {
    /// Create an app from its key/secret pair with default configuration.
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Result<Self> {
        Self::with_config(app_key, app_secret, ClientConfig::default())
    }

    /// Create an app with explicit configuration.
    pub fn with_config(
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::new(&config).map_err(Error::Transport)?);
        Ok(Self::with_transport(app_key, app_secret, config, transport))
    }

    /// Create an app over a custom transport.
    #[must_use]
    pub fn with_transport(
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let auth = Arc::new(Authenticator::new(
            CredentialStore::new(app_key, app_secret),
            transport.clone(),
            config.token_url(),
        ));

        let userstream_base = config.userstream_url.trim_end_matches('/');
        let stream_base = config.stream_url.trim_end_matches('/');

        let user_stream = StreamSession::new(
            StreamEndpoint::new(
                Method::GET,
                format!("{userstream_base}/1.1/user.json"),
                AuthRequirement::UserContext,
            ),
            auth.clone(),
            transport.clone(),
            config.stream.clone(),
        );
        let filtered_stream = StreamSession::new(
            StreamEndpoint::new(
                Method::POST,
                format!("{stream_base}/1.1/statuses/filter.json"),
                AuthRequirement::UserContext,
            ),
            auth.clone(),
            transport.clone(),
            config.stream.clone(),
        );
        let sample_stream = StreamSession::new(
            StreamEndpoint::new(
                Method::GET,
                format!("{stream_base}/1.1/statuses/sample.json"),
                AuthRequirement::UserContext,
            ),
            auth.clone(),
            transport.clone(),
            config.stream.clone(),
        );

        Self {
            config,
            auth,
            transport,
            user_stream,
            filtered_stream,
            sample_stream,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Credential surface
    // ─────────────────────────────────────────────────────────────────────

    /// Application key.
    #[must_use]
    pub fn app_key(&self) -> String {
        self.auth.store().app_key()
    }

    /// Replace the application key, invalidating any cached bearer token.
    pub fn set_app_key(&self, app_key: impl Into<String>) {
        self.auth.store().set_app_key(app_key);
    }

    /// Application secret.
    #[must_use]
    pub fn app_secret(&self) -> String {
        self.auth.store().app_secret()
    }

    /// Replace the application secret, invalidating any cached bearer token.
    pub fn set_app_secret(&self, app_secret: impl Into<String>) {
        self.auth.store().set_app_secret(app_secret);
    }

    /// The linked account, if any.
    #[must_use]
    pub fn account(&self) -> Option<Account> {
        self.auth.store().account()
    }

    /// Link an account, replacing any previous one atomically.
    pub fn set_account(&self, account: Account) {
        self.auth.store().set_account(account);
    }

    /// Unlink the current account.
    pub fn clear_account(&self) {
        self.auth.store().clear_account();
    }

    /// The cached bearer token, if one has been obtained or set.
    #[must_use]
    pub fn bearer_token(&self) -> Option<String> {
        self.auth.store().bearer_token()
    }

    /// Set or clear the cached bearer token.
    pub fn set_bearer_token(&self, token: Option<String>) {
        self.auth.store().set_bearer_token(token);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Streaming
    // ─────────────────────────────────────────────────────────────────────

    /// The full user-activity stream.
    #[must_use]
    pub fn user_stream(&self) -> &StreamSession {
        &self.user_stream
    }

    /// The filtered public stream. Set its filter with
    /// [`set_filter`](Self::set_filter) before starting.
    #[must_use]
    pub fn filtered_stream(&self) -> &StreamSession {
        &self.filtered_stream
    }

    /// The sampled public stream.
    #[must_use]
    pub fn sample_stream(&self) -> &StreamSession {
        &self.sample_stream
    }

    /// Replace the filtered stream's filter. Valid only while that session
    /// is not running.
    pub fn set_filter(&self, filter: FilterQuery) -> std::result::Result<(), StreamError> {
        self.filtered_stream.set_params(filter.into_params())
    }

    // ─────────────────────────────────────────────────────────────────────
    // REST plumbing
    // ─────────────────────────────────────────────────────────────────────

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Sign and send a descriptor, mapping non-success statuses to
    /// [`ApiError`].
    async fn send(&self, descriptor: RequestDescriptor) -> Result<ApiResponse> {
        debug!(method = %descriptor.method(), url = %descriptor.url(), "sending api request");

        let signed = self.auth.authorize(&descriptor).await?;
        let response = self.transport.send(signed).await.map_err(Error::Transport)?;

        if !(200..300).contains(&response.status) {
            return Err(ApiError::from_response(response.status, &response.body).into());
        }

        Ok(ApiResponse {
            status: response.status,
            body: response.body,
        })
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<T> {
        let response = self.send(descriptor).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // REST endpoints
    // ─────────────────────────────────────────────────────────────────────

    /// Post a status update on behalf of the linked account.
    pub async fn update_status(&self, status: impl Into<String>) -> Result<Tweet> {
        let descriptor = RequestDescriptor::post(
            self.api("/1.1/statuses/update.json"),
            AuthRequirement::UserContext,
        )
        .param("status", status.into());
        self.send_json(descriptor).await
    }

    /// The linked account's profile, verifying its credentials.
    pub async fn verify_credentials(&self, query: &VerifyCredentialsQuery) -> Result<User> {
        let descriptor = RequestDescriptor::get(
            self.api("/1.1/account/verify_credentials.json"),
            AuthRequirement::UserContext,
        )
        .opt_param("include_entities", query.include_entities)
        .opt_param("skip_status", query.skip_status)
        .opt_param("include_email", query.include_email);
        self.send_json(descriptor).await
    }

    /// The linked account's settings, as a raw response.
    pub async fn account_settings(&self) -> Result<ApiResponse> {
        let descriptor = RequestDescriptor::get(
            self.api("/1.1/account/settings.json"),
            AuthRequirement::UserContext,
        );
        self.send(descriptor).await
    }

    /// Ids of every user the linked account blocks.
    pub async fn blocked_ids(&self) -> Result<Vec<i64>> {
        #[derive(Deserialize)]
        struct IdsPage {
            ids: Vec<i64>,
        }

        let descriptor = RequestDescriptor::get(
            self.api("/1.1/blocks/ids.json"),
            AuthRequirement::UserContext,
        )
        .param("stringify_ids", "false");

        let page: IdsPage = self.send_json(descriptor).await?;
        Ok(page.ids)
    }

    /// Users the linked account blocks.
    pub async fn blocked_users(&self, query: &BlockedUsersQuery) -> Result<Vec<User>> {
        #[derive(Deserialize)]
        struct UsersPage {
            users: Vec<User>,
        }

        let descriptor = RequestDescriptor::get(
            self.api("/1.1/blocks/list.json"),
            AuthRequirement::UserContext,
        )
        .opt_param("include_entities", query.include_entities)
        .opt_param("skip_status", query.skip_status);

        let page: UsersPage = self.send_json(descriptor).await?;
        Ok(page.users)
    }

    /// Posts the target account has favorited.
    pub async fn favorites(&self, query: &FavoritesQuery) -> Result<Vec<Tweet>> {
        let descriptor = RequestDescriptor::get(
            self.api("/1.1/favorites/list.json"),
            AuthRequirement::UserContext,
        )
        .opt_param("user_id", query.user_id)
        .opt_param("screen_name", query.screen_name.clone())
        .opt_param("count", query.count)
        .opt_param("since_id", query.since_id)
        .opt_param("max_id", query.max_id)
        .opt_param("include_entities", query.include_entities);
        self.send_json(descriptor).await
    }

    /// Entries of one collection, as a raw response.
    pub async fn collection_entries(
        &self,
        id: &str,
        query: &CollectionEntriesQuery,
    ) -> Result<ApiResponse> {
        let descriptor = RequestDescriptor::get(
            self.api("/1.1/collections/entries.json"),
            AuthRequirement::UserContext,
        )
        .param("id", id)
        .opt_param("count", query.count)
        .opt_param("max_position", query.max_position)
        .opt_param("min_position", query.min_position);
        self.send(descriptor).await
    }

    /// Collections owned by or containing posts of a user, as a raw
    /// response.
    pub async fn find_collections(&self, query: &FindCollectionsQuery) -> Result<ApiResponse> {
        let descriptor = RequestDescriptor::get(
            self.api("/1.1/collections/list.json"),
            AuthRequirement::UserContext,
        )
        .opt_param("screen_name", query.screen_name.clone())
        .opt_param("user_id", query.user_id)
        .opt_param("tweet_id", query.tweet_id)
        .opt_param("count", query.count);
        self.send(descriptor).await
    }

    /// Metadata for one collection, as a raw response.
    pub async fn collection_info(&self, id: &str) -> Result<ApiResponse> {
        let descriptor = RequestDescriptor::get(
            self.api("/1.1/collections/show.json"),
            AuthRequirement::UserContext,
        )
        .param("id", id);
        self.send(descriptor).await
    }

    /// Rate limit status under app-only auth, as a raw response.
    pub async fn application_rate_limit_status(&self) -> Result<ApiResponse> {
        let descriptor = RequestDescriptor::get(
            self.api("/1.1/application/rate_limit_status.json"),
            AuthRequirement::AppOnly,
        );
        self.send(descriptor).await
    }

    /// Rate limit status for the linked account, as a raw response.
    pub async fn account_rate_limit_status(&self) -> Result<ApiResponse> {
        let descriptor = RequestDescriptor::get(
            self.api("/1.1/application/rate_limit_status.json"),
            AuthRequirement::UserContext,
        );
        self.send(descriptor).await
    }
}
