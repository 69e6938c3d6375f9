//! Streaming-first client for the Twitter v1.1-era API.
//!
//! The crate centers on two things:
//!
//! - **Stream sessions**: three persistent connections (full user
//!   activity, filtered public, sampled public) that deliver
//!   newline-delimited JSON messages to registered consumers, with
//!   keep-alive detection and automatic reconnect backoff.
//! - **Dual authentication**: every request, REST or streaming, is either
//!   signed with OAuth 1.0a against a linked account or sent app-only
//!   with a bearer token exchanged lazily from the app key/secret.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use tweetline::{Account, App, FilterQuery};
//!
//! let app = App::new("app-key", "app-secret")?;
//! app.set_account(Account::new(1, "me", "token", "token-secret"));
//!
//! // REST
//! let me = app.verify_credentials(&Default::default()).await?;
//!
//! // Streaming
//! app.set_filter(FilterQuery {
//!     track: vec!["rustlang".into()],
//!     ..Default::default()
//! })?;
//! app.filtered_stream().register(
//!     |message| message.is_tweet(),
//!     |message| println!("{}", message.value()),
//! );
//! app.filtered_stream().start().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod account;
mod app;
mod auth;
mod config;
mod credentials;
mod error;
mod oauth;
mod request;
mod stream;
mod transport;
mod types;

pub use account::Account;
pub use app::App;
pub use auth::Authenticator;
pub use config::{BackoffClass, BackoffConfig, ClientConfig, StreamConfig};
pub use credentials::{CredentialStore, Credentials};
pub use error::{
    ApiError, ApiErrorCode, AuthError, Error, Result, StreamError, TransportError,
};
pub use request::{AuthRequirement, RequestDescriptor, SignedRequest};
pub use stream::{SessionState, StreamEndpoint, StreamSession};
pub use transport::{BoundedResponse, ByteSource, HttpTransport, StreamingResponse, Transport};
pub use types::{
    ApiResponse, BlockedUsersQuery, CollectionEntriesQuery, FavoritesQuery, FilterQuery,
    FindCollectionsQuery, StreamMessage, Tweet, User, VerifyCredentialsQuery,
};
