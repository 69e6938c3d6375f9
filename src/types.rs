//! API object models, query parameter sets, and stream messages.

use std::borrow::Cow;

use bytes::Bytes;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// A user object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub screen_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub followers_count: Option<u64>,
    #[serde(default)]
    pub friends_count: Option<u64>,
    #[serde(default)]
    pub statuses_count: Option<u64>,
    #[serde(default)]
    pub verified: Option<bool>,
    #[serde(default)]
    pub protected: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub in_reply_to_status_id: Option<i64>,
    #[serde(default)]
    pub in_reply_to_user_id: Option<i64>,
    #[serde(default)]
    pub favorite_count: Option<u64>,
    #[serde(default)]
    pub retweet_count: Option<u64>,
    #[serde(default)]
    pub favorited: Option<bool>,
    #[serde(default)]
    pub retweeted: Option<bool>,
    #[serde(default)]
    pub lang: Option<String>,
}

/// A raw bounded response, for calls where the caller wants full control
/// over the body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    /// The body as text.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserialize the body into a typed value.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// The body as a loose JSON value.
    pub fn value(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// One parsed JSON object from a stream connection.
///
/// Stream payloads are heterogeneous (posts, user events, control
/// messages), so the message carries the loose value plus typed accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMessage(Value);

impl StreamMessage {
    pub(crate) fn new(value: Value) -> Self {
        Self(value)
    }

    /// The underlying JSON value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Consume the message into its JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// A field of the top-level object.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether this message looks like a post.
    #[must_use]
    pub fn is_tweet(&self) -> bool {
        self.0.get("text").is_some() && self.0.get("id").is_some()
    }

    /// Interpret the message as a post.
    #[must_use]
    pub fn tweet(&self) -> Option<Tweet> {
        serde_json::from_value(self.0.clone()).ok()
    }
}

/// Parameters for `verify_credentials`.
#[derive(Debug, Clone, Default)]
pub struct VerifyCredentialsQuery {
    pub include_entities: Option<bool>,
    pub skip_status: Option<bool>,
    pub include_email: Option<bool>,
}

/// Parameters for `blocked_users`.
#[derive(Debug, Clone, Default)]
pub struct BlockedUsersQuery {
    pub include_entities: Option<bool>,
    pub skip_status: Option<bool>,
}

/// Parameters for `favorites`.
#[derive(Debug, Clone, Default)]
pub struct FavoritesQuery {
    pub user_id: Option<i64>,
    pub screen_name: Option<String>,
    pub count: Option<u32>,
    pub since_id: Option<i64>,
    pub max_id: Option<i64>,
    pub include_entities: Option<bool>,
}

/// Parameters for `collection_entries`.
#[derive(Debug, Clone, Default)]
pub struct CollectionEntriesQuery {
    pub count: Option<u32>,
    pub max_position: Option<i64>,
    pub min_position: Option<i64>,
}

/// Parameters for `find_collections`. At least one of `screen_name` or
/// `user_id` must be set for the server to accept the call.
#[derive(Debug, Clone, Default)]
pub struct FindCollectionsQuery {
    pub screen_name: Option<String>,
    pub user_id: Option<i64>,
    pub tweet_id: Option<i64>,
    pub count: Option<u32>,
}

/// Filter parameters for the filtered public stream.
#[derive(Debug, Clone, Default)]
pub struct FilterQuery {
    /// Phrases to track.
    pub track: Vec<String>,
    /// User ids to follow.
    pub follow: Vec<i64>,
    /// Bounding boxes as longitude/latitude pairs, flattened.
    pub locations: Vec<f64>,
}

impl FilterQuery {
    pub(crate) fn into_params(self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if !self.track.is_empty() {
            params.push(("track".to_string(), self.track.join(",")));
        }
        if !self.follow.is_empty() {
            let follow = self
                .follow
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            params.push(("follow".to_string(), follow));
        }
        if !self.locations.is_empty() {
            let locations = self
                .locations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            params.push(("locations".to_string(), locations));
        }
        params
    }
}
