//! Request descriptors and their signed form.

use reqwest::Method;

/// Which authentication path a request must take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequirement {
    /// OAuth 1.0a signature tied to the linked account.
    UserContext,
    /// Application-only bearer token.
    AppOnly,
}

/// An unauthenticated request: method, URL, parameters, and the auth path
/// it requires. Immutable once built; consumed by the authenticator.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    url: String,
    params: Vec<(String, String)>,
    auth: AuthRequirement,
}

impl RequestDescriptor {
    /// A GET request.
    #[must_use]
    pub fn get(url: impl Into<String>, auth: AuthRequirement) -> Self {
        Self::new(Method::GET, url, auth)
    }

    /// A POST request. Parameters are sent as a form body.
    #[must_use]
    pub fn post(url: impl Into<String>, auth: AuthRequirement) -> Self {
        Self::new(Method::POST, url, auth)
    }

    /// A request with an explicit method.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>, auth: AuthRequirement) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            auth,
        }
    }

    /// Append one parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Append one parameter when the value is present.
    #[must_use]
    pub fn opt_param<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.param(key, value.to_string()),
            None => self,
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    #[must_use]
    pub fn auth(&self) -> AuthRequirement {
        self.auth
    }
}

/// A request carrying its `Authorization` header, ready for transport.
///
/// GET parameters travel in the query string, POST parameters as a form
/// body; either way they are already covered by the authorization value.
#[derive(Debug)]
pub struct SignedRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub authorization: String,
}
