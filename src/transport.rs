//! Transport boundary: one authenticated request in, a bounded response or
//! a raw byte stream out.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, TryStreamExt, stream::BoxStream};
use reqwest::{Client, Method, header::AUTHORIZATION};

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::request::SignedRequest;

/// Raw bytes from a streaming response, yielded until the connection ends.
pub type ByteSource = BoxStream<'static, Result<Bytes, TransportError>>;

/// A fully-buffered response to a bounded request.
#[derive(Debug)]
pub struct BoundedResponse {
    pub status: u16,
    pub body: Bytes,
}

/// An open streaming response: the handshake status plus the byte source.
pub struct StreamingResponse {
    pub status: u16,
    pub source: ByteSource,
}

/// Sends authenticated requests. REST calls get a bounded response;
/// streaming calls get a long-lived byte source.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send a bounded request and buffer the whole response.
    async fn send(&self, request: SignedRequest) -> Result<BoundedResponse, TransportError>;

    /// Open a long-lived streaming connection.
    async fn open(&self, request: SignedRequest) -> Result<StreamingResponse, TransportError>;
}

/// The default transport over `reqwest`.
///
/// Bounded requests share one client with an overall timeout; streaming
/// requests use a second client with only a connect timeout, since the
/// connection is meant to stay open indefinitely.
#[derive(Debug)]
pub struct HttpTransport {
    rest: Client,
    streaming: Client,
}

impl HttpTransport {
    /// Build a transport from the client configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let rest = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        let streaming = Client::builder()
            .connect_timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { rest, streaming })
    }

    /// Attach parameters and the authorization header. GET/DELETE params go
    /// in the query string, everything else as a form body, matching what
    /// the signature was computed over.
    fn build(client: &Client, request: SignedRequest) -> reqwest::RequestBuilder {
        let SignedRequest {
            method,
            url,
            params,
            authorization,
        } = request;

        let in_query = method == Method::GET || method == Method::DELETE;
        let mut builder = client.request(method, url.as_str());

        if !params.is_empty() {
            builder = if in_query {
                builder.query(&params)
            } else {
                builder.form(&params)
            };
        }

        builder.header(AUTHORIZATION, authorization)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: SignedRequest) -> Result<BoundedResponse, TransportError> {
        let response = Self::build(&self.rest, request).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(BoundedResponse { status, body })
    }

    async fn open(&self, request: SignedRequest) -> Result<StreamingResponse, TransportError> {
        let response = Self::build(&self.streaming, request).send().await?;
        let status = response.status().as_u16();
        let source = response
            .bytes_stream()
            .map_err(TransportError::from)
            .boxed();
        Ok(StreamingResponse { status, source })
    }
}
