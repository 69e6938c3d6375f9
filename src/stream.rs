//! Stream sessions: persistent connections delivering newline-delimited
//! JSON messages to registered consumers.
//!
//! A session owns one streaming connection's lifecycle: connect, read
//! loop, reconnect with backoff, shutdown. The wire format is one JSON
//! object per `\n`-terminated line; blank lines are keep-alives. Network
//! failures back off linearly, rate limiting exponentially, and after too
//! many consecutive failed reconnects the session stops with
//! [`StreamError::GaveUp`].

use std::fmt;
use std::sync::Arc;

use bytes::BytesMut;
use futures_util::StreamExt;
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::auth::Authenticator;
use crate::config::{BackoffClass, StreamConfig};
use crate::error::{Error, StreamError};
use crate::request::{AuthRequirement, RequestDescriptor};
use crate::transport::{ByteSource, Transport};
use crate::types::StreamMessage;

/// Lifecycle state of a stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Reconnecting,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Reconnecting => "reconnecting",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Endpoint configuration for one stream session: method, URL, filter
/// parameters, and the authentication path.
#[derive(Debug, Clone)]
pub struct StreamEndpoint {
    method: Method,
    url: String,
    params: Vec<(String, String)>,
    auth: AuthRequirement,
}

impl StreamEndpoint {
    /// Describe a stream endpoint.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>, auth: AuthRequirement) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            auth,
        }
    }

    /// Attach filter parameters.
    #[must_use]
    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    fn descriptor(&self) -> RequestDescriptor {
        let mut descriptor = RequestDescriptor::new(self.method.clone(), self.url.clone(), self.auth);
        for (key, value) in &self.params {
            descriptor = descriptor.param(key.clone(), value.clone());
        }
        descriptor
    }
}

type Predicate = Box<dyn Fn(&StreamMessage) -> bool + Send>;
type Handler = Box<dyn FnMut(StreamMessage) + Send>;

struct Consumer {
    predicate: Predicate,
    handler: Handler,
}

struct Running {
    shutdown: watch::Sender<bool>,
}

struct Inner {
    endpoint: Mutex<StreamEndpoint>,
    auth: Arc<Authenticator>,
    transport: Arc<dyn Transport>,
    config: StreamConfig,
    state: watch::Sender<SessionState>,
    consumers: Mutex<Vec<Consumer>>,
    last_error: Mutex<Option<StreamError>>,
    running: Mutex<Option<Running>>,
}

impl Inner {
    fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: SessionState) {
        self.state.send_replace(next);
    }
}

/// One long-lived streaming connection and its consumers.
///
/// Sessions are constructed bound to an endpoint and an authenticator;
/// nothing happens until [`start`](Self::start) is called. Dropping the
/// session stops it.
pub struct StreamSession {
    inner: Arc<Inner>,
}

impl StreamSession {
    /// Create a session for an endpoint. The session holds the signing
    /// capability and transport it needs; it keeps no reference to the
    /// `App` that owns it.
    #[must_use]
    pub fn new(
        endpoint: StreamEndpoint,
        auth: Arc<Authenticator>,
        transport: Arc<dyn Transport>,
        config: StreamConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            inner: Arc::new(Inner {
                endpoint: Mutex::new(endpoint),
                auth,
                transport,
                config,
                state,
                consumers: Mutex::new(Vec::new()),
                last_error: Mutex::new(None),
                running: Mutex::new(None),
            }),
        }
    }

    /// Register a consumer. `handler` runs for every message the
    /// `predicate` accepts; the predicate is re-evaluated per message.
    /// Dispatch order is registration order.
    ///
    /// Handlers run on the session task and must not register further
    /// consumers on the same session.
    pub fn register<P, H>(&self, predicate: P, handler: H)
    where
        P: Fn(&StreamMessage) -> bool + Send + 'static,
        H: FnMut(StreamMessage) + Send + 'static,
    {
        self.inner.consumers.lock().push(Consumer {
            predicate: Box::new(predicate),
            handler: Box::new(handler),
        });
    }

    /// Open the streaming connection and begin dispatching.
    ///
    /// Valid only from `Idle` or `Stopped`. An initial handshake failure
    /// returns [`StreamError::ConnectFailed`] and leaves the session
    /// `Idle`; it is not retried automatically.
    pub async fn start(&self) -> Result<(), Error> {
        {
            let running = self.inner.running.lock();
            let state = self.inner.state();
            if running.is_some()
                || !matches!(state, SessionState::Idle | SessionState::Stopped)
            {
                return Err(StreamError::AlreadyRunning(state).into());
            }
            *self.inner.last_error.lock() = None;
            self.inner.set_state(SessionState::Connecting);
        }

        let source = match open_stream(&self.inner).await {
            Ok(source) => source,
            Err(failure) => {
                // Leave the session alone if a concurrent stop() finalized it.
                if self.inner.state() == SessionState::Connecting {
                    self.inner.set_state(SessionState::Idle);
                }
                return Err(StreamError::ConnectFailed(failure.message).into());
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        {
            let mut running = self.inner.running.lock();
            if self.inner.state() == SessionState::Stopped {
                // Stopped while connecting; drop the fresh connection.
                return Ok(());
            }
            *running = Some(Running {
                shutdown: shutdown_tx,
            });
            self.inner.set_state(SessionState::Streaming);
        }

        info!(url = %self.inner.endpoint.lock().url, "stream connected");
        tokio::spawn(run_loop(self.inner.clone(), source, shutdown_rx));
        Ok(())
    }

    /// Stop the session, closing any open connection and discarding
    /// buffered partial data. Safe to call from any task; unblocks pending
    /// reads and backoff waits promptly. Idempotent.
    pub fn stop(&self) {
        let mut running = self.inner.running.lock();
        if self.inner.state() == SessionState::Stopped {
            return;
        }
        if let Some(running) = running.take() {
            let _ = running.shutdown.send(true);
        }
        self.inner.set_state(SessionState::Stopped);
    }

    /// Return a `Stopped` session to `Idle`, clearing its recorded error.
    pub fn reset(&self) -> Result<(), StreamError> {
        let _running = self.inner.running.lock();
        match self.inner.state() {
            SessionState::Stopped => {
                *self.inner.last_error.lock() = None;
                self.inner.set_state(SessionState::Idle);
                Ok(())
            }
            SessionState::Idle => Ok(()),
            state => Err(StreamError::AlreadyRunning(state)),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// Watch lifecycle transitions.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// The error that stopped the session, if it stopped on its own.
    #[must_use]
    pub fn last_error(&self) -> Option<StreamError> {
        self.inner.last_error.lock().clone()
    }

    /// Replace the endpoint's filter parameters. Valid only while the
    /// session is not running.
    pub fn set_params(&self, params: Vec<(String, String)>) -> Result<(), StreamError> {
        let state = self.inner.state();
        if matches!(state, SessionState::Idle | SessionState::Stopped) {
            self.inner.endpoint.lock().params = params;
            Ok(())
        } else {
            Err(StreamError::AlreadyRunning(state))
        }
    }

    /// The endpoint's current filter parameters.
    #[must_use]
    pub fn params(&self) -> Vec<(String, String)> {
        self.inner.endpoint.lock().params.clone()
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.stop();
    }
}

struct ConnectFailure {
    message: String,
    rate_limited: bool,
}

/// Sign the endpoint request and open the connection, validating the
/// handshake status.
async fn open_stream(inner: &Inner) -> Result<ByteSource, ConnectFailure> {
    let descriptor = inner.endpoint.lock().descriptor();

    let signed = match inner.auth.authorize(&descriptor).await {
        Ok(signed) => signed,
        Err(e) => {
            return Err(ConnectFailure {
                message: format!("authorization failed: {e}"),
                rate_limited: false,
            });
        }
    };

    let response = match inner.transport.open(signed).await {
        Ok(response) => response,
        Err(e) => {
            return Err(ConnectFailure {
                message: e.to_string(),
                rate_limited: false,
            });
        }
    };

    if response.status == 420 || response.status == 429 {
        return Err(ConnectFailure {
            message: format!("rate limited (status {})", response.status),
            rate_limited: true,
        });
    }
    if !(200..300).contains(&response.status) {
        return Err(ConnectFailure {
            message: format!("server returned status {}", response.status),
            rate_limited: false,
        });
    }

    Ok(response.source)
}

enum ReadOutcome {
    Shutdown,
    Disconnected,
}

/// The session task: read until disconnect, then back off and reconnect
/// until shutdown, success, or the failure budget runs out.
async fn run_loop(
    inner: Arc<Inner>,
    mut source: ByteSource,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut failures: u32 = 0;

    loop {
        match read_until_disconnect(&inner, &mut source, &mut shutdown).await {
            ReadOutcome::Shutdown => return,
            ReadOutcome::Disconnected => {}
        }

        // The dead connection is dropped before any backoff wait.
        source = futures_util::stream::empty().boxed();
        let mut class = BackoffClass::Network;
        inner.set_state(SessionState::Reconnecting);

        loop {
            if failures >= inner.config.backoff.max_failures {
                warn!(
                    attempts = failures,
                    "giving up on stream after repeated reconnect failures"
                );
                let mut running = inner.running.lock();
                *inner.last_error.lock() = Some(StreamError::GaveUp { attempts: failures });
                running.take();
                inner.set_state(SessionState::Stopped);
                return;
            }

            let delay = inner.config.backoff.delay_for_attempt(class, failures);
            info!(
                delay_ms = delay.as_millis(),
                attempt = failures + 1,
                "waiting before reconnect"
            );

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = wait_for_shutdown(&mut shutdown) => return,
            }

            match open_stream(&inner).await {
                Ok(new_source) => {
                    source = new_source;
                    failures = 0;
                    inner.set_state(SessionState::Streaming);
                    info!("stream reconnected");
                    break;
                }
                Err(failure) => {
                    failures += 1;
                    if failure.rate_limited {
                        class = BackoffClass::RateLimit;
                    }
                    warn!(error = %failure.message, failures, "reconnect attempt failed");
                }
            }
        }
    }
}

/// Consume the byte source, framing and dispatching lines, until the
/// connection dies, the keep-alive window lapses, or shutdown is signaled.
async fn read_until_disconnect(
    inner: &Inner,
    source: &mut ByteSource,
    shutdown: &mut watch::Receiver<bool>,
) -> ReadOutcome {
    let mut framer = LineFramer::default();

    loop {
        let next = tokio::select! {
            () = wait_for_shutdown(shutdown) => return ReadOutcome::Shutdown,
            next = tokio::time::timeout(inner.config.keepalive_timeout, source.next()) => next,
        };

        match next {
            Err(_) => {
                warn!(
                    silence_secs = inner.config.keepalive_timeout.as_secs(),
                    "keep-alive window elapsed without data"
                );
                return ReadOutcome::Disconnected;
            }
            Ok(None) => {
                info!("server closed the stream");
                return ReadOutcome::Disconnected;
            }
            Ok(Some(Err(error))) => {
                warn!(error = %error, "stream read error");
                return ReadOutcome::Disconnected;
            }
            Ok(Some(Ok(chunk))) => {
                for frame in framer.push(&chunk) {
                    match frame {
                        Frame::KeepAlive => debug!("keep-alive"),
                        Frame::Line(line) => dispatch_line(inner, &line),
                    }
                }
            }
        }
    }
}

/// Parse one line and hand it to every consumer whose predicate accepts
/// it, in registration order. Malformed lines are dropped with a
/// diagnostic; the session keeps streaming.
fn dispatch_line(inner: &Inner, line: &str) {
    match serde_json::from_str::<Value>(line) {
        Ok(value) => {
            let message = StreamMessage::new(value);
            let mut consumers = inner.consumers.lock();
            for consumer in consumers.iter_mut() {
                if (consumer.predicate)(&message) {
                    (consumer.handler)(message.clone());
                }
            }
        }
        Err(error) => warn!(error = %error, line, "dropping malformed stream line"),
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

enum Frame {
    /// A blank line.
    KeepAlive,
    /// One complete non-blank line, terminator stripped.
    Line(String),
}

/// Incremental splitter for newline-delimited frames. Partial lines stay
/// buffered until their terminator arrives.
#[derive(Debug, Default)]
struct LineFramer {
    buffer: BytesMut,
}

impl LineFramer {
    fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if text.is_empty() {
                frames.push(Frame::KeepAlive);
            } else {
                frames.push(Frame::Line(text.to_string()));
            }
        }

        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::config::BackoffConfig;
    use crate::credentials::CredentialStore;
    use crate::error::TransportError;
    use crate::transport::{BoundedResponse, StreamingResponse};
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::stream;
    use std::collections::VecDeque;
    use std::time::Duration;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    /// What one `open` call should produce.
    enum OpenScript {
        /// Transport-level failure.
        Fail,
        /// Handshake completes with this status and an empty body.
        Status(u16),
        /// 200 with these chunks; optionally stay open afterwards.
        Chunks(Vec<&'static [u8]>, bool),
    }

    struct ScriptedTransport {
        opens: Mutex<VecDeque<OpenScript>>,
    }

    impl ScriptedTransport {
        fn new(scripts: Vec<OpenScript>) -> Self {
            Self {
                opens: Mutex::new(scripts.into()),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            _request: crate::request::SignedRequest,
        ) -> Result<BoundedResponse, TransportError> {
            Err(TransportError::InvalidRequest(
                "scripted transport only streams".into(),
            ))
        }

        async fn open(
            &self,
            _request: crate::request::SignedRequest,
        ) -> Result<StreamingResponse, TransportError> {
            match self.opens.lock().pop_front() {
                None | Some(OpenScript::Fail) => Err(TransportError::InvalidRequest(
                    "scripted connection failure".into(),
                )),
                Some(OpenScript::Status(status)) => Ok(StreamingResponse {
                    status,
                    source: stream::empty().boxed(),
                }),
                Some(OpenScript::Chunks(chunks, keep_open)) => {
                    let chunks = chunks
                        .into_iter()
                        .map(|c| Ok(Bytes::from_static(c)))
                        .collect::<Vec<_>>();
                    let source = if keep_open {
                        stream::iter(chunks).chain(stream::pending()).boxed()
                    } else {
                        stream::iter(chunks).boxed()
                    };
                    Ok(StreamingResponse {
                        status: 200,
                        source,
                    })
                }
            }
        }
    }

    fn test_session(scripts: Vec<OpenScript>) -> StreamSession {
        init_tracing();
        let transport: Arc<dyn Transport> = Arc::new(ScriptedTransport::new(scripts));
        let store = CredentialStore::new("key", "secret");
        store.set_account(Account::new(1, "tester", "tok", "tok-secret"));
        let auth = Arc::new(Authenticator::new(
            store,
            transport.clone(),
            "http://unused.invalid/oauth2/token".into(),
        ));

        let mut config = StreamConfig::default();
        config.keepalive_timeout = Duration::from_secs(5);
        config.backoff = BackoffConfig {
            network_initial: Duration::from_millis(1),
            network_step: Duration::from_millis(1),
            network_ceiling: Duration::from_millis(10),
            ratelimit_initial: Duration::from_millis(2),
            ratelimit_ceiling: Duration::from_millis(20),
            max_failures: 3,
        };

        StreamSession::new(
            StreamEndpoint::new(
                Method::GET,
                "http://stream.invalid/1.1/statuses/sample.json",
                AuthRequirement::UserContext,
            ),
            auth,
            transport,
            config,
        )
    }

    fn collecting(session: &StreamSession) -> Arc<Mutex<Vec<StreamMessage>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        session.register(|_| true, move |message| sink.lock().push(message));
        seen
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not met within 5s");
    }

    #[test]
    fn framer_splits_lines_and_keepalives() {
        let mut framer = LineFramer::default();
        let frames = framer.push(b"{\"a\":1}\n\n{\"a\":2}\n");

        assert_eq!(frames.len(), 3);
        assert!(matches!(&frames[0], Frame::Line(l) if l == "{\"a\":1}"));
        assert!(matches!(&frames[1], Frame::KeepAlive));
        assert!(matches!(&frames[2], Frame::Line(l) if l == "{\"a\":2}"));
    }

    #[test]
    fn framer_buffers_partial_lines() {
        let mut framer = LineFramer::default();
        assert!(framer.push(b"{\"a\"").is_empty());
        assert!(framer.push(b":1").is_empty());

        let frames = framer.push(b"}\n");
        assert_eq!(frames.len(), 1);
        assert!(matches!(&frames[0], Frame::Line(l) if l == "{\"a\":1}"));
    }

    #[test]
    fn framer_handles_crlf_keepalives() {
        let mut framer = LineFramer::default();
        let frames = framer.push(b"\r\n{\"a\":1}\r\n");

        assert_eq!(frames.len(), 2);
        assert!(matches!(&frames[0], Frame::KeepAlive));
        assert!(matches!(&frames[1], Frame::Line(l) if l == "{\"a\":1}"));
    }

    #[tokio::test]
    async fn dispatches_events_in_order_and_skips_keepalives() {
        let session = test_session(vec![OpenScript::Chunks(
            vec![b"{\"a\":1}\n\n{\"a\":2}\n"],
            true,
        )]);
        let seen = collecting(&session);

        session.start().await.unwrap();
        wait_until(|| seen.lock().len() == 2).await;

        let seen = seen.lock();
        assert_eq!(seen[0].get("a").and_then(Value::as_i64), Some(1));
        assert_eq!(seen[1].get("a").and_then(Value::as_i64), Some(2));
        assert_eq!(session.state(), SessionState::Streaming);

        drop(seen);
        session.stop();
    }

    #[tokio::test]
    async fn events_split_across_chunks_are_reassembled() {
        let session = test_session(vec![OpenScript::Chunks(
            vec![b"{\"a\"", b":1}\n"],
            true,
        )]);
        let seen = collecting(&session);

        session.start().await.unwrap();
        wait_until(|| seen.lock().len() == 1).await;

        assert_eq!(seen.lock()[0].get("a").and_then(Value::as_i64), Some(1));
        session.stop();
    }

    #[tokio::test]
    async fn malformed_lines_are_dropped_without_killing_the_session() {
        let session = test_session(vec![OpenScript::Chunks(
            vec![b"{\"a\":1}\nnot json\n{\"a\":2}\n"],
            true,
        )]);
        let seen = collecting(&session);

        session.start().await.unwrap();
        wait_until(|| seen.lock().len() == 2).await;

        let seen = seen.lock();
        assert_eq!(seen[0].get("a").and_then(Value::as_i64), Some(1));
        assert_eq!(seen[1].get("a").and_then(Value::as_i64), Some(2));
        assert_eq!(session.state(), SessionState::Streaming);

        drop(seen);
        session.stop();
    }

    #[tokio::test]
    async fn predicates_gate_their_own_handler_only() {
        let session = test_session(vec![OpenScript::Chunks(
            vec![b"{\"a\":1}\n{\"a\":2}\n"],
            true,
        )]);

        let filtered = Arc::new(Mutex::new(Vec::new()));
        let sink = filtered.clone();
        session.register(
            |message| message.get("a").and_then(Value::as_i64) == Some(2),
            move |message| sink.lock().push(message),
        );

        let all = collecting(&session);

        session.start().await.unwrap();
        wait_until(|| all.lock().len() == 2).await;

        assert_eq!(filtered.lock().len(), 1);
        assert_eq!(
            filtered.lock()[0].get("a").and_then(Value::as_i64),
            Some(2)
        );
        session.stop();
    }

    #[tokio::test]
    async fn initial_connect_failure_returns_to_idle() {
        let session = test_session(vec![OpenScript::Fail]);

        let result = session.start().await;
        assert!(matches!(
            result,
            Err(Error::Stream(StreamError::ConnectFailed(_)))
        ));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn initial_rate_limit_is_a_connect_failure() {
        let session = test_session(vec![OpenScript::Status(420)]);

        match session.start().await {
            Err(Error::Stream(StreamError::ConnectFailed(message))) => {
                assert!(message.contains("rate limited"));
            }
            other => panic!("expected ConnectFailed, got {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn start_is_rejected_while_running() {
        let session = test_session(vec![OpenScript::Chunks(vec![b"{\"a\":1}\n"], true)]);
        session.start().await.unwrap();

        let result = session.start().await;
        assert!(matches!(
            result,
            Err(Error::Stream(StreamError::AlreadyRunning(_)))
        ));
        session.stop();
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let session = test_session(vec![OpenScript::Chunks(vec![b"{\"a\":1}\n"], true)]);
        session.start().await.unwrap();

        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);

        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);

        // A never-started session stops cleanly too.
        let idle = test_session(vec![]);
        idle.stop();
        idle.stop();
        assert_eq!(idle.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn reconnects_after_server_close_and_keeps_dispatching() {
        let session = test_session(vec![
            OpenScript::Chunks(vec![b"{\"a\":1}\n"], false),
            OpenScript::Chunks(vec![b"{\"a\":2}\n"], true),
        ]);
        let seen = collecting(&session);

        session.start().await.unwrap();
        wait_until(|| seen.lock().len() == 2).await;

        let seen = seen.lock();
        assert_eq!(seen[0].get("a").and_then(Value::as_i64), Some(1));
        assert_eq!(seen[1].get("a").and_then(Value::as_i64), Some(2));
        assert_eq!(session.state(), SessionState::Streaming);

        drop(seen);
        session.stop();
    }

    #[tokio::test]
    async fn gives_up_after_exhausting_reconnect_attempts() {
        // One good connect that ends immediately, then nothing but failures.
        let session = test_session(vec![OpenScript::Chunks(vec![], false)]);

        session.start().await.unwrap();
        wait_until(|| session.state() == SessionState::Stopped).await;

        match session.last_error() {
            Some(StreamError::GaveUp { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected GaveUp, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stopped_session_can_be_restarted() {
        let session = test_session(vec![
            OpenScript::Chunks(vec![b"{\"a\":1}\n"], true),
            OpenScript::Chunks(vec![b"{\"a\":2}\n"], true),
        ]);
        let seen = collecting(&session);

        session.start().await.unwrap();
        wait_until(|| seen.lock().len() == 1).await;
        session.stop();

        session.start().await.unwrap();
        wait_until(|| seen.lock().len() == 2).await;
        assert_eq!(seen.lock()[1].get("a").and_then(Value::as_i64), Some(2));
        session.stop();
    }

    #[tokio::test]
    async fn reset_clears_a_stopped_session() {
        let session = test_session(vec![]);
        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);

        session.reset().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn params_are_frozen_while_running() {
        let session = test_session(vec![OpenScript::Chunks(vec![b"{\"a\":1}\n"], true)]);
        session
            .set_params(vec![("track".into(), "rustlang".into())])
            .unwrap();

        session.start().await.unwrap();
        let result = session.set_params(vec![("track".into(), "other".into())]);
        assert!(matches!(result, Err(StreamError::AlreadyRunning(_))));

        session.stop();
        session
            .set_params(vec![("track".into(), "other".into())])
            .unwrap();
        assert_eq!(session.params()[0].1, "other");
    }
}
