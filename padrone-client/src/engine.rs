//! Request execution engine.
//!
//! A call moves through `Composing -> Sent -> Polling -> Completed | Failed`:
//!
//! - **Composing**: the shared header buffer is cleared and refilled, the
//!   payload is serialized.
//! - **Sent**: a transport is leased from the pool for the call's method, the
//!   headers are copied onto it and the exchange is started.
//! - **Polling**: the call's future parks and checks the transport once per
//!   scheduler tick until it reports completion or the timeout expires.
//! - **Completed**: the status line and body are read and the transport goes
//!   back to the pool. A timeout aborts the transport before releasing it.
//!
//! Composing and sending happen synchronously on the first poll, so the
//! header buffer is never observed by two calls at once.

use crate::config::ClientConfig;
use crate::headers::{HeaderBuffer, ACCEPT, AUTH, CONTENT_TYPE};
use crate::pool::TransportPool;
use crate::transport::Transport;
use bytes::Bytes;
use hyper::StatusCode;
use padrone_core::{AuthToken, ClientError, ClientResult, HttpMethod};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

const JSON: &str = "application/json";
const ACCEPT_VALUE: &str = "application/json, text/plain";

/// Supplies the auth token for each request. Called once per send.
pub type TokenProvider = Box<dyn Fn() -> AuthToken>;

/// Status and body text of a finished exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub text: String,
}

impl RawResponse {
    /// Decode the body as JSON if the status is `200 OK`.
    ///
    /// Any other status, including the rest of the 2xx range, is delivered
    /// with no payload.
    pub fn decode<R: DeserializeOwned>(self) -> ClientResult<ApiResponse<R>> {
        let body = if self.status == StatusCode::OK {
            Some(serde_json::from_str(&self.text).map_err(ClientError::Decode)?)
        } else {
            None
        };
        Ok(ApiResponse {
            status: self.status,
            body,
        })
    }
}

/// A status plus the decoded payload, present only on `200 OK`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub status: StatusCode,
    pub body: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Parse an HTTP status line such as `HTTP/1.1 200 OK`.
///
/// Anything unusable yields `404 Not Found` so that callers always get a status.
pub fn parse_status(status_line: Option<&str>) -> StatusCode {
    let Some(line) = status_line else {
        error!("missing response status");
        return StatusCode::NOT_FOUND;
    };

    let components: Vec<&str> = line.split(' ').collect();
    if components.len() < 3 {
        error!("invalid response status: {}", line);
        return StatusCode::NOT_FOUND;
    }

    match components[1].parse::<u16>().map(StatusCode::from_u16) {
        Ok(Ok(status)) => status,
        _ => {
            error!("invalid response code: {}", components[1]);
            StatusCode::NOT_FOUND
        }
    }
}

/// Turns calls into HTTP exchanges over pooled transports.
pub struct RequestEngine<T: Transport> {
    app_url: String,
    token_provider: TokenProvider,
    pool: TransportPool<T>,
    headers: RefCell<HeaderBuffer>,
    request_timeout: Duration,
    poll_interval: Duration,
}

impl<T: Transport> RequestEngine<T> {
    /// Create an engine, filling its pool from `factory`.
    pub fn new(
        config: &ClientConfig,
        token_provider: TokenProvider,
        factory: impl FnMut(HttpMethod) -> T,
    ) -> ClientResult<Self> {
        config.validate()?;
        Ok(Self {
            app_url: config.app_url(),
            token_provider,
            pool: TransportPool::new(config.pool_capacity, factory),
            headers: RefCell::new(HeaderBuffer::with_capacity(config.header_capacity)),
            request_timeout: config.request_timeout,
            poll_interval: config.poll_interval,
        })
    }

    pub fn pool(&self) -> &TransportPool<T> {
        &self.pool
    }

    /// GET `endpoint` and decode the JSON body on success.
    pub async fn get<R: DeserializeOwned>(&self, endpoint: &str) -> ClientResult<ApiResponse<R>> {
        self.send(HttpMethod::Get, endpoint, Bytes::new())
            .await?
            .decode()
    }

    /// GET `endpoint`, ignoring the body.
    pub async fn get_status(&self, endpoint: &str) -> ClientResult<StatusCode> {
        Ok(self.send(HttpMethod::Get, endpoint, Bytes::new()).await?.status)
    }

    /// POST `payload` as JSON and decode the JSON body on success.
    pub async fn post<P, R>(&self, endpoint: &str, payload: Option<&P>) -> ClientResult<ApiResponse<R>>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = encode_payload(payload)?;
        self.send(HttpMethod::Post, endpoint, body).await?.decode()
    }

    /// POST `payload` as JSON, ignoring the body. `None` sends an empty body.
    pub async fn post_status<P>(&self, endpoint: &str, payload: Option<&P>) -> ClientResult<StatusCode>
    where
        P: Serialize + ?Sized,
    {
        let body = encode_payload(payload)?;
        Ok(self.send(HttpMethod::Post, endpoint, body).await?.status)
    }

    /// Run one exchange to completion. GET requests never carry a body.
    pub async fn send(&self, method: HttpMethod, endpoint: &str, body: Bytes) -> ClientResult<RawResponse> {
        let body = match method {
            HttpMethod::Get => Bytes::new(),
            HttpMethod::Post => body,
        };
        let url = format!("{}/{}", self.app_url, endpoint);
        debug!("Request {} {}", method, url);

        self.compose_headers(!body.is_empty())?;

        let mut transport = self.pool.lease(method)?;
        transport.reset();
        for (name, value) in self.headers.borrow().iter() {
            transport.set_header(name, value);
        }
        transport.send(method, &url, body);

        let polled = tokio::time::timeout(
            self.request_timeout,
            wait_until_done(&mut *transport, self.poll_interval),
        )
        .await;

        if polled.is_err() {
            transport.abort();
            warn!("Request {} {} timed out after {:?}", method, url, self.request_timeout);
            return Err(ClientError::Timeout {
                url,
                timeout: self.request_timeout,
            });
        }

        let status = parse_status(transport.status_line());
        let text = transport.text().to_string();
        debug!("Response {} {}: {}", method, url, status);

        Ok(RawResponse { status, text })
    }

    fn compose_headers(&self, has_body: bool) -> ClientResult<()> {
        let mut headers = self.headers.borrow_mut();
        headers.clear();
        if has_body {
            headers.add(CONTENT_TYPE, JSON)?;
        }
        headers.add(ACCEPT, ACCEPT_VALUE)?;
        let token = (self.token_provider)();
        headers.add(AUTH, token.as_base64())
    }
}

fn encode_payload<P: Serialize + ?Sized>(payload: Option<&P>) -> ClientResult<Bytes> {
    match payload {
        Some(payload) => serde_json::to_vec(payload)
            .map(Bytes::from)
            .map_err(ClientError::Encode),
        None => Ok(Bytes::new()),
    }
}

/// Check `transport` once per tick until it reports completion.
async fn wait_until_done<T: Transport + ?Sized>(transport: &mut T, poll_interval: Duration) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if transport.is_done() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{StubServer, StubTransport};
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    fn config() -> ClientConfig {
        ClientConfig::new("http://padrone.test/", "1.0").with_pool_capacity(2)
    }

    fn engine_with(server: &Rc<StubServer>, config: ClientConfig) -> RequestEngine<StubTransport> {
        RequestEngine::new(
            &config,
            Box::new(|| AuthToken::admin("root", "pw")),
            server.factory(),
        )
        .unwrap()
    }

    fn engine(server: &Rc<StubServer>) -> RequestEngine<StubTransport> {
        engine_with(server, config())
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status(Some("HTTP/1.1 200 OK")), StatusCode::OK);
        assert_eq!(
            parse_status(Some("HTTP/1.1 503 Service Unavailable")),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(parse_status(Some("HTTP/1.1 200")), StatusCode::NOT_FOUND);
        assert_eq!(parse_status(Some("HTTP/1.1 abc OK")), StatusCode::NOT_FOUND);
        assert_eq!(parse_status(Some("HTTP/1.1 42 Weird")), StatusCode::NOT_FOUND);
        assert_eq!(parse_status(Some("")), StatusCode::NOT_FOUND);
        assert_eq!(parse_status(None), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_decode_only_on_success() {
        let ok = RawResponse {
            status: StatusCode::OK,
            text: "[1,2]".to_string(),
        };
        assert_eq!(ok.decode::<Vec<u32>>().unwrap().body, Some(vec![1, 2]));

        let failed = RawResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            text: "<html>oops</html>".to_string(),
        };
        let response = failed.decode::<Vec<u32>>().unwrap();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body.is_none());

        let garbage = RawResponse {
            status: StatusCode::OK,
            text: "not json".to_string(),
        };
        assert!(matches!(garbage.decode::<Vec<u32>>(), Err(ClientError::Decode(_))));
    }

    #[test]
    fn test_other_success_statuses_keep_status_without_body() {
        for status in [StatusCode::CREATED, StatusCode::NO_CONTENT] {
            let response = RawResponse {
                status,
                text: String::new(),
            }
            .decode::<Vec<u32>>()
            .unwrap();
            assert_eq!(response.status, status);
            assert!(response.is_success());
            assert!(response.body.is_none());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_composes_request() {
        let server = StubServer::new();
        server.respond(200, "");
        let engine = engine(&server);

        let status = engine
            .post_status("ping", Some(&json!({"hostEndpoint": "10.0.0.1:7777"})))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "http://padrone.test/app/ping");
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.header("Accept"), Some("application/json, text/plain"));
        assert_eq!(
            request.header("X-Padrone-Auth"),
            Some(AuthToken::admin("root", "pw").as_base64())
        );
        assert_eq!(&request.body[..], br#"{"hostEndpoint":"10.0.0.1:7777"}"#);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_send_has_no_stale_headers() {
        let server = StubServer::new();
        server.respond(200, "");
        server.respond(200, "");
        let engine = engine(&server);

        engine.post_status("ping", Some(&json!({}))).await.unwrap();
        engine.get_status("health-check").await.unwrap();

        let requests = server.requests();
        assert!(requests[0].header("Content-Type").is_some());
        assert!(requests[1].header("Content-Type").is_none());
        assert_eq!(requests[1].headers.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_post_has_no_content_type() {
        let server = StubServer::new();
        server.respond(204, "");
        let engine = engine(&server);

        let status = engine.post_status::<()>("leave", None).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let requests = server.requests();
        let request = &requests[0];
        assert!(request.body.is_empty());
        assert!(request.header("Content-Type").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_never_carries_body() {
        let server = StubServer::new();
        server.respond(200, "");
        let engine = engine(&server);

        engine
            .send(HttpMethod::Get, "me", Bytes::from_static(b"{}"))
            .await
            .unwrap();
        let requests = server.requests();
        let request = &requests[0];
        assert!(request.body.is_empty());
        assert!(request.header("Content-Type").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_provider_called_per_send() {
        let server = StubServer::new();
        server.respond(200, "");
        server.respond(200, "");
        let counter = Rc::new(Cell::new(0));
        let calls = Rc::clone(&counter);
        let engine = RequestEngine::new(
            &config(),
            Box::new(move || {
                calls.set(calls.get() + 1);
                AuthToken::itch_api_key(&format!("key-{}", calls.get()))
            }),
            server.factory(),
        )
        .unwrap();

        engine.get_status("me").await.unwrap();
        engine.get_status("me").await.unwrap();

        let requests = server.requests();
        assert_eq!(counter.get(), 2);
        assert_eq!(
            requests[0].header("X-Padrone-Auth"),
            Some(AuthToken::itch_api_key("key-1").as_base64())
        );
        assert_eq!(
            requests[1].header("X-Padrone-Auth"),
            Some(AuthToken::itch_api_key("key-2").as_base64())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_done() {
        let server = StubServer::new();
        server.respond_raw(Some("HTTP/1.1 200 OK"), r#"{"ok":true}"#, 5);
        let engine = engine(&server);

        let response: ApiResponse<serde_json::Value> = engine.get("me").await.unwrap();
        assert_eq!(response.body, Some(json!({"ok": true})));
        assert_eq!(engine.pool().available(HttpMethod::Get), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_status_line_is_not_found() {
        let server = StubServer::new();
        server.respond_raw(Some("garbage"), "", 0);
        server.respond_raw(None, "", 0);
        let engine = engine(&server);

        assert_eq!(engine.get_status("me").await.unwrap(), StatusCode::NOT_FOUND);
        assert_eq!(engine.get_status("me").await.unwrap(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_aborts_and_releases() {
        let server = StubServer::new();
        server.stall();
        let engine = engine_with(
            &server,
            config().with_request_timeout(Duration::from_secs(2)),
        );

        let err = engine.get_status("me").await.unwrap_err();
        match err {
            ClientError::Timeout { url, timeout } => {
                assert_eq!(url, "http://padrone.test/app/me");
                assert_eq!(timeout, Duration::from_secs(2));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(server.aborts(), 1);
        assert_eq!(engine.pool().available(HttpMethod::Get), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_exhaust_pool() {
        let server = StubServer::new();
        server.stall();
        let engine = engine_with(
            &server,
            config()
                .with_pool_capacity(1)
                .with_request_timeout(Duration::from_secs(1)),
        );

        let (first, second) = tokio::join!(engine.get_status("me"), engine.get_status("me"));
        assert!(matches!(first, Err(ClientError::Timeout { .. })));
        assert!(matches!(
            second,
            Err(ClientError::PoolExhausted {
                method: HttpMethod::Get,
                capacity: 1
            })
        ));
        assert_eq!(server.requests().len(), 1);
        assert_eq!(engine.pool().available(HttpMethod::Get), 1);
        // POST has its own pool.
        assert_eq!(engine.pool().available(HttpMethod::Post), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_call_releases_transport() {
        let server = StubServer::new();
        server.stall();
        let engine = engine(&server);

        let call = engine.get_status("me");
        let _ = tokio::time::timeout(Duration::from_millis(100), call).await;
        assert_eq!(engine.pool().available(HttpMethod::Get), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let server = StubServer::new();
        let result = RequestEngine::new(
            &config().with_header_capacity(1),
            Box::new(|| AuthToken::admin("a", "b")),
            server.factory(),
        );
        assert!(matches!(result, Err(ClientError::Config(_))));
    }
}
