//! Transport handles.
//!
//! A [`Transport`] is one reusable HTTP exchange slot. The engine never
//! blocks on it: it starts an exchange with [`Transport::send`] and then
//! checks [`Transport::is_done`] once per scheduler tick.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Uri};
use hyper_util::rt::TokioIo;
use padrone_core::HttpMethod;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A poolable HTTP exchange.
pub trait Transport {
    /// Forget the previous exchange and its headers. Aborts it if still running.
    fn reset(&mut self);

    /// Set a request header for the next [`Transport::send`].
    fn set_header(&mut self, name: &str, value: &str);

    /// Start the exchange. Must not block.
    fn send(&mut self, method: HttpMethod, url: &str, body: Bytes);

    /// Whether the exchange has finished, successfully or not.
    fn is_done(&mut self) -> bool;

    /// The response status line (`HTTP/1.1 200 OK`), if one was received.
    fn status_line(&self) -> Option<&str>;

    /// The response body as text. Empty until done.
    fn text(&self) -> &str;

    /// Abandon the running exchange.
    fn abort(&mut self);
}

struct Completion {
    status_line: String,
    text: String,
}

/// HTTP/1.1 over plain TCP, driven by a spawned tokio task.
#[derive(Default)]
pub struct HyperTransport {
    headers: Vec<(String, String)>,
    pending: Option<oneshot::Receiver<Option<Completion>>>,
    task: Option<JoinHandle<()>>,
    status_line: Option<String>,
    text: String,
    done: bool,
}

impl HyperTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for HyperTransport {
    fn reset(&mut self) {
        self.abort();
        self.headers.clear();
        self.status_line = None;
        self.text.clear();
        self.done = false;
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn send(&mut self, method: HttpMethod, url: &str, body: Bytes) {
        let (tx, rx) = oneshot::channel();
        let url = url.to_string();
        let headers = self.headers.clone();

        self.pending = Some(rx);
        self.task = Some(tokio::spawn(async move {
            let completion = match exchange(method, &url, headers, body).await {
                Ok(completion) => Some(completion),
                Err(e) => {
                    warn!("{} {} failed: {}", method, url, e);
                    None
                }
            };
            let _ = tx.send(completion);
        }));
    }

    fn is_done(&mut self) -> bool {
        if self.done {
            return true;
        }
        let Some(rx) = self.pending.as_mut() else {
            return false;
        };
        match rx.try_recv() {
            Ok(completion) => {
                if let Some(completion) = completion {
                    self.status_line = Some(completion.status_line);
                    self.text = completion.text;
                }
            }
            Err(oneshot::error::TryRecvError::Empty) => return false,
            Err(oneshot::error::TryRecvError::Closed) => {}
        }
        self.pending = None;
        self.task = None;
        self.done = true;
        true
    }

    fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.pending = None;
    }
}

impl Drop for HyperTransport {
    fn drop(&mut self) {
        self.abort();
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn exchange(
    method: HttpMethod,
    url: &str,
    headers: Vec<(String, String)>,
    body: Bytes,
) -> Result<Completion, BoxError> {
    let uri: Uri = url.parse()?;
    if uri.scheme_str() != Some("http") {
        return Err(format!("unsupported url scheme in {}", url).into());
    }
    let host = uri.host().ok_or("url has no host")?;
    let port = uri.port_u16().unwrap_or(80);
    let authority = uri
        .authority()
        .map(|a| a.as_str().to_string())
        .unwrap_or_else(|| host.to_string());

    // IPv6 literals keep their brackets in `host()`.
    let stream = TcpStream::connect((host.trim_matches(|c| c == '[' || c == ']'), port)).await?;
    let io = TokioIo::new(stream);

    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!("HTTP/1.1 connection error: {}", e);
        }
    });

    let method = match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
    };
    let path = uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let mut builder = Request::builder().method(method).uri(path);
    let mut has_host = false;
    for (key, value) in &headers {
        if key.eq_ignore_ascii_case("host") {
            has_host = true;
        }
        builder = builder.header(key.as_str(), value.as_str());
    }
    if !has_host {
        builder = builder.header("Host", authority);
    }
    let request = builder.body(Full::new(body))?;

    let response = sender.send_request(request).await?;
    let status_line = format!("{:?} {}", response.version(), response.status());
    let body = response.collect().await?.to_bytes();

    Ok(Completion {
        status_line,
        text: String::from_utf8_lossy(&body).into_owned(),
    })
}
