//! Blocking and non-blocking senders with identical behavior.
//!
//! # Design
//! A transport performs exactly one round-trip per call and returns an
//! `Envelope` for every response it receives, whatever the status code.
//! Only failures that leave no response (refused connection, DNS, TLS,
//! timeout, a body cut off mid-read) become `PosApiError::Transport`.
//! Nothing here retries or interprets statuses.
//!
//! Both transports read the body as raw bytes, capped at
//! [`MAX_BODY_BYTES`], and hand them to one decoder. Bytes that are not
//! valid UTF-8 are replaced rather than rejected, so a mislabelled charset
//! reaches the pipeline the same way on either path.
//!
//! Each transport either owns its HTTP client (built from `Settings`) or
//! borrows one the caller supplied. `close` drops an owned client's pool;
//! a borrowed client stays usable.

use std::io::Read;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{PosApiError, Result};
use crate::http::{Envelope, Headers, HttpMethod, HttpRequest, HttpResponse};
use crate::settings::Settings;

pub trait BlockingTransport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<Envelope>;

    /// Release owned connections. Calling it twice is a no-op.
    fn close(&mut self) {}
}

#[async_trait]
pub trait AsyncTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<Envelope>;

    fn close(&mut self) {}
}

/// Largest response body a transport will buffer.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// A response as read off the socket, before the body is decoded.
struct RawResponse {
    status: u16,
    headers: Headers,
    body: Vec<u8>,
}

fn header_pairs<'a, I, V>(headers: I) -> Headers
where
    I: Iterator<Item = (&'a str, V)>,
    V: AsRef<[u8]>,
{
    headers
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_ref()).into_owned(),
            )
        })
        .collect()
}

/// Enforce the size cap and decode the body. Shared by both transports.
fn decode_response(request: &HttpRequest, raw: RawResponse) -> Result<HttpResponse> {
    if raw.body.len() > MAX_BODY_BYTES {
        warn!(method = %request.method, url = %request.url, "response body too large");
        return Err(PosApiError::transport(
            format!(
                "{} {}: response body exceeds {MAX_BODY_BYTES} bytes",
                request.method, request.url
            ),
            Some(request),
            "response body too large",
        ));
    }
    let body = match String::from_utf8(raw.body) {
        Ok(body) => body,
        Err(e) => {
            warn!(method = %request.method, url = %request.url, "response body is not valid UTF-8");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    Ok(HttpResponse {
        status: raw.status,
        headers: raw.headers,
        body,
    })
}

fn closed_error(request: &HttpRequest) -> PosApiError {
    PosApiError::transport(
        format!("{} {}: client is closed", request.method, request.url),
        Some(request),
        "transport closed",
    )
}

fn log_response(request: &HttpRequest, response: &HttpResponse) {
    debug!(
        method = %request.method,
        url = %request.url,
        status = response.status,
        body_len = response.body.len(),
        "received response"
    );
}

// ---------------------------------------------------------------------------
// Blocking: ureq
// ---------------------------------------------------------------------------

/// Blocking transport over a `ureq::Agent`.
pub struct UreqTransport {
    agent: Option<ureq::Agent>,
    owned: bool,
}

impl UreqTransport {
    pub fn new(settings: &Settings) -> Self {
        let mut config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(settings.timeout()));
        if !settings.verify_tls() {
            config = config.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }
        Self {
            agent: Some(config.build().new_agent()),
            owned: true,
        }
    }

    /// Wrap a caller-owned agent. It must be configured with
    /// `http_status_as_error(false)` so error statuses come back as data.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self {
            agent: Some(agent),
            owned: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.agent.is_none()
    }

    fn call(agent: &ureq::Agent, request: &HttpRequest) -> std::result::Result<RawResponse, ureq::Error> {
        let url = request.url.as_str();
        let body = request.body.as_deref();

        let mut response = match request.method {
            HttpMethod::Get => with_headers(agent.get(url), &request.headers).call(),
            HttpMethod::Delete => with_headers(agent.delete(url), &request.headers).call(),
            HttpMethod::Post => {
                let builder = with_headers(agent.post(url), &request.headers);
                match body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
            HttpMethod::Put => {
                let builder = with_headers(agent.put(url), &request.headers);
                match body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        }?;

        let status = response.status().as_u16();
        let headers = header_pairs(
            response
                .headers()
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_bytes())),
        );
        // One byte past the cap is enough to tell an oversized body apart.
        let mut body = Vec::new();
        response
            .body_mut()
            .as_reader()
            .take(MAX_BODY_BYTES as u64 + 1)
            .read_to_end(&mut body)?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &Headers) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl BlockingTransport for UreqTransport {
    fn send(&self, request: HttpRequest) -> Result<Envelope> {
        let Some(agent) = &self.agent else {
            return Err(closed_error(&request));
        };

        debug!(method = %request.method, url = %request.url, "sending request");
        match Self::call(agent, &request) {
            Ok(raw) => {
                let response = decode_response(&request, raw)?;
                log_response(&request, &response);
                Ok(Envelope { request, response })
            }
            Err(e) => {
                warn!(method = %request.method, url = %request.url, error = %e, "transport failure");
                Err(PosApiError::transport(
                    format!("{} {}: {e}", request.method, request.url),
                    Some(&request),
                    e,
                ))
            }
        }
    }

    fn close(&mut self) {
        if self.owned {
            self.agent = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Non-blocking: reqwest
// ---------------------------------------------------------------------------

/// Async transport over a `reqwest::Client`.
///
/// Dropping the future returned by `send` aborts the in-flight request.
pub struct ReqwestTransport {
    client: Option<reqwest::Client>,
    owned: bool,
}

impl ReqwestTransport {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .danger_accept_invalid_certs(!settings.verify_tls())
            .build()
            .map_err(|e| PosApiError::transport(format!("cannot build HTTP client: {e}"), None, e))?;
        Ok(Self {
            client: Some(client),
            owned: true,
        })
    }

    /// Wrap a caller-owned client; `close` leaves it untouched.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Some(client),
            owned: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_none()
    }

    async fn call(
        client: &reqwest::Client,
        request: &HttpRequest,
    ) -> std::result::Result<RawResponse, reqwest::Error> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let mut response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = header_pairs(
            response
                .headers()
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_bytes())),
        );
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() > MAX_BODY_BYTES {
                break;
            }
        }

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl AsyncTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<Envelope> {
        let Some(client) = &self.client else {
            return Err(closed_error(&request));
        };

        debug!(method = %request.method, url = %request.url, "sending request");
        match Self::call(client, &request).await {
            Ok(raw) => {
                let response = decode_response(&request, raw)?;
                log_response(&request, &response);
                Ok(Envelope { request, response })
            }
            Err(e) => {
                warn!(method = %request.method, url = %request.url, error = %e, "transport failure");
                Err(PosApiError::transport(
                    format!("{} {}: {e}", request.method, request.url),
                    Some(&request),
                    e,
                ))
            }
        }
    }

    fn close(&mut self) {
        if self.owned {
            self.client = None;
        }
    }
}
