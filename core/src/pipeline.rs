//! The request/response pipeline shared by every operation.
//!
//! # Design
//! One operation is: normalize the payload, build the request, send it,
//! check the status, decode the body, validate the decoded value. Only the
//! send step differs between the blocking and async clients, so the
//! pipeline exposes the steps on either side of it and the resources call
//! their transport in between:
//!
//! ```text
//! prepare / prepare_with_body -> transport.send -> read_* (status, decode, validate)
//! ```
//!
//! Nothing in here performs I/O or retries.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{PosApiError, Result, Stage};
use crate::http::{merge_headers, Envelope, Headers, HttpMethod, HttpRequest};
use crate::schema::{parse_timestamp, FromWire, Schema};

const JSON: &str = "application/json";

/// A request payload: either an already-typed value or raw JSON that still
/// has to pass schema validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    Typed(T),
    Raw(Value),
}

impl<T> From<T> for Payload<T> {
    fn from(value: T) -> Self {
        Payload::Typed(value)
    }
}

impl<T: Schema> Payload<T> {
    /// Resolve to a typed value; raw input is validated against `T`.
    pub fn normalize(self) -> Result<T> {
        match self {
            Payload::Typed(value) => Ok(value),
            Payload::Raw(raw) => T::validate(&raw).map_err(|defects| {
                debug!(model = T::NAME, defects = defects.len(), "request payload rejected");
                PosApiError::Validation {
                    stage: Stage::Request,
                    model: T::NAME,
                    defects,
                    envelope: None,
                }
            }),
        }
    }
}

/// Request construction and response interpretation for one client.
#[derive(Debug, Clone)]
pub struct Pipeline {
    base_url: String,
    default_headers: Headers,
    client_headers: Headers,
}

impl Pipeline {
    pub fn new(base_url: impl Into<String>, default_headers: Headers, client_headers: Headers) -> Self {
        Self {
            base_url: base_url.into(),
            default_headers,
            client_headers,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a body-less request.
    pub fn prepare(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(&str, &str)],
        headers: Option<&[(String, String)]>,
    ) -> Result<HttpRequest> {
        self.build(method, path, query, headers, None)
    }

    /// Normalize `payload` and build a request carrying it as wire JSON.
    pub fn prepare_with_body<T: Schema>(
        &self,
        method: HttpMethod,
        path: &str,
        payload: Payload<T>,
        headers: Option<&[(String, String)]>,
    ) -> Result<HttpRequest> {
        let typed = payload.normalize()?;
        let body = typed.serialize().to_string();
        self.build(method, path, &[], headers, Some(body))
    }

    fn build(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(&str, &str)],
        headers: Option<&[(String, String)]>,
        body: Option<String>,
    ) -> Result<HttpRequest> {
        let raw = format!("{}{}", self.base_url, path);
        let mut url = url::Url::parse(&raw)
            .map_err(|e| PosApiError::transport(format!("invalid URL '{raw}': {e}"), None, e))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().copied());
        }

        let mut baseline: Headers = vec![("Accept".to_string(), JSON.to_string())];
        if body.is_some() {
            baseline.push(("Content-Type".to_string(), JSON.to_string()));
        }
        let headers = merge_headers([
            Some(baseline.as_slice()),
            Some(self.default_headers.as_slice()),
            Some(self.client_headers.as_slice()),
            headers,
        ]);

        Ok(HttpRequest {
            method,
            url: url.to_string(),
            headers,
            body,
        })
    }

    /// Expect a single `T` in the body.
    pub fn read_one<T: Schema>(&self, envelope: Envelope) -> Result<T> {
        let envelope = check_status(envelope)?;
        let value = decode(&envelope)?;
        T::validate(&value).map_err(|defects| response_error(T::NAME, defects, envelope))
    }

    /// Like `read_one`, but an empty 2xx body yields `T::default()`.
    pub fn read_one_or_default<T: Schema + Default>(&self, envelope: Envelope) -> Result<T> {
        let envelope = check_status(envelope)?;
        if envelope.response.is_empty() {
            return Ok(T::default());
        }
        let value = decode(&envelope)?;
        T::validate(&value).map_err(|defects| response_error(T::NAME, defects, envelope))
    }

    /// Expect a JSON array of `T`.
    pub fn read_list<T: Schema>(&self, envelope: Envelope) -> Result<Vec<T>> {
        let envelope = check_status(envelope)?;
        let value = decode(&envelope)?;
        Vec::<T>::from_wire(&value, &[]).map_err(|defects| response_error(T::NAME, defects, envelope))
    }

    /// Expect no payload; any 2xx body is ignored.
    pub fn read_empty(&self, envelope: Envelope) -> Result<()> {
        check_status(envelope).map(|_| ())
    }
}

fn response_error(
    model: &'static str,
    defects: Vec<crate::error::ValidationDefect>,
    envelope: Envelope,
) -> PosApiError {
    debug!(model, defects = defects.len(), "response payload rejected");
    PosApiError::Validation {
        stage: Stage::Response,
        model,
        defects,
        envelope: Some(Box::new(envelope)),
    }
}

/// Pass 2xx envelopes through; anything else becomes `PosApiError::Http`.
fn check_status(envelope: Envelope) -> Result<Envelope> {
    if envelope.response.is_success() {
        return Ok(envelope);
    }
    Err(http_error(envelope))
}

/// 204 and blank bodies decode to `null`.
fn decode(envelope: &Envelope) -> Result<Value> {
    if envelope.response.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&envelope.response.body).map_err(|source| PosApiError::Decode {
        envelope: Box::new(envelope.clone()),
        source,
    })
}

fn http_error(envelope: Envelope) -> PosApiError {
    let status_code = envelope.response.status;
    let body = envelope.response.body.trim();

    let vendor = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(object)) => Some(object),
        _ => {
            debug!(status = status_code, "error body is not a vendor error object");
            None
        }
    };

    let field = |name: &str| vendor.as_ref().and_then(|object| object.get(name));
    let vendor_status = field("status").and_then(text_of);
    let date = field("date").and_then(Value::as_str).and_then(parse_timestamp);
    let message = field("message").and_then(text_of).unwrap_or_else(|| {
        if body.is_empty() {
            format!("{} {} failed", envelope.request.method, envelope.request.url)
        } else {
            body.to_string()
        }
    });

    warn!(
        method = %envelope.request.method,
        url = %envelope.request.url,
        status = status_code,
        vendor_status = vendor_status.as_deref().unwrap_or(""),
        "request failed"
    );

    PosApiError::Http {
        status_code,
        vendor_status,
        message,
        date,
        envelope: Box::new(envelope),
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
