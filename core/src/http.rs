//! HTTP envelope types shared by both transports.
//!
//! # Design
//! Requests and responses are plain data. The pipeline builds an
//! `HttpRequest`, a transport turns it into an `Envelope` by performing the
//! single network round-trip, and the pipeline interprets the envelope. No
//! status interpretation happens here.
//!
//! All fields use owned types so envelopes can be attached to errors and
//! outlive the call that produced them.

use std::fmt;

/// Ordered header list. Names compare case-insensitively on merge.
pub type Headers = Vec<(String, String)>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound request described as plain data.
///
/// `url` is absolute; the pipeline joins the configured base URL with the
/// operation path and query before handing the request to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A received response, whatever its status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// A 204 or a blank body carries no payload.
    pub fn is_empty(&self) -> bool {
        self.status == 204 || self.body.trim().is_empty()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// The request that was sent paired with the response that came back.
///
/// Created fresh for every call and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub request: HttpRequest,
    pub response: HttpResponse,
}

/// Merge header layers in order; a later layer overrides an earlier one.
///
/// Names are matched case-insensitively and an overridden header keeps the
/// position of its first occurrence.
pub fn merge_headers<'a, I>(layers: I) -> Headers
where
    I: IntoIterator<Item = Option<&'a [(String, String)]>>,
{
    let mut merged: Headers = Vec::new();
    for layer in layers.into_iter().flatten() {
        for (name, value) in layer {
            match merged
                .iter_mut()
                .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            {
                Some(slot) => slot.1 = value.clone(),
                None => merged.push((name.clone(), value.clone())),
            }
        }
    }
    merged
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
