//! Error types for the PosAPI client.
//!
//! # Design
//! One enum, five kinds, checked in this order when several could apply:
//! `Transport` (no response), `Http` (non-2xx), `Decode` (body is not JSON),
//! `Validation` (payload does not match its schema), `Business` (a 2xx
//! payload reporting a domain failure, raised only on request through
//! `ensure_success`). Every kind keeps whatever part of the envelope existed
//! when it was raised.

use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::http::{Envelope, HttpRequest};

pub type Result<T> = std::result::Result<T, PosApiError>;

/// Boxed low-level cause from the HTTP client library.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum PosApiError {
    /// The request never reached the server or no response came back.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        request: Option<Box<HttpRequest>>,
        #[source]
        source: BoxError,
    },

    /// The server answered with a status outside `[200, 300)`.
    #[error("HTTP {status_code}: {message}")]
    Http {
        status_code: u16,
        /// Vendor `status` field when the error body could be decoded.
        vendor_status: Option<String>,
        message: String,
        date: Option<NaiveDateTime>,
        envelope: Box<Envelope>,
    },

    /// A 2xx body that is not valid JSON.
    #[error("invalid JSON in response body: {source}")]
    Decode {
        envelope: Box<Envelope>,
        #[source]
        source: serde_json::Error,
    },

    #[error("validation failed during {stage} for model '{model}'{}", render_defects(.defects))]
    Validation {
        stage: Stage,
        model: &'static str,
        defects: Vec<ValidationDefect>,
        /// Present for response-stage failures only.
        envelope: Option<Box<Envelope>>,
    },

    #[error("business error: {message}")]
    Business {
        status: Option<String>,
        message: String,
    },
}

impl PosApiError {
    pub(crate) fn transport(
        message: impl Into<String>,
        request: Option<&HttpRequest>,
        source: impl Into<BoxError>,
    ) -> Self {
        PosApiError::Transport {
            message: message.into(),
            request: request.map(|r| Box::new(r.clone())),
            source: source.into(),
        }
    }

    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            PosApiError::Http { envelope, .. } | PosApiError::Decode { envelope, .. } => {
                Some(envelope.as_ref())
            }
            PosApiError::Validation { envelope, .. } => envelope.as_deref(),
            PosApiError::Transport { .. } | PosApiError::Business { .. } => None,
        }
    }

    /// The outbound request, when one was built before the failure.
    pub fn request(&self) -> Option<&HttpRequest> {
        match self {
            PosApiError::Transport { request, .. } => request.as_deref(),
            _ => self.envelope().map(|e| &e.request),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.envelope().map(|e| e.response.status)
    }

    pub fn defects(&self) -> &[ValidationDefect] {
        match self {
            PosApiError::Validation { defects, .. } => defects,
            _ => &[],
        }
    }
}

/// Which side of the call failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Request,
    Response,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Request => f.write_str("request"),
            Stage::Response => f.write_str("response"),
        }
    }
}

/// One segment of a defect location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocSegment {
    Field(String),
    Index(usize),
}

impl fmt::Display for LocSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocSegment::Field(name) => f.write_str(name),
            LocSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefectKind {
    Missing,
    StringType,
    IntType,
    NumberType,
    DecimalParse,
    BoolType,
    DateTimeParse,
    ObjectType,
    ListType,
}

impl DefectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DefectKind::Missing => "missing",
            DefectKind::StringType => "string_type",
            DefectKind::IntType => "int_type",
            DefectKind::NumberType => "number_type",
            DefectKind::DecimalParse => "decimal_parsing",
            DefectKind::BoolType => "bool_type",
            DefectKind::DateTimeParse => "datetime_parsing",
            DefectKind::ObjectType => "object_type",
            DefectKind::ListType => "list_type",
        }
    }
}

/// A single field-scoped schema violation.
///
/// `loc` uses canonical field names, so a defect reads the same whichever
/// key spelling the payload used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDefect {
    pub loc: Vec<LocSegment>,
    pub message: String,
    pub kind: DefectKind,
}

impl ValidationDefect {
    pub fn new(loc: Vec<LocSegment>, kind: DefectKind, message: impl Into<String>) -> Self {
        Self {
            loc,
            message: message.into(),
            kind,
        }
    }

    /// Dotted path, e.g. `receipts.0.items.1.qty`.
    pub fn path(&self) -> String {
        self.loc
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for ValidationDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.path(), self.message, self.kind.as_str())
    }
}

fn render_defects(defects: &[ValidationDefect]) -> String {
    defects.iter().map(|d| format!("\n  - {d}")).collect()
}
