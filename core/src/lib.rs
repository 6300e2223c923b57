//! Client SDK for PosAPI, the point-of-sale fiscal receipt service.
//!
//! # Overview
//! Registers and voids fiscal receipts, reads the installation's info and
//! registered bank accounts, and triggers data upload to the tax authority.
//! Every operation is available as a blocking call (over `ureq`) and an
//! async call (over `reqwest`) with identical behavior and errors.
//!
//! # Design
//! - Schemas in `types` are declared with canonical snake_case names; the
//!   vendor's camelCase and irregular spellings come from `alias`.
//! - `pipeline` holds the protocol steps shared by both clients; only the
//!   send in `transport` differs between them.
//! - Each call performs exactly one request. Nothing is retried.
//! - Errors are one enum with five kinds; see `error`.
//!
//! ```no_run
//! use posapi_core::{PosApiClient, Settings};
//!
//! let client = PosApiClient::new(Settings::new("http://localhost:7080"))?;
//! let accounts = client.bank_accounts().read("37900846788", None)?;
//! # Ok::<(), posapi_core::PosApiError>(())
//! ```

pub mod alias;
pub mod client;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod schema;
pub mod settings;
pub mod transport;
pub mod types;

pub use client::PosApiClient;
pub use error::{PosApiError, Result, Stage, ValidationDefect};
pub use http::{Envelope, HttpMethod, HttpRequest, HttpResponse};
pub use pipeline::Payload;
pub use settings::{Settings, SettingsError};
pub use transport::{
    AsyncTransport, BlockingTransport, ReqwestTransport, UreqTransport, MAX_BODY_BYTES,
};
pub use types::*;
