//! The PosAPI client and its resource accessors.
//!
//! # Design
//! `PosApiClient` owns one blocking and one async transport plus the shared
//! `Pipeline`. Resources are thin borrowed views (`client.receipt()`, ...)
//! that supply a path, a request schema and a response expectation; every
//! operation has a blocking form and an `_async` twin that differ only in
//! which transport they call.
//!
//! The client is read-only after construction, so `&PosApiClient` can be
//! shared across threads and tasks.

use crate::error::Result;
use crate::http::{Headers, HttpMethod};
use crate::pipeline::{Payload, Pipeline};
use crate::settings::Settings;
use crate::transport::{AsyncTransport, BlockingTransport, ReqwestTransport, UreqTransport};
use crate::types::{
    BankAccount, CreateReceiptRequest, CreateReceiptResponse, DeleteReceiptRequest,
    DeleteReceiptResponse, ReadInfoResponse,
};

const RECEIPT_PATH: &str = "/rest/receipt";
const INFO_PATH: &str = "/rest/info";
const BANK_ACCOUNTS_PATH: &str = "/rest/bankAccounts";
const SEND_DATA_PATH: &str = "/rest/sendData";

/// Call-level headers; they override client and settings headers.
pub type CallHeaders<'h> = Option<&'h [(String, String)]>;

/// Client for a PosAPI installation.
///
/// Connections are released when the client is dropped or `close`d.
pub struct PosApiClient<S = UreqTransport, A = ReqwestTransport> {
    pipeline: Pipeline,
    blocking: S,
    non_blocking: A,
}

impl PosApiClient {
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_headers(settings, Vec::new())
    }

    /// Client whose every request carries `headers` on top of
    /// `Settings::default_headers`.
    pub fn with_headers(settings: Settings, headers: Headers) -> Result<Self> {
        let blocking = UreqTransport::new(&settings);
        let non_blocking = ReqwestTransport::new(&settings)?;
        Ok(Self::with_transports(&settings, headers, blocking, non_blocking))
    }
}

impl<S: BlockingTransport, A: AsyncTransport> PosApiClient<S, A> {
    /// Assemble a client around caller-supplied transports.
    pub fn with_transports(settings: &Settings, headers: Headers, blocking: S, non_blocking: A) -> Self {
        Self {
            pipeline: Pipeline::new(
                settings.base_url(),
                settings.default_headers().to_vec(),
                headers,
            ),
            blocking,
            non_blocking,
        }
    }

    pub fn base_url(&self) -> &str {
        self.pipeline.base_url()
    }

    /// Release owned connections on both transports. Safe to call again.
    pub fn close(&mut self) {
        self.blocking.close();
        self.non_blocking.close();
    }

    pub fn receipt(&self) -> ReceiptResource<'_, S, A> {
        ReceiptResource { client: self }
    }

    pub fn info(&self) -> InfoResource<'_, S, A> {
        InfoResource { client: self }
    }

    pub fn bank_accounts(&self) -> BankAccountsResource<'_, S, A> {
        BankAccountsResource { client: self }
    }

    pub fn send_data(&self) -> SendDataResource<'_, S, A> {
        SendDataResource { client: self }
    }
}

/// `POST /rest/receipt`: register or void receipts.
pub struct ReceiptResource<'c, S, A> {
    client: &'c PosApiClient<S, A>,
}

impl<S: BlockingTransport, A: AsyncTransport> ReceiptResource<'_, S, A> {
    /// Register a batch of receipts.
    ///
    /// A well-formed `ERROR` response is returned as-is; chain
    /// [`CreateReceiptResponse::ensure_success`] to turn it into an error.
    pub fn create(
        &self,
        payload: impl Into<Payload<CreateReceiptRequest>>,
        headers: CallHeaders<'_>,
    ) -> Result<CreateReceiptResponse> {
        let pipeline = &self.client.pipeline;
        let request = pipeline.prepare_with_body(HttpMethod::Post, RECEIPT_PATH, payload.into(), headers)?;
        let envelope = self.client.blocking.send(request)?;
        pipeline.read_one(envelope)
    }

    pub async fn create_async(
        &self,
        payload: impl Into<Payload<CreateReceiptRequest>>,
        headers: CallHeaders<'_>,
    ) -> Result<CreateReceiptResponse> {
        let pipeline = &self.client.pipeline;
        let request = pipeline.prepare_with_body(HttpMethod::Post, RECEIPT_PATH, payload.into(), headers)?;
        let envelope = self.client.non_blocking.send(request).await?;
        pipeline.read_one(envelope)
    }

    /// Void a registered receipt. An empty 2xx body reads as a default
    /// (status-less) response.
    pub fn delete(
        &self,
        payload: impl Into<Payload<DeleteReceiptRequest>>,
        headers: CallHeaders<'_>,
    ) -> Result<DeleteReceiptResponse> {
        let pipeline = &self.client.pipeline;
        let request = pipeline.prepare_with_body(HttpMethod::Post, RECEIPT_PATH, payload.into(), headers)?;
        let envelope = self.client.blocking.send(request)?;
        pipeline.read_one_or_default(envelope)
    }

    pub async fn delete_async(
        &self,
        payload: impl Into<Payload<DeleteReceiptRequest>>,
        headers: CallHeaders<'_>,
    ) -> Result<DeleteReceiptResponse> {
        let pipeline = &self.client.pipeline;
        let request = pipeline.prepare_with_body(HttpMethod::Post, RECEIPT_PATH, payload.into(), headers)?;
        let envelope = self.client.non_blocking.send(request).await?;
        pipeline.read_one_or_default(envelope)
    }
}

/// `GET /rest/info`
pub struct InfoResource<'c, S, A> {
    client: &'c PosApiClient<S, A>,
}

impl<S: BlockingTransport, A: AsyncTransport> InfoResource<'_, S, A> {
    pub fn read(&self, headers: CallHeaders<'_>) -> Result<ReadInfoResponse> {
        let pipeline = &self.client.pipeline;
        let request = pipeline.prepare(HttpMethod::Get, INFO_PATH, &[], headers)?;
        let envelope = self.client.blocking.send(request)?;
        pipeline.read_one(envelope)
    }

    pub async fn read_async(&self, headers: CallHeaders<'_>) -> Result<ReadInfoResponse> {
        let pipeline = &self.client.pipeline;
        let request = pipeline.prepare(HttpMethod::Get, INFO_PATH, &[], headers)?;
        let envelope = self.client.non_blocking.send(request).await?;
        pipeline.read_one(envelope)
    }
}

/// `GET /rest/bankAccounts?tin=...`
pub struct BankAccountsResource<'c, S, A> {
    client: &'c PosApiClient<S, A>,
}

impl<S: BlockingTransport, A: AsyncTransport> BankAccountsResource<'_, S, A> {
    /// Bank accounts registered for the taxpayer `tin`.
    pub fn read(&self, tin: &str, headers: CallHeaders<'_>) -> Result<Vec<BankAccount>> {
        let pipeline = &self.client.pipeline;
        let request = pipeline.prepare(HttpMethod::Get, BANK_ACCOUNTS_PATH, &[("tin", tin)], headers)?;
        let envelope = self.client.blocking.send(request)?;
        pipeline.read_list(envelope)
    }

    pub async fn read_async(&self, tin: &str, headers: CallHeaders<'_>) -> Result<Vec<BankAccount>> {
        let pipeline = &self.client.pipeline;
        let request = pipeline.prepare(HttpMethod::Get, BANK_ACCOUNTS_PATH, &[("tin", tin)], headers)?;
        let envelope = self.client.non_blocking.send(request).await?;
        pipeline.read_list(envelope)
    }
}

/// `GET /rest/sendData`: push stored receipts to the tax authority now.
pub struct SendDataResource<'c, S, A> {
    client: &'c PosApiClient<S, A>,
}

impl<S: BlockingTransport, A: AsyncTransport> SendDataResource<'_, S, A> {
    pub fn send(&self, headers: CallHeaders<'_>) -> Result<()> {
        let pipeline = &self.client.pipeline;
        let request = pipeline.prepare(HttpMethod::Get, SEND_DATA_PATH, &[], headers)?;
        let envelope = self.client.blocking.send(request)?;
        pipeline.read_empty(envelope)
    }

    pub async fn send_async(&self, headers: CallHeaders<'_>) -> Result<()> {
        let pipeline = &self.client.pipeline;
        let request = pipeline.prepare(HttpMethod::Get, SEND_DATA_PATH, &[], headers)?;
        let envelope = self.client.non_blocking.send(request).await?;
        pipeline.read_empty(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;

    use crate::error::{PosApiError, Stage};
    use crate::http::{Envelope, HttpRequest, HttpResponse};
    use crate::types::ReceiptCreateStatus;

    /// Answers every request with the same canned response and records
    /// what it was sent.
    struct Scripted {
        status: u16,
        body: String,
        sent: Mutex<Vec<HttpRequest>>,
        closed: bool,
    }

    impl Scripted {
        fn new(status: u16, body: impl Into<String>) -> Self {
            Self {
                status,
                body: body.into(),
                sent: Mutex::new(Vec::new()),
                closed: false,
            }
        }

        fn reply(&self, request: HttpRequest) -> Result<Envelope> {
            self.sent.lock().unwrap().push(request.clone());
            Ok(Envelope {
                request,
                response: HttpResponse {
                    status: self.status,
                    headers: Vec::new(),
                    body: self.body.clone(),
                },
            })
        }

        fn last(&self) -> HttpRequest {
            self.sent.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl BlockingTransport for Scripted {
        fn send(&self, request: HttpRequest) -> Result<Envelope> {
            self.reply(request)
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    #[async_trait]
    impl AsyncTransport for Scripted {
        async fn send(&self, request: HttpRequest) -> Result<Envelope> {
            self.reply(request)
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    fn client(status: u16, body: &str) -> PosApiClient<Scripted, Scripted> {
        let settings = Settings::new("http://pos.local:7080/")
            .with_default_headers(vec![("X-Api-Key".to_string(), "k".to_string())]);
        PosApiClient::with_transports(
            &settings,
            vec![("X-Terminal".to_string(), "T1".to_string())],
            Scripted::new(status, body),
            Scripted::new(status, body),
        )
    }

    fn receipt_success() -> String {
        json!({
            "status": "SUCCESS",
            "id": "1".repeat(33),
            "posId": 1,
            "message": "",
            "qrDate": "",
            "lottery": "",
            "date": "2026-02-12 15:31:42",
            "easy": false,
            "receipts": [{"id": "sub1", "bankAccountId": 10}]
        })
        .to_string()
    }

    fn create_payload() -> Payload<CreateReceiptRequest> {
        Payload::Raw(json!({
            "branchNo": "001",
            "totalAmount": 1000,
            "merchantTin": "37900846788",
            "posNo": "10001",
            "type": "B2C_RECEIPT",
            "billIdSuffix": "01",
            "receipts": [{
                "totalAmount": 1000,
                "taxType": "VAT_ABLE",
                "merchantTin": "37900846788",
                "items": [{
                    "name": "Tea",
                    "barCode": "4840000000001",
                    "measureUnit": "pcs",
                    "qty": 1,
                    "unitPrice": 1000,
                    "totalAmount": 1000
                }]
            }]
        }))
    }

    #[test]
    fn create_receipt_returns_typed_response() {
        let client = client(200, &receipt_success());
        let response = client.receipt().create(create_payload(), None).unwrap();
        assert_eq!(response.status, ReceiptCreateStatus::Success);
        assert_eq!(response.id, "1".repeat(33));
        assert_eq!(response.receipts[0].id, "sub1");

        let sent = client.blocking.last();
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.url, "http://pos.local:7080/rest/receipt");
        assert_eq!(sent.header("X-Api-Key"), Some("k"));
        assert_eq!(sent.header("X-Terminal"), Some("T1"));
    }

    #[tokio::test]
    async fn create_receipt_async_matches_blocking() {
        let client = client(200, &receipt_success());
        let blocking = client.receipt().create(create_payload(), None).unwrap();
        let non_blocking = client.receipt().create_async(create_payload(), None).await.unwrap();
        assert_eq!(blocking, non_blocking);
        assert_eq!(client.blocking.last().body, client.non_blocking.last().body);
    }

    #[test]
    fn invalid_request_is_never_sent() {
        let client = client(200, &receipt_success());
        let err = client
            .receipt()
            .create(Payload::Raw(json!({"branchNo": "001"})), None)
            .unwrap_err();
        assert!(matches!(err, PosApiError::Validation { stage: Stage::Request, .. }));
        assert!(client.blocking.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn garbage_success_body_is_decode_error_on_both_paths() {
        let client = client(200, "Decode error");
        let err = client.receipt().create(create_payload(), None).unwrap_err();
        assert!(matches!(err, PosApiError::Decode { .. }));
        let err = client.receipt().create_async(create_payload(), None).await.unwrap_err();
        assert!(matches!(err, PosApiError::Decode { .. }));
    }

    #[test]
    fn business_error_is_opt_in() {
        let body = json!({
            "status": "ERROR",
            "id": "",
            "posId": 1,
            "message": "lottery exhausted",
            "qrDate": "",
            "lottery": "",
            "date": "2026-02-12 15:31:42",
            "easy": false,
            "receipts": []
        })
        .to_string();
        let client = client(200, &body);

        let response = client.receipt().create(create_payload(), None).unwrap();
        assert_eq!(response.status, ReceiptCreateStatus::Error);

        let err = response.ensure_success().unwrap_err();
        assert!(matches!(err, PosApiError::Business { .. }));
        assert_eq!(err.to_string(), "business error: lottery exhausted");
    }

    #[test]
    fn delete_sends_wire_date_without_fraction() {
        let client = client(200, r#"{"status": "SUCCESS"}"#);
        let date = NaiveDate::from_ymd_opt(2026, 2, 12)
            .unwrap()
            .and_hms_milli_opt(15, 31, 42, 500)
            .unwrap();
        let response = client
            .receipt()
            .delete(DeleteReceiptRequest::new("1".repeat(33), date), None)
            .unwrap();
        assert_eq!(response.status, Some(ReceiptCreateStatus::Success));

        let sent = client.blocking.last();
        let body: serde_json::Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["date"], "2026-02-12 15:31:42");
        assert_eq!(sent.url, "http://pos.local:7080/rest/receipt");
    }

    #[test]
    fn bank_accounts_sends_tin_query() {
        let body = json!([
            {"id": 1, "tin": "37900846788", "bankAccountNo": "1", "bankAccountName": "a",
             "bankId": 0, "bankName": "", "iBan": ""},
            {"id": 2, "tin": "37900846788", "bankAccountNo": "2", "bankAccountName": "b",
             "bankId": 0, "bankName": "", "iBan": ""}
        ])
        .to_string();
        let client = client(200, &body);
        let accounts = client.bank_accounts().read("37900846788", None).unwrap();
        assert_eq!(accounts.len(), 2);
        assert!(accounts.iter().all(|a| a.tin == "37900846788"));
        assert_eq!(
            client.blocking.last().url,
            "http://pos.local:7080/rest/bankAccounts?tin=37900846788"
        );
    }

    #[tokio::test]
    async fn send_data_accepts_empty_body() {
        let client = client(200, "");
        client.send_data().send(None).unwrap();
        client.send_data().send_async(None).await.unwrap();
        let sent = client.non_blocking.last();
        assert_eq!(sent.method, HttpMethod::Get);
        assert_eq!(sent.url, "http://pos.local:7080/rest/sendData");
        assert!(sent.body.is_none());
    }

    #[test]
    fn call_headers_override_client_headers() {
        let client = client(200, "");
        let call = vec![("x-terminal".to_string(), "T2".to_string())];
        client.send_data().send(Some(&call)).unwrap();
        let sent = client.blocking.last();
        assert_eq!(sent.header("X-Terminal"), Some("T2"));
        assert_eq!(sent.header("Accept"), Some("application/json"));
    }

    #[test]
    fn http_error_on_info() {
        let client = client(503, r#"{"status": "ERROR", "message": "database locked"}"#);
        let err = client.info().read(None).unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        assert!(err.to_string().contains("database locked"));
    }

    #[test]
    fn close_reaches_both_transports() {
        let mut client = client(200, "");
        client.close();
        client.close();
        assert!(client.blocking.closed);
        assert!(client.non_blocking.closed);
    }
}
