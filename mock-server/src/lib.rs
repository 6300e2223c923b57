//! In-memory stand-in for a PosAPI installation.
//!
//! Serves the five endpoints the SDK talks to with the vendor's wire shapes,
//! including its irregular field names and its `{status, message, date}`
//! error bodies. Receipts live in memory for the lifetime of the router.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};

pub const WIRE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Merchant registered on the mock installation.
pub const MERCHANT_TIN: &str = "37900846788";
pub const OTHER_MERCHANT_TIN: &str = "61200064714";

// --- wire types ---

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubReceipt {
    pub total_amount: f64,
    pub tax_type: String,
    pub merchant_tin: String,
    pub items: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account_no: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceipt {
    pub branch_no: String,
    pub total_amount: f64,
    pub merchant_tin: String,
    pub pos_no: String,
    #[serde(rename = "type")]
    pub receipt_type: String,
    pub bill_id_suffix: String,
    pub receipts: Vec<SubReceipt>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteReceipt {
    pub id: String,
    pub date: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub receipt_type: Option<String>,
}

/// `/rest/receipt` creates when the body has `receipts`, deletes otherwise.
enum ReceiptCommand {
    Create(CreateReceipt),
    Delete(DeleteReceipt),
}

impl ReceiptCommand {
    // Dispatched by hand: untagged enums buffer numbers in a way
    // `arbitrary_precision` cannot read back into `f64` fields.
    fn parse(body: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(body)?;
        if value.get("receipts").is_some() {
            serde_json::from_value(value).map(Self::Create)
        } else {
            serde_json::from_value(value).map(Self::Delete)
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItemResult {
    pub id: String,
    pub bank_account_id: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceiptResult {
    pub id: String,
    pub pos_id: i64,
    pub status: String,
    pub message: String,
    pub qr_date: String,
    pub lottery: String,
    pub date: String,
    pub easy: bool,
    pub receipts: Vec<ReceiptItemResult>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteReceiptResult {
    pub status: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub id: i64,
    pub tin: String,
    pub bank_account_no: String,
    pub bank_account_name: String,
    pub bank_id: i64,
    pub bank_name: String,
    #[serde(rename = "iBan")]
    pub iban: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    pub tin: String,
    pub vat_payer: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    pub name: String,
    pub tin: String,
    pub vat_payer: bool,
    pub customers: Vec<Customer>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub application_dir: String,
    pub current_dir: String,
    pub database: String,
    #[serde(rename = "database-host")]
    pub database_host: String,
    #[serde(rename = "supported-databases")]
    pub supported_databases: Vec<String>,
    pub work_dir: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    pub operator_name: String,
    #[serde(rename = "operatorTIN")]
    pub operator_tin: String,
    pub pos_id: i64,
    pub pos_no: String,
    pub version: String,
    pub last_sent_date: String,
    pub left_lotteries: i64,
    pub app_info: AppInfo,
    pub merchants: Vec<Merchant>,
}

/// Vendor error body, returned with a non-2xx status.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VendorError {
    pub status: String,
    pub message: String,
    pub date: String,
}

struct Failure(StatusCode, String);

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        warn!(status = %self.0, message = %self.1, "rejecting request");
        let body = VendorError {
            status: "ERROR".to_string(),
            message: self.1,
            date: now(),
        };
        (self.0, Json(body)).into_response()
    }
}

// --- state ---

#[derive(Clone, Debug)]
struct StoredReceipt {
    date: String,
    sub_receipts: usize,
}

#[derive(Default)]
pub struct PosState {
    receipts: RwLock<HashMap<String, StoredReceipt>>,
    last_sent_date: RwLock<Option<String>>,
    next_id: AtomicU64,
}

pub type Db = Arc<PosState>;

pub fn app() -> Router {
    let db: Db = Arc::new(PosState::default());
    Router::new()
        .route("/rest/receipt", post(receipt))
        .route("/rest/info", get(read_info))
        .route("/rest/bankAccounts", get(bank_accounts))
        .route("/rest/sendData", get(send_data))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn now() -> String {
    Local::now().naive_local().format(WIRE_DATETIME_FORMAT).to_string()
}

fn batch_id(sequence: u64) -> String {
    format!("{sequence:033}")
}

fn registered_accounts() -> Vec<BankAccount> {
    vec![
        BankAccount {
            id: 302195,
            tin: MERCHANT_TIN.to_string(),
            bank_account_no: "4990037827".to_string(),
            bank_account_name: "ТЕСТИЙН ХЭРЭГЛЭГЧ 1".to_string(),
            bank_id: 5,
            bank_name: "Хаан банк".to_string(),
            iban: "MN100005004990037827".to_string(),
        },
        BankAccount {
            id: 302196,
            tin: MERCHANT_TIN.to_string(),
            bank_account_no: "1102046833".to_string(),
            bank_account_name: "ТЕСТИЙН ХЭРЭГЛЭГЧ 1".to_string(),
            bank_id: 4,
            bank_name: "Голомт банк".to_string(),
            iban: String::new(),
        },
        BankAccount {
            id: 302300,
            tin: OTHER_MERCHANT_TIN.to_string(),
            bank_account_no: "5020011122".to_string(),
            bank_account_name: "ТТҮГ-тест".to_string(),
            bank_id: 4,
            bank_name: "Голомт банк".to_string(),
            iban: String::new(),
        },
    ]
}

fn merchants() -> Vec<Merchant> {
    vec![
        Merchant {
            name: "ТЕСТИЙН ХЭРЭГЛЭГЧ 1".to_string(),
            tin: MERCHANT_TIN.to_string(),
            vat_payer: true,
            customers: vec![
                Customer {
                    name: "ТЕСТИЙН ХЭРЭГЛЭГЧ 1".to_string(),
                    tin: MERCHANT_TIN.to_string(),
                    vat_payer: true,
                },
                Customer {
                    name: "ЭЦСИЙН ХЭРЭГЛЭГЧ".to_string(),
                    tin: "30000000000".to_string(),
                    vat_payer: false,
                },
            ],
        },
        Merchant {
            name: "ТТҮГ-тест".to_string(),
            tin: OTHER_MERCHANT_TIN.to_string(),
            vat_payer: true,
            customers: vec![Customer {
                name: "ТТҮГ-тест".to_string(),
                tin: OTHER_MERCHANT_TIN.to_string(),
                vat_payer: true,
            }],
        },
    ]
}

fn is_registered(tin: &str) -> bool {
    merchants().iter().any(|m| m.tin == tin)
}

// --- handlers ---

async fn receipt(State(db): State<Db>, body: String) -> Result<Response, Failure> {
    let command = ReceiptCommand::parse(&body)
        .map_err(|e| Failure(StatusCode::BAD_REQUEST, format!("invalid receipt body: {e}")))?;
    match command {
        ReceiptCommand::Create(input) => create_receipt(db, input).await.map(IntoResponse::into_response),
        ReceiptCommand::Delete(input) => delete_receipt(db, input).await.map(IntoResponse::into_response),
    }
}

async fn create_receipt(db: Db, input: CreateReceipt) -> Result<Json<CreateReceiptResult>, Failure> {
    if input.receipts.is_empty() {
        return Err(Failure(StatusCode::BAD_REQUEST, "receipts must not be empty".to_string()));
    }
    if !is_registered(&input.merchant_tin) {
        return Err(Failure(
            StatusCode::BAD_REQUEST,
            format!("merchantTin {} is not registered", input.merchant_tin),
        ));
    }
    if let Some(sub) = input.receipts.iter().find(|r| r.items.is_empty()) {
        return Err(Failure(
            StatusCode::BAD_REQUEST,
            format!("receipt for {} has no items", sub.merchant_tin),
        ));
    }

    let accounts = registered_accounts();
    let sequence = db.next_id.fetch_add(1, Ordering::Relaxed) + 1;
    let id = batch_id(sequence);
    let date = now();

    let receipts = input
        .receipts
        .iter()
        .enumerate()
        .map(|(index, sub)| ReceiptItemResult {
            id: format!("{id}{index:02}"),
            bank_account_id: sub
                .bank_account_no
                .as_deref()
                .and_then(|no| accounts.iter().find(|a| a.bank_account_no == no))
                .map(|a| a.id)
                .unwrap_or(0),
        })
        .collect();

    db.receipts.write().await.insert(
        id.clone(),
        StoredReceipt {
            date: date.clone(),
            sub_receipts: input.receipts.len(),
        },
    );
    info!(id = %id, receipts = input.receipts.len(), "receipt registered");

    let lottery = if input.receipt_type.starts_with("B2C") {
        format!("AA {:08}", sequence)
    } else {
        String::new()
    };

    Ok(Json(CreateReceiptResult {
        id,
        pos_id: 101321077,
        status: "SUCCESS".to_string(),
        message: String::new(),
        qr_date: format!("{sequence}{}", input.bill_id_suffix),
        lottery,
        date,
        easy: false,
        receipts,
    }))
}

async fn delete_receipt(db: Db, input: DeleteReceipt) -> Result<Json<DeleteReceiptResult>, Failure> {
    NaiveDateTime::parse_from_str(&input.date, WIRE_DATETIME_FORMAT).map_err(|_| {
        Failure(
            StatusCode::BAD_REQUEST,
            format!("date '{}' is not in YYYY-MM-DD HH:MM:SS format", input.date),
        )
    })?;

    let mut receipts = db.receipts.write().await;
    let stored = receipts
        .get(&input.id)
        .ok_or_else(|| Failure(StatusCode::NOT_FOUND, format!("receipt {} not found", input.id)))?;
    if stored.date != input.date {
        return Err(Failure(
            StatusCode::BAD_REQUEST,
            format!("receipt {} was not registered at {}", input.id, input.date),
        ));
    }
    let stored = receipts.remove(&input.id);
    info!(
        id = %input.id,
        sub_receipts = stored.map(|s| s.sub_receipts).unwrap_or(0),
        "receipt deleted"
    );

    Ok(Json(DeleteReceiptResult {
        status: "SUCCESS".to_string(),
        message: String::new(),
    }))
}

async fn read_info(State(db): State<Db>) -> Json<Info> {
    let last_sent_date = db
        .last_sent_date
        .read()
        .await
        .clone()
        .unwrap_or_else(|| "2026-01-28 15:03:27".to_string());
    let used = db.next_id.load(Ordering::Relaxed) as i64;

    Json(Info {
        operator_name: "TEST OPERATOR 1".to_string(),
        operator_tin: MERCHANT_TIN.to_string(),
        pos_id: 101321077,
        pos_no: "10012619".to_string(),
        version: "3.2.35".to_string(),
        last_sent_date,
        left_lotteries: 20000 - used,
        app_info: AppInfo {
            application_dir: "/opt/posapi".to_string(),
            current_dir: "/opt/posapi".to_string(),
            database: "QSQLITE".to_string(),
            database_host: "127.0.0.1".to_string(),
            supported_databases: vec!["QSQLITE".to_string(), "QPSQL".to_string()],
            work_dir: "/opt/posapi/work".to_string(),
        },
        merchants: merchants(),
    })
}

#[derive(Deserialize)]
struct BankAccountsQuery {
    tin: Option<String>,
}

async fn bank_accounts(Query(query): Query<BankAccountsQuery>) -> Result<Json<Vec<BankAccount>>, Failure> {
    let tin = query
        .tin
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| Failure(StatusCode::BAD_REQUEST, "tin is required".to_string()))?;
    let accounts = registered_accounts()
        .into_iter()
        .filter(|a| a.tin == tin)
        .collect();
    Ok(Json(accounts))
}

/// Marks everything as sent; the vendor answers with an empty 200.
async fn send_data(State(db): State<Db>) -> StatusCode {
    *db.last_sent_date.write().await = Some(now());
    info!("data sent");
    StatusCode::OK
}
