//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port in a background thread,
//! then drives the client over real HTTP. Blocking tests call the `ureq`
//! path from a plain thread; async tests call the `reqwest` path from a
//! tokio runtime. Both must observe the same results.

use std::io::{Read, Write};
use std::net::SocketAddr;

use chrono::NaiveDate;
use posapi_core::{
    CreateReceiptRequest, DeleteReceiptRequest, Item, Payload, PosApiClient, PosApiError, Receipt,
    ReceiptCreateStatus, ReceiptType, Settings, TaxType,
};
use rust_decimal::Decimal;

const MERCHANT_TIN: &str = "37900846788";

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
    });

    addr
}

/// Serve the same canned response to every connection.
fn start_fixed_server(content_type: &'static str, body: Vec<u8>) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            // The client may hang up early; the next connection still gets served.
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
        }
    });

    addr
}

fn client(addr: SocketAddr) -> PosApiClient {
    PosApiClient::new(Settings::new(format!("http://{addr}"))).unwrap()
}

fn receipt_request(merchant_tin: &str) -> CreateReceiptRequest {
    let amount = Decimal::new(150050, 2);
    let item = Item::new("Tea", "4840000000001", "pcs", Decimal::ONE, amount, amount);
    let mut receipt = Receipt::new(amount, TaxType::VatAble, merchant_tin, vec![item]);
    receipt.bank_account_no = Some("4990037827".to_string());
    CreateReceiptRequest::new(
        "001",
        amount,
        merchant_tin,
        "10012619",
        ReceiptType::B2cReceipt,
        "01",
        vec![receipt],
    )
}

#[test]
fn receipt_lifecycle_blocking() {
    let client = client(start_server());

    let created = client
        .receipt()
        .create(receipt_request(MERCHANT_TIN), None)
        .unwrap()
        .ensure_success()
        .unwrap();
    assert_eq!(created.status, ReceiptCreateStatus::Success);
    assert_eq!(created.id.len(), 33);
    assert_eq!(created.receipts[0].bank_account_id, 302195);

    let deleted = client
        .receipt()
        .delete(DeleteReceiptRequest::new(created.id.clone(), created.date), None)
        .unwrap()
        .ensure_success()
        .unwrap();
    assert_eq!(deleted.status, Some(ReceiptCreateStatus::Success));

    let err = client
        .receipt()
        .delete(DeleteReceiptRequest::new(created.id, created.date), None)
        .unwrap_err();
    match err {
        PosApiError::Http {
            status_code,
            vendor_status,
            message,
            date,
            ..
        } => {
            assert_eq!(status_code, 404);
            assert_eq!(vendor_status.as_deref(), Some("ERROR"));
            assert!(message.contains("not found"));
            assert!(date.is_some());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn receipt_lifecycle_async() {
    let client = client(start_server());

    let created = client
        .receipt()
        .create_async(receipt_request(MERCHANT_TIN), None)
        .await
        .unwrap();
    assert_eq!(created.status, ReceiptCreateStatus::Success);

    let deleted = client
        .receipt()
        .delete_async(DeleteReceiptRequest::new(created.id, created.date), None)
        .await
        .unwrap();
    assert_eq!(deleted.status, Some(ReceiptCreateStatus::Success));
}

#[test]
fn raw_payload_with_wire_names_is_accepted() {
    let client = client(start_server());
    let raw = serde_json::json!({
        "branchNo": "001",
        "totalAmount": "2000.00",
        "merchantTin": MERCHANT_TIN,
        "posNo": "10012619",
        "type": "B2B_RECEIPT",
        "billIdSuffix": "02",
        "customerTin": "61200064714",
        "receipts": [{
            "totalAmount": 2000,
            "taxType": "VAT_ABLE",
            "merchantTin": MERCHANT_TIN,
            "items": [{
                "name": "Paper",
                "barCode": "4840000000002",
                "measureUnit": "pack",
                "qty": 2,
                "unitPrice": 1000,
                "totalAmount": 2000
            }]
        }]
    });

    let created = client.receipt().create(Payload::Raw(raw), None).unwrap();
    assert_eq!(created.status, ReceiptCreateStatus::Success);
    assert!(created.lottery.is_empty());
}

#[test]
fn unregistered_merchant_is_http_error() {
    let client = client(start_server());
    let err = client
        .receipt()
        .create(receipt_request("11111111111"), None)
        .unwrap_err();
    assert_eq!(err.status_code(), Some(400));
    assert!(err.to_string().contains("11111111111"));
    assert!(err.envelope().unwrap().request.body.is_some());
}

#[test]
fn info_reads_irregular_names() {
    let client = client(start_server());
    let info = client.info().read(None).unwrap();
    assert_eq!(info.operator_tin, MERCHANT_TIN);
    assert_eq!(info.app_info.database_host, "127.0.0.1");
    assert!(info.app_info.supported_databases.is_some());
    assert_eq!(info.merchants.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn bank_accounts_both_paths_agree() {
    let client = client(start_server());

    let blocking = tokio::task::block_in_place(|| client.bank_accounts().read(MERCHANT_TIN, None));
    let non_blocking = client.bank_accounts().read_async(MERCHANT_TIN, None).await;

    let accounts = non_blocking.unwrap();
    assert_eq!(accounts.len(), 2);
    assert!(accounts.iter().all(|a| a.tin == MERCHANT_TIN));
    assert_eq!(blocking.unwrap(), accounts);
}

#[tokio::test(flavor = "multi_thread")]
async fn non_utf8_body_reads_the_same_on_both_paths() {
    let mut body = br#"[{"id": 1, "tin": "37900846788", "bankAccountNo": "4990037827", "bankAccountName": "Caf"#.to_vec();
    body.push(0xE9);
    body.extend_from_slice(br#"", "bankId": 5, "bankName": "Khan", "iBan": ""}]"#);
    let client = client(start_fixed_server("application/json; charset=iso-8859-1", body));

    let blocking = tokio::task::block_in_place(|| client.bank_accounts().read(MERCHANT_TIN, None));
    let non_blocking = client.bank_accounts().read_async(MERCHANT_TIN, None).await;

    let accounts = non_blocking.unwrap();
    assert_eq!(accounts[0].bank_account_name, "Caf\u{FFFD}");
    assert_eq!(blocking.unwrap(), accounts);
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_body_fails_the_same_on_both_paths() {
    let body = vec![b' '; posapi_core::MAX_BODY_BYTES + 1];
    let client = client(start_fixed_server("application/json", body));

    let blocking = tokio::task::block_in_place(|| client.info().read(None)).unwrap_err();
    let non_blocking = client.info().read_async(None).await.unwrap_err();

    assert!(matches!(blocking, PosApiError::Transport { .. }));
    assert!(matches!(non_blocking, PosApiError::Transport { .. }));
    assert_eq!(blocking.to_string(), non_blocking.to_string());
}

#[test]
fn send_data_updates_last_sent_date() {
    let client = client(start_server());
    let before = client.info().read(None).unwrap();
    client.send_data().send(None).unwrap();
    let after = client.info().read(None).unwrap();
    assert_ne!(before.last_sent_date, after.last_sent_date);
}

#[tokio::test]
async fn send_data_async_completes() {
    let client = client(start_server());
    client.send_data().send_async(None).await.unwrap();
}

#[test]
fn connection_refused_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(addr);
    let err = client.info().read(None).unwrap_err();
    assert!(matches!(err, PosApiError::Transport { .. }));
    assert!(err.envelope().is_none());
    assert!(err.request().is_some());
}

#[test]
fn closed_client_refuses_to_send() {
    let mut client = client(start_server());
    client.close();
    client.close();
    let err = client.send_data().send(None).unwrap_err();
    assert!(matches!(err, PosApiError::Transport { .. }));
}

#[test]
fn delete_date_goes_out_without_fraction() {
    let client = client(start_server());
    let date = NaiveDate::from_ymd_opt(2026, 2, 12)
        .unwrap()
        .and_hms_milli_opt(15, 31, 42, 500)
        .unwrap();
    // The mock answers 404 for an unknown id, but only after accepting the
    // date format; a fractional date would be a 400.
    let err = client
        .receipt()
        .delete(DeleteReceiptRequest::new("1".repeat(33), date), None)
        .unwrap_err();
    assert_eq!(err.status_code(), Some(404));
    let sent: serde_json::Value =
        serde_json::from_str(err.request().unwrap().body.as_deref().unwrap()).unwrap();
    assert_eq!(sent["date"], "2026-02-12 15:31:42");
}
