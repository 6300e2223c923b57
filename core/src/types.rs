//! Request and response schemas for each PosAPI resource.
//!
//! # Design
//! Types are defined independently from the mock-server crate; integration
//! tests catch drift between the two. Optional fields are `Option` and are
//! left out of the wire payload when unset.

pub mod bank_account;
pub mod info;
pub mod receipt;

pub use bank_account::BankAccount;
pub use info::{AppInfo, Customer, Merchant, ReadInfoResponse};
pub use receipt::{
    BarCodeType, CreateReceiptRequest, CreateReceiptResponse, DeleteReceiptRequest,
    DeleteReceiptResponse, Item, ItemData, Payment, PaymentCardData, PaymentCode, PaymentStatus,
    Receipt, ReceiptCreateStatus, ReceiptItemResponse, ReceiptType, TaxType,
};
