//! `GET /rest/bankAccounts` records.

use serde_json::{Map, Value};

use crate::error::{LocSegment, ValidationDefect};
use crate::schema::{FieldReader, FieldWriter, FromWire, Schema, ToWire};

/// A bank account registered for a taxpayer.
///
/// Fields the vendor adds later are kept in `extra` and written back on
/// serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct BankAccount {
    pub id: i64,
    pub tin: String,
    pub bank_account_no: String,
    pub bank_account_name: String,
    pub bank_id: i64,
    pub bank_name: String,
    /// Often an empty string for domestic-only accounts.
    pub iban: String,
    pub data: Option<Map<String, Value>>,
    pub extra: Map<String, Value>,
}

impl FromWire for BankAccount {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let mut r = FieldReader::new(value, loc)?;
        let id = r.required("id");
        let tin = r.required("tin");
        let bank_account_no = r.required("bank_account_no");
        let bank_account_name = r.required("bank_account_name");
        let bank_id = r.required("bank_id");
        let bank_name = r.required("bank_name");
        let iban = r.required("iban");
        let data = r.optional("data");
        let extra = r.extra();

        let account = match (
            id,
            tin,
            bank_account_no,
            bank_account_name,
            bank_id,
            bank_name,
            iban,
        ) {
            (
                Some(id),
                Some(tin),
                Some(bank_account_no),
                Some(bank_account_name),
                Some(bank_id),
                Some(bank_name),
                Some(iban),
            ) => Some(BankAccount {
                id,
                tin,
                bank_account_no,
                bank_account_name,
                bank_id,
                bank_name,
                iban,
                data,
                extra,
            }),
            _ => None,
        };
        r.finish(account)
    }
}

impl ToWire for BankAccount {
    fn to_wire(&self) -> Value {
        let mut w = FieldWriter::new();
        w.field("id", &self.id)
            .field("tin", &self.tin)
            .field("bank_account_no", &self.bank_account_no)
            .field("bank_account_name", &self.bank_account_name)
            .field("bank_id", &self.bank_id)
            .field("bank_name", &self.bank_name)
            .field("iban", &self.iban)
            .optional("data", &self.data)
            .extra(&self.extra);
        w.finish()
    }
}

impl Schema for BankAccount {
    const NAME: &'static str = "BankAccount";
}
