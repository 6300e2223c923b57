//! Receipt creation and deletion payloads for `/rest/receipt`.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::error::{LocSegment, PosApiError, ValidationDefect};
use crate::schema::{wire_enum, FieldReader, FieldWriter, FromWire, Schema, ToWire};

wire_enum! {
    /// Kind of fiscal document being registered.
    ReceiptType {
        B2cReceipt => "B2C_RECEIPT",
        B2bReceipt => "B2B_RECEIPT",
        B2cInvoice => "B2C_INVOICE",
        B2bInvoice => "B2B_INVOICE",
    }
}

wire_enum! {
    TaxType {
        VatAble => "VAT_ABLE",
        VatFree => "VAT_FREE",
        VatZero => "VAT_ZERO",
        NotVat => "NOT_VAT",
    }
}

wire_enum! {
    BarCodeType {
        Undefined => "UNDEFINED",
        Gs1 => "GS1",
        Isbn => "ISBN",
    }
}

wire_enum! {
    PaymentCode {
        Cash => "CASH",
        PaymentCard => "PAYMENT_CARD",
    }
}

wire_enum! {
    PaymentStatus {
        Paid => "PAID",
        Pay => "PAY",
        Reversed => "REVERSED",
        Error => "ERROR",
    }
}

wire_enum! {
    /// Outcome reported by the vendor for a receipt operation.
    ReceiptCreateStatus {
        Success => "SUCCESS",
        Error => "ERROR",
        Payment => "PAYMENT",
    }
}

/// `items[].data`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemData {
    pub lot_no: Option<String>,
    pub stock_qr: Option<Vec<String>>,
}

impl FromWire for ItemData {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let mut r = FieldReader::new(value, loc)?;
        let data = ItemData {
            lot_no: r.optional("lot_no"),
            stock_qr: r.optional("stock_qr"),
        };
        r.finish(Some(data))
    }
}

impl ToWire for ItemData {
    fn to_wire(&self) -> Value {
        let mut w = FieldWriter::new();
        w.optional("lot_no", &self.lot_no)
            .optional("stock_qr", &self.stock_qr);
        w.finish()
    }
}

/// A single line on a receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub name: String,
    pub bar_code: String,
    pub measure_unit: String,
    pub qty: Decimal,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub bar_code_type: Option<BarCodeType>,
    pub classification_code: Option<String>,
    pub tax_product_code: Option<String>,
    pub total_vat: Option<Decimal>,
    pub total_city_tax: Option<Decimal>,
    pub data: Option<ItemData>,
}

impl Item {
    pub fn new(
        name: impl Into<String>,
        bar_code: impl Into<String>,
        measure_unit: impl Into<String>,
        qty: Decimal,
        unit_price: Decimal,
        total_amount: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            bar_code: bar_code.into(),
            measure_unit: measure_unit.into(),
            qty,
            unit_price,
            total_amount,
            bar_code_type: None,
            classification_code: None,
            tax_product_code: None,
            total_vat: None,
            total_city_tax: None,
            data: None,
        }
    }
}

impl FromWire for Item {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let mut r = FieldReader::new(value, loc)?;
        let name = r.required("name");
        let bar_code = r.required("bar_code");
        let measure_unit = r.required("measure_unit");
        let qty = r.required("qty");
        let unit_price = r.required("unit_price");
        let total_amount = r.required("total_amount");
        let bar_code_type = r.optional("bar_code_type");
        let classification_code = r.optional("classification_code");
        let tax_product_code = r.optional("tax_product_code");
        let total_vat = r.optional("total_vat");
        let total_city_tax = r.optional("total_city_tax");
        let data = r.optional("data");

        let item = match (name, bar_code, measure_unit, qty, unit_price, total_amount) {
            (
                Some(name),
                Some(bar_code),
                Some(measure_unit),
                Some(qty),
                Some(unit_price),
                Some(total_amount),
            ) => Some(Item {
                name,
                bar_code,
                measure_unit,
                qty,
                unit_price,
                total_amount,
                bar_code_type,
                classification_code,
                tax_product_code,
                total_vat,
                total_city_tax,
                data,
            }),
            _ => None,
        };
        r.finish(item)
    }
}

impl ToWire for Item {
    fn to_wire(&self) -> Value {
        let mut w = FieldWriter::new();
        w.field("name", &self.name)
            .field("bar_code", &self.bar_code)
            .field("measure_unit", &self.measure_unit)
            .field("qty", &self.qty)
            .field("unit_price", &self.unit_price)
            .field("total_amount", &self.total_amount)
            .optional("bar_code_type", &self.bar_code_type)
            .optional("classification_code", &self.classification_code)
            .optional("tax_product_code", &self.tax_product_code)
            .optional("total_vat", &self.total_vat)
            .optional("total_city_tax", &self.total_city_tax)
            .optional("data", &self.data);
        w.finish()
    }
}

/// A sub-receipt grouped by merchant and tax type.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub total_amount: Decimal,
    pub tax_type: TaxType,
    pub merchant_tin: String,
    pub items: Vec<Item>,
    pub total_vat: Option<Decimal>,
    pub total_city_tax: Option<Decimal>,
    pub customer_tin: Option<String>,
    pub bank_account_no: Option<String>,
    pub iban: Option<String>,
    pub invoice_id: Option<String>,
    pub data: Option<Map<String, Value>>,
}

impl Receipt {
    pub fn new(
        total_amount: Decimal,
        tax_type: TaxType,
        merchant_tin: impl Into<String>,
        items: Vec<Item>,
    ) -> Self {
        Self {
            total_amount,
            tax_type,
            merchant_tin: merchant_tin.into(),
            items,
            total_vat: None,
            total_city_tax: None,
            customer_tin: None,
            bank_account_no: None,
            iban: None,
            invoice_id: None,
            data: None,
        }
    }
}

impl FromWire for Receipt {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let mut r = FieldReader::new(value, loc)?;
        let total_amount = r.required("total_amount");
        let tax_type = r.required("tax_type");
        let merchant_tin = r.required("merchant_tin");
        let items = r.required("items");
        let total_vat = r.optional("total_vat");
        let total_city_tax = r.optional("total_city_tax");
        let customer_tin = r.optional("customer_tin");
        let bank_account_no = r.optional("bank_account_no");
        let iban = r.optional("iban");
        let invoice_id = r.optional("invoice_id");
        let data = r.optional("data");

        let receipt = match (total_amount, tax_type, merchant_tin, items) {
            (Some(total_amount), Some(tax_type), Some(merchant_tin), Some(items)) => {
                Some(Receipt {
                    total_amount,
                    tax_type,
                    merchant_tin,
                    items,
                    total_vat,
                    total_city_tax,
                    customer_tin,
                    bank_account_no,
                    iban,
                    invoice_id,
                    data,
                })
            }
            _ => None,
        };
        r.finish(receipt)
    }
}

impl ToWire for Receipt {
    fn to_wire(&self) -> Value {
        let mut w = FieldWriter::new();
        w.field("total_amount", &self.total_amount)
            .field("tax_type", &self.tax_type)
            .field("merchant_tin", &self.merchant_tin)
            .field("items", &self.items)
            .optional("total_vat", &self.total_vat)
            .optional("total_city_tax", &self.total_city_tax)
            .optional("customer_tin", &self.customer_tin)
            .optional("bank_account_no", &self.bank_account_no)
            .optional("iban", &self.iban)
            .optional("invoice_id", &self.invoice_id)
            .optional("data", &self.data);
        w.finish()
    }
}

/// `payments[].data`, sent only for card payments.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentCardData {
    pub terminal_id: String,
    pub rrn: String,
    pub masked_card_number: String,
    pub easy: bool,
    pub bank_code: Option<String>,
}

impl FromWire for PaymentCardData {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let mut r = FieldReader::new(value, loc)?;
        let terminal_id = r.required("terminal_id");
        let rrn = r.required("rrn");
        let masked_card_number = r.required("masked_card_number");
        let easy = r.required("easy");
        let bank_code = r.optional("bank_code");

        let data = match (terminal_id, rrn, masked_card_number, easy) {
            (Some(terminal_id), Some(rrn), Some(masked_card_number), Some(easy)) => {
                Some(PaymentCardData {
                    terminal_id,
                    rrn,
                    masked_card_number,
                    easy,
                    bank_code,
                })
            }
            _ => None,
        };
        r.finish(data)
    }
}

impl ToWire for PaymentCardData {
    fn to_wire(&self) -> Value {
        let mut w = FieldWriter::new();
        w.field("terminal_id", &self.terminal_id)
            .field("rrn", &self.rrn)
            .field("masked_card_number", &self.masked_card_number)
            .field("easy", &self.easy)
            .optional("bank_code", &self.bank_code);
        w.finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub code: PaymentCode,
    pub status: PaymentStatus,
    pub paid_amount: Decimal,
    pub exchange_code: Option<String>,
    pub data: Option<PaymentCardData>,
}

impl Payment {
    pub fn new(code: PaymentCode, status: PaymentStatus, paid_amount: Decimal) -> Self {
        Self {
            code,
            status,
            paid_amount,
            exchange_code: None,
            data: None,
        }
    }
}

impl FromWire for Payment {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let mut r = FieldReader::new(value, loc)?;
        let code = r.required("code");
        let status = r.required("status");
        let paid_amount = r.required("paid_amount");
        let exchange_code = r.optional("exchange_code");
        let data = r.optional("data");

        let payment = match (code, status, paid_amount) {
            (Some(code), Some(status), Some(paid_amount)) => Some(Payment {
                code,
                status,
                paid_amount,
                exchange_code,
                data,
            }),
            _ => None,
        };
        r.finish(payment)
    }
}

impl ToWire for Payment {
    fn to_wire(&self) -> Value {
        let mut w = FieldWriter::new();
        w.field("code", &self.code)
            .field("status", &self.status)
            .field("paid_amount", &self.paid_amount)
            .optional("exchange_code", &self.exchange_code)
            .optional("data", &self.data);
        w.finish()
    }
}

/// Body of `POST /rest/receipt` when registering a receipt batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateReceiptRequest {
    pub branch_no: String,
    pub total_amount: Decimal,
    pub merchant_tin: String,
    pub pos_no: String,
    pub receipt_type: ReceiptType,
    pub bill_id_suffix: String,
    pub receipts: Vec<Receipt>,
    pub total_vat: Option<Decimal>,
    pub total_city_tax: Option<Decimal>,
    pub district_code: Option<String>,
    pub customer_tin: Option<String>,
    pub consumer_no: Option<String>,
    pub inactive_id: Option<String>,
    pub invoice_id: Option<String>,
    pub report_month: Option<String>,
    pub data: Option<Map<String, Value>>,
    pub payments: Option<Vec<Payment>>,
}

impl CreateReceiptRequest {
    pub fn new(
        branch_no: impl Into<String>,
        total_amount: Decimal,
        merchant_tin: impl Into<String>,
        pos_no: impl Into<String>,
        receipt_type: ReceiptType,
        bill_id_suffix: impl Into<String>,
        receipts: Vec<Receipt>,
    ) -> Self {
        Self {
            branch_no: branch_no.into(),
            total_amount,
            merchant_tin: merchant_tin.into(),
            pos_no: pos_no.into(),
            receipt_type,
            bill_id_suffix: bill_id_suffix.into(),
            receipts,
            total_vat: None,
            total_city_tax: None,
            district_code: None,
            customer_tin: None,
            consumer_no: None,
            inactive_id: None,
            invoice_id: None,
            report_month: None,
            data: None,
            payments: None,
        }
    }
}

impl FromWire for CreateReceiptRequest {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let mut r = FieldReader::new(value, loc)?;
        let branch_no = r.required("branch_no");
        let total_amount = r.required("total_amount");
        let merchant_tin = r.required("merchant_tin");
        let pos_no = r.required("pos_no");
        let receipt_type = r.required("type");
        let bill_id_suffix = r.required("bill_id_suffix");
        let receipts = r.required("receipts");
        let total_vat = r.optional("total_vat");
        let total_city_tax = r.optional("total_city_tax");
        let district_code = r.optional("district_code");
        let customer_tin = r.optional("customer_tin");
        let consumer_no = r.optional("consumer_no");
        let inactive_id = r.optional("inactive_id");
        let invoice_id = r.optional("invoice_id");
        let report_month = r.optional("report_month");
        let data = r.optional("data");
        let payments = r.optional("payments");

        let request = match (
            branch_no,
            total_amount,
            merchant_tin,
            pos_no,
            receipt_type,
            bill_id_suffix,
            receipts,
        ) {
            (
                Some(branch_no),
                Some(total_amount),
                Some(merchant_tin),
                Some(pos_no),
                Some(receipt_type),
                Some(bill_id_suffix),
                Some(receipts),
            ) => Some(CreateReceiptRequest {
                branch_no,
                total_amount,
                merchant_tin,
                pos_no,
                receipt_type,
                bill_id_suffix,
                receipts,
                total_vat,
                total_city_tax,
                district_code,
                customer_tin,
                consumer_no,
                inactive_id,
                invoice_id,
                report_month,
                data,
                payments,
            }),
            _ => None,
        };
        r.finish(request)
    }
}

impl ToWire for CreateReceiptRequest {
    fn to_wire(&self) -> Value {
        let mut w = FieldWriter::new();
        w.field("branch_no", &self.branch_no)
            .field("total_amount", &self.total_amount)
            .field("merchant_tin", &self.merchant_tin)
            .field("pos_no", &self.pos_no)
            .field("type", &self.receipt_type)
            .field("bill_id_suffix", &self.bill_id_suffix)
            .field("receipts", &self.receipts)
            .optional("total_vat", &self.total_vat)
            .optional("total_city_tax", &self.total_city_tax)
            .optional("district_code", &self.district_code)
            .optional("customer_tin", &self.customer_tin)
            .optional("consumer_no", &self.consumer_no)
            .optional("inactive_id", &self.inactive_id)
            .optional("invoice_id", &self.invoice_id)
            .optional("report_month", &self.report_month)
            .optional("data", &self.data)
            .optional("payments", &self.payments);
        w.finish()
    }
}

impl Schema for CreateReceiptRequest {
    const NAME: &'static str = "CreateReceiptRequest";
}

/// One registered sub-receipt in a create response.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptItemResponse {
    pub id: String,
    pub bank_account_id: i64,
}

impl FromWire for ReceiptItemResponse {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let mut r = FieldReader::new(value, loc)?;
        let id = r.required("id");
        let bank_account_id = r.required("bank_account_id");
        let item = match (id, bank_account_id) {
            (Some(id), Some(bank_account_id)) => Some(ReceiptItemResponse {
                id,
                bank_account_id,
            }),
            _ => None,
        };
        r.finish(item)
    }
}

impl ToWire for ReceiptItemResponse {
    fn to_wire(&self) -> Value {
        let mut w = FieldWriter::new();
        w.field("id", &self.id)
            .field("bank_account_id", &self.bank_account_id);
        w.finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateReceiptResponse {
    /// Batch receipt ID (33 digits).
    pub id: String,
    pub pos_id: i64,
    pub status: ReceiptCreateStatus,
    pub message: String,
    pub qr_date: String,
    pub lottery: String,
    pub date: NaiveDateTime,
    pub easy: bool,
    pub receipts: Vec<ReceiptItemResponse>,
}

impl CreateReceiptResponse {
    /// Turn a well-formed `ERROR` payload into [`PosApiError::Business`].
    pub fn ensure_success(self) -> Result<Self, PosApiError> {
        if self.status == ReceiptCreateStatus::Error {
            return Err(PosApiError::Business {
                status: Some(self.status.to_string()),
                message: self.message,
            });
        }
        Ok(self)
    }
}

impl FromWire for CreateReceiptResponse {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let mut r = FieldReader::new(value, loc)?;
        let id = r.required("id");
        let pos_id = r.required("pos_id");
        let status = r.required("status");
        let message = r.required("message");
        let qr_date = r.required("qr_date");
        let lottery = r.required("lottery");
        let date = r.required("date");
        let easy = r.required("easy");
        let receipts = r.required("receipts");

        let response = match (
            id, pos_id, status, message, qr_date, lottery, date, easy, receipts,
        ) {
            (
                Some(id),
                Some(pos_id),
                Some(status),
                Some(message),
                Some(qr_date),
                Some(lottery),
                Some(date),
                Some(easy),
                Some(receipts),
            ) => Some(CreateReceiptResponse {
                id,
                pos_id,
                status,
                message,
                qr_date,
                lottery,
                date,
                easy,
                receipts,
            }),
            _ => None,
        };
        r.finish(response)
    }
}

impl ToWire for CreateReceiptResponse {
    fn to_wire(&self) -> Value {
        let mut w = FieldWriter::new();
        w.field("id", &self.id)
            .field("pos_id", &self.pos_id)
            .field("status", &self.status)
            .field("message", &self.message)
            .field("qr_date", &self.qr_date)
            .field("lottery", &self.lottery)
            .field("date", &self.date)
            .field("easy", &self.easy)
            .field("receipts", &self.receipts);
        w.finish()
    }
}

impl Schema for CreateReceiptResponse {
    const NAME: &'static str = "CreateReceiptResponse";
}

/// Body of `POST /rest/receipt` when voiding a previously registered receipt.
///
/// `date` is the original registration time and always goes out as
/// `YYYY-MM-DD HH:MM:SS`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteReceiptRequest {
    pub id: String,
    pub date: NaiveDateTime,
    pub receipt_type: Option<ReceiptType>,
}

impl DeleteReceiptRequest {
    pub fn new(id: impl Into<String>, date: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            date,
            receipt_type: None,
        }
    }
}

impl FromWire for DeleteReceiptRequest {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let mut r = FieldReader::new(value, loc)?;
        let id = r.required("id");
        let date = r.required("date");
        let receipt_type = r.optional("type");
        let request = match (id, date) {
            (Some(id), Some(date)) => Some(DeleteReceiptRequest {
                id,
                date,
                receipt_type,
            }),
            _ => None,
        };
        r.finish(request)
    }
}

impl ToWire for DeleteReceiptRequest {
    fn to_wire(&self) -> Value {
        let mut w = FieldWriter::new();
        w.field("id", &self.id)
            .field("date", &self.date)
            .optional("type", &self.receipt_type);
        w.finish()
    }
}

impl Schema for DeleteReceiptRequest {
    const NAME: &'static str = "DeleteReceiptRequest";
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteReceiptResponse {
    pub status: Option<ReceiptCreateStatus>,
    pub message: Option<String>,
}

impl DeleteReceiptResponse {
    pub fn ensure_success(self) -> Result<Self, PosApiError> {
        if self.status == Some(ReceiptCreateStatus::Error) {
            return Err(PosApiError::Business {
                status: self.status.as_ref().map(ToString::to_string),
                message: self.message.unwrap_or_default(),
            });
        }
        Ok(self)
    }
}

impl FromWire for DeleteReceiptResponse {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let mut r = FieldReader::new(value, loc)?;
        let response = DeleteReceiptResponse {
            status: r.optional("status"),
            message: r.optional("message"),
        };
        r.finish(Some(response))
    }
}

impl ToWire for DeleteReceiptResponse {
    fn to_wire(&self) -> Value {
        let mut w = FieldWriter::new();
        w.optional("status", &self.status)
            .optional("message", &self.message);
        w.finish()
    }
}

impl Schema for DeleteReceiptResponse {
    const NAME: &'static str = "DeleteReceiptResponse";
}
