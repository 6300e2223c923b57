//! `GET /rest/info` response.

use serde_json::Value;

use crate::error::{LocSegment, ValidationDefect};
use crate::schema::{FieldReader, FieldWriter, FromWire, Schema, ToWire};

/// Runtime details of the PosAPI installation.
#[derive(Debug, Clone, PartialEq)]
pub struct AppInfo {
    pub application_dir: String,
    pub current_dir: String,
    pub database: String,
    pub database_host: String,
    pub work_dir: String,
    pub supported_databases: Option<Vec<String>>,
}

impl FromWire for AppInfo {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let mut r = FieldReader::new(value, loc)?;
        let application_dir = r.required("application_dir");
        let current_dir = r.required("current_dir");
        let database = r.required("database");
        let database_host = r.required("database_host");
        let work_dir = r.required("work_dir");
        let supported_databases = r.optional("supported_databases");

        let info = match (application_dir, current_dir, database, database_host, work_dir) {
            (
                Some(application_dir),
                Some(current_dir),
                Some(database),
                Some(database_host),
                Some(work_dir),
            ) => Some(AppInfo {
                application_dir,
                current_dir,
                database,
                database_host,
                work_dir,
                supported_databases,
            }),
            _ => None,
        };
        r.finish(info)
    }
}

impl ToWire for AppInfo {
    fn to_wire(&self) -> Value {
        let mut w = FieldWriter::new();
        w.field("application_dir", &self.application_dir)
            .field("current_dir", &self.current_dir)
            .field("database", &self.database)
            .field("database_host", &self.database_host)
            .field("work_dir", &self.work_dir)
            .optional("supported_databases", &self.supported_databases);
        w.finish()
    }
}

/// A customer business served by a registered merchant.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub name: String,
    pub tin: String,
    pub vat_payer: bool,
}

impl FromWire for Customer {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let mut r = FieldReader::new(value, loc)?;
        let name = r.required("name");
        let tin = r.required("tin");
        let vat_payer = r.required("vat_payer");
        let customer = match (name, tin, vat_payer) {
            (Some(name), Some(tin), Some(vat_payer)) => Some(Customer {
                name,
                tin,
                vat_payer,
            }),
            _ => None,
        };
        r.finish(customer)
    }
}

impl ToWire for Customer {
    fn to_wire(&self) -> Value {
        let mut w = FieldWriter::new();
        w.field("name", &self.name)
            .field("tin", &self.tin)
            .field("vat_payer", &self.vat_payer);
        w.finish()
    }
}

/// A merchant registered on this PosAPI.
#[derive(Debug, Clone, PartialEq)]
pub struct Merchant {
    pub name: String,
    pub tin: String,
    pub customers: Vec<Customer>,
}

impl FromWire for Merchant {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let mut r = FieldReader::new(value, loc)?;
        let name = r.required("name");
        let tin = r.required("tin");
        let customers = r.required("customers");
        let merchant = match (name, tin, customers) {
            (Some(name), Some(tin), Some(customers)) => Some(Merchant {
                name,
                tin,
                customers,
            }),
            _ => None,
        };
        r.finish(merchant)
    }
}

impl ToWire for Merchant {
    fn to_wire(&self) -> Value {
        let mut w = FieldWriter::new();
        w.field("name", &self.name)
            .field("tin", &self.tin)
            .field("customers", &self.customers);
        w.finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadInfoResponse {
    pub operator_name: String,
    pub operator_tin: String,
    pub pos_id: f64,
    pub pos_no: String,
    /// Last time receipts were sent to the tax authority, as reported.
    pub last_sent_date: String,
    pub left_lotteries: i64,
    pub app_info: AppInfo,
    pub merchants: Vec<Merchant>,
}

impl FromWire for ReadInfoResponse {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let mut r = FieldReader::new(value, loc)?;
        let operator_name = r.required("operator_name");
        let operator_tin = r.required("operator_tin");
        let pos_id = r.required("pos_id");
        let pos_no = r.required("pos_no");
        let last_sent_date = r.required("last_sent_date");
        let left_lotteries = r.required("left_lotteries");
        let app_info = r.required("app_info");
        let merchants = r.required("merchants");

        let info = match (
            operator_name,
            operator_tin,
            pos_id,
            pos_no,
            last_sent_date,
            left_lotteries,
            app_info,
            merchants,
        ) {
            (
                Some(operator_name),
                Some(operator_tin),
                Some(pos_id),
                Some(pos_no),
                Some(last_sent_date),
                Some(left_lotteries),
                Some(app_info),
                Some(merchants),
            ) => Some(ReadInfoResponse {
                operator_name,
                operator_tin,
                pos_id,
                pos_no,
                last_sent_date,
                left_lotteries,
                app_info,
                merchants,
            }),
            _ => None,
        };
        r.finish(info)
    }
}

impl ToWire for ReadInfoResponse {
    fn to_wire(&self) -> Value {
        let mut w = FieldWriter::new();
        w.field("operator_name", &self.operator_name)
            .field("operator_tin", &self.operator_tin)
            .field("pos_id", &self.pos_id)
            .field("pos_no", &self.pos_no)
            .field("last_sent_date", &self.last_sent_date)
            .field("left_lotteries", &self.left_lotteries)
            .field("app_info", &self.app_info)
            .field("merchants", &self.merchants);
        w.finish()
    }
}

impl Schema for ReadInfoResponse {
    const NAME: &'static str = "ReadInfoResponse";
}
