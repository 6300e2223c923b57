//! Schema-driven validation and serialization of wire payloads.
//!
//! # Design
//! A schema type implements [`FromWire`] by walking its fields with a
//! [`FieldReader`] and [`ToWire`] by emitting them through a [`FieldWriter`].
//! Both resolve names through [`crate::alias`], so field declarations only
//! ever mention canonical names.
//!
//! - Input accepts the canonical key or the wire key; canonical wins when a
//!   payload carries both.
//! - Unknown keys never fail validation.
//! - Every defect is collected before failing, so one call reports the
//!   whole list.
//! - Output omits unset optional fields instead of sending `null`.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};

use crate::alias::to_wire_name;
use crate::error::{DefectKind, LocSegment, ValidationDefect};

/// Wire format for timestamps sent to the vendor.
pub const WIRE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub trait FromWire: Sized {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>>;
}

pub trait ToWire {
    fn to_wire(&self) -> Value;
}

/// A named top-level payload shape.
pub trait Schema: FromWire + ToWire {
    /// Model name reported in validation errors.
    const NAME: &'static str;

    fn validate(raw: &Value) -> Result<Self, Vec<ValidationDefect>> {
        Self::from_wire(raw, &[])
    }

    fn serialize(&self) -> Value {
        self.to_wire()
    }
}

fn defect(loc: &[LocSegment], kind: DefectKind, message: &str) -> Vec<ValidationDefect> {
    vec![ValidationDefect::new(loc.to_vec(), kind, message)]
}

/// Reads declared fields out of a JSON object, collecting defects as it goes.
pub struct FieldReader<'a> {
    object: &'a Map<String, Value>,
    loc: &'a [LocSegment],
    seen: Vec<String>,
    defects: Vec<ValidationDefect>,
}

impl<'a> FieldReader<'a> {
    pub fn new(value: &'a Value, loc: &'a [LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        match value {
            Value::Object(object) => Ok(Self {
                object,
                loc,
                seen: Vec::new(),
                defects: Vec::new(),
            }),
            _ => Err(defect(
                loc,
                DefectKind::ObjectType,
                "input should be a valid object",
            )),
        }
    }

    fn lookup(&mut self, canonical: &str) -> Option<&'a Value> {
        let object: &'a Map<String, Value> = self.object;
        let wire = to_wire_name(canonical);
        let found = object
            .get(canonical)
            .or_else(|| object.get(wire.as_ref()));
        self.seen.push(canonical.to_string());
        self.seen.push(wire.into_owned());
        found
    }

    fn field_loc(&self, canonical: &str) -> Vec<LocSegment> {
        let mut loc = self.loc.to_vec();
        loc.push(LocSegment::Field(canonical.to_string()));
        loc
    }

    /// A field that must be present and non-null.
    pub fn required<T: FromWire>(&mut self, canonical: &str) -> Option<T> {
        let loc = self.field_loc(canonical);
        match self.lookup(canonical) {
            None | Some(Value::Null) => {
                self.defects
                    .extend(defect(&loc, DefectKind::Missing, "field required"));
                None
            }
            Some(value) => self.convert(value, &loc),
        }
    }

    /// A field that may be absent or null.
    pub fn optional<T: FromWire>(&mut self, canonical: &str) -> Option<T> {
        let loc = self.field_loc(canonical);
        match self.lookup(canonical) {
            None | Some(Value::Null) => None,
            Some(value) => self.convert(value, &loc),
        }
    }

    fn convert<T: FromWire>(&mut self, value: &Value, loc: &[LocSegment]) -> Option<T> {
        match T::from_wire(value, loc) {
            Ok(converted) => Some(converted),
            Err(defects) => {
                self.defects.extend(defects);
                None
            }
        }
    }

    /// Keys the schema did not declare, under their original spelling.
    pub fn extra(&self) -> Map<String, Value> {
        self.object
            .iter()
            .filter(|(key, _)| !self.seen.iter().any(|seen| seen == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Yield the assembled value, or every defect recorded along the way.
    pub fn finish<T>(self, value: Option<T>) -> Result<T, Vec<ValidationDefect>> {
        match value {
            Some(value) if self.defects.is_empty() => Ok(value),
            Some(_) => Err(self.defects),
            None if self.defects.is_empty() => Err(defect(
                self.loc,
                DefectKind::ObjectType,
                "object could not be assembled",
            )),
            None => Err(self.defects),
        }
    }
}

/// Builds a wire object from canonical field names.
#[derive(Debug, Default)]
pub struct FieldWriter {
    object: Map<String, Value>,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<T: ToWire + ?Sized>(&mut self, canonical: &str, value: &T) -> &mut Self {
        self.object
            .insert(to_wire_name(canonical).into_owned(), value.to_wire());
        self
    }

    /// Emit the field only when it is set.
    pub fn optional<T: ToWire>(&mut self, canonical: &str, value: &Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.field(canonical, value);
        }
        self
    }

    /// Carry unknown keys back out; declared fields are never overwritten.
    pub fn extra(&mut self, extra: &Map<String, Value>) -> &mut Self {
        for (key, value) in extra {
            if !self.object.contains_key(key) {
                self.object.insert(key.clone(), value.clone());
            }
        }
        self
    }

    pub fn finish(self) -> Value {
        Value::Object(self.object)
    }
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

impl FromWire for String {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(defect(
                loc,
                DefectKind::StringType,
                "input should be a valid string",
            )),
        }
    }
}

impl ToWire for String {
    fn to_wire(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToWire for str {
    fn to_wire(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl FromWire for i64 {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| {
            defect(
                loc,
                DefectKind::IntType,
                "input should be a valid integer",
            )
        })
    }
}

impl ToWire for i64 {
    fn to_wire(&self) -> Value {
        Value::from(*self)
    }
}

impl FromWire for f64 {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| {
            defect(
                loc,
                DefectKind::NumberType,
                "input should be a valid number",
            )
        })
    }
}

impl ToWire for f64 {
    fn to_wire(&self) -> Value {
        Value::from(*self)
    }
}

impl FromWire for bool {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let parsed = match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        };
        parsed.ok_or_else(|| {
            defect(
                loc,
                DefectKind::BoolType,
                "input should be a valid boolean",
            )
        })
    }
}

impl ToWire for bool {
    fn to_wire(&self) -> Value {
        Value::Bool(*self)
    }
}

/// Monetary amounts. Integers, floats and numeric strings are all accepted.
impl FromWire for Decimal {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let text = match value {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.trim().to_string()),
            _ => None,
        };
        text.and_then(|t| {
            Decimal::from_str(&t)
                .or_else(|_| Decimal::from_scientific(&t))
                .ok()
        })
        .ok_or_else(|| {
            defect(
                loc,
                DefectKind::DecimalParse,
                "input should be a valid decimal",
            )
        })
    }
}

/// Written as a JSON number carrying the exact decimal digits.
impl ToWire for Decimal {
    fn to_wire(&self) -> Value {
        let normalized = self.normalize();
        if normalized.scale() == 0 {
            if let Some(int) = normalized.to_i64() {
                return Value::from(int);
            }
        }
        let text = normalized.to_string();
        match Number::from_str(&text) {
            Ok(number) => Value::Number(number),
            Err(_) => Value::String(text),
        }
    }
}

/// Parse the timestamp spellings the vendor has been seen to use.
///
/// An explicit offset is dropped and the wall-clock time kept.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

impl FromWire for NaiveDateTime {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        match value {
            Value::String(s) => parse_timestamp(s),
            _ => None,
        }
        .ok_or_else(|| {
            defect(
                loc,
                DefectKind::DateTimeParse,
                "input should be a valid datetime",
            )
        })
    }
}

/// Always `YYYY-MM-DD HH:MM:SS`; sub-second precision is dropped.
impl ToWire for NaiveDateTime {
    fn to_wire(&self) -> Value {
        Value::String(self.format(WIRE_DATETIME_FORMAT).to_string())
    }
}

impl FromWire for Map<String, Value> {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        match value {
            Value::Object(object) => Ok(object.clone()),
            _ => Err(defect(
                loc,
                DefectKind::ObjectType,
                "input should be a valid object",
            )),
        }
    }
}

impl ToWire for Map<String, Value> {
    fn to_wire(&self) -> Value {
        Value::Object(self.clone())
    }
}

impl<T: FromWire> FromWire for Vec<T> {
    fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
        let Value::Array(items) = value else {
            return Err(defect(
                loc,
                DefectKind::ListType,
                "input should be a valid list",
            ));
        };

        let mut out = Vec::with_capacity(items.len());
        let mut defects = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let mut item_loc = loc.to_vec();
            item_loc.push(LocSegment::Index(index));
            match T::from_wire(item, &item_loc) {
                Ok(converted) => out.push(converted),
                Err(item_defects) => defects.extend(item_defects),
            }
        }

        if defects.is_empty() {
            Ok(out)
        } else {
            Err(defects)
        }
    }
}

impl<T: ToWire> ToWire for Vec<T> {
    fn to_wire(&self) -> Value {
        Value::Array(self.iter().map(ToWire::to_wire).collect())
    }
}

/// Declare a vendor enumeration: a closed set of literals plus `Other` for
/// values the server may add later. Unknown literals round-trip unchanged.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $literal:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $literal,)+
                    Self::Other(value) => value.as_str(),
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, Self::Other(_))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                match value {
                    $($literal => Self::$variant,)+
                    other => Self::Other(other.to_string()),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $crate::schema::FromWire for $name {
            fn from_wire(
                value: &::serde_json::Value,
                loc: &[$crate::error::LocSegment],
            ) -> ::std::result::Result<Self, Vec<$crate::error::ValidationDefect>> {
                match value {
                    ::serde_json::Value::String(s) => Ok(Self::from(s.as_str())),
                    _ => Err(vec![$crate::error::ValidationDefect::new(
                        loc.to_vec(),
                        $crate::error::DefectKind::StringType,
                        "input should be a valid string",
                    )]),
                }
            }
        }

        impl $crate::schema::ToWire for $name {
            fn to_wire(&self) -> ::serde_json::Value {
                ::serde_json::Value::String(self.as_str().to_string())
            }
        }
    };
}

pub(crate) use wire_enum;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    wire_enum! {
        Colour { Red => "RED", Green => "GREEN" }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Line {
        total_amount: Decimal,
        bar_code: String,
        colour: Option<Colour>,
        total_vat: Option<Decimal>,
    }

    impl FromWire for Line {
        fn from_wire(value: &Value, loc: &[LocSegment]) -> Result<Self, Vec<ValidationDefect>> {
            let mut r = FieldReader::new(value, loc)?;
            let total_amount = r.required("total_amount");
            let bar_code = r.required("bar_code");
            let colour = r.optional("colour");
            let total_vat = r.optional("total_vat");
            let line = match (total_amount, bar_code) {
                (Some(total_amount), Some(bar_code)) => Some(Line {
                    total_amount,
                    bar_code,
                    colour,
                    total_vat,
                }),
                _ => None,
            };
            r.finish(line)
        }
    }

    impl ToWire for Line {
        fn to_wire(&self) -> Value {
            let mut w = FieldWriter::new();
            w.field("total_amount", &self.total_amount)
                .field("bar_code", &self.bar_code)
                .optional("colour", &self.colour)
                .optional("total_vat", &self.total_vat);
            w.finish()
        }
    }

    impl Schema for Line {
        const NAME: &'static str = "Line";
    }

    #[test]
    fn accepts_canonical_or_wire_keys() {
        let canonical = Line::validate(&json!({"total_amount": 10, "bar_code": "x"})).unwrap();
        let wire = Line::validate(&json!({"totalAmount": 10, "barCode": "x"})).unwrap();
        assert_eq!(canonical, wire);
    }

    #[test]
    fn canonical_key_wins_over_wire_key() {
        let line = Line::validate(&json!({
            "total_amount": 1,
            "totalAmount": 2,
            "bar_code": "x",
        }))
        .unwrap();
        assert_eq!(line.total_amount, Decimal::from(1));
    }

    #[test]
    fn override_names_are_used_on_input() {
        let line = Line::validate(&json!({"totalAmount": 1, "barCode": "x", "totalVAT": "0.10"}))
            .unwrap();
        assert_eq!(line.total_vat, Some(Decimal::from_str("0.10").unwrap()));
    }

    #[test]
    fn unknown_keys_do_not_change_the_result() {
        let plain = Line::validate(&json!({"totalAmount": 1, "barCode": "x"})).unwrap();
        let noisy = Line::validate(&json!({
            "totalAmount": 1,
            "barCode": "x",
            "somethingNew": {"nested": true},
        }))
        .unwrap();
        assert_eq!(plain, noisy);
    }

    #[test]
    fn collects_every_defect() {
        let defects = Line::validate(&json!({"totalAmount": "abc", "colour": 3})).unwrap_err();
        let paths: Vec<_> = defects.iter().map(|d| (d.path(), d.kind)).collect();
        assert_eq!(
            paths,
            vec![
                ("total_amount".to_string(), DefectKind::DecimalParse),
                ("bar_code".to_string(), DefectKind::Missing),
                ("colour".to_string(), DefectKind::StringType),
            ]
        );
    }

    #[test]
    fn null_required_field_is_missing() {
        let defects = Line::validate(&json!({"totalAmount": 1, "barCode": null})).unwrap_err();
        assert_eq!(defects[0].kind, DefectKind::Missing);
    }

    #[test]
    fn non_object_input_is_rejected() {
        let defects = Line::validate(&json!([1, 2])).unwrap_err();
        assert_eq!(defects[0].kind, DefectKind::ObjectType);
        assert!(defects[0].loc.is_empty());
    }

    #[test]
    fn list_defects_carry_the_index() {
        let defects = Vec::<Line>::from_wire(
            &json!([{"totalAmount": 1, "barCode": "a"}, {"totalAmount": 1}]),
            &[LocSegment::Field("items".into())],
        )
        .unwrap_err();
        assert_eq!(defects.len(), 1);
        assert_eq!(defects[0].path(), "items.1.bar_code");
    }

    #[test]
    fn serialize_omits_unset_fields() {
        let line = Line {
            total_amount: Decimal::from(5),
            bar_code: "x".to_string(),
            colour: None,
            total_vat: None,
        };
        let wire = line.serialize();
        assert_eq!(wire, json!({"totalAmount": 5, "barCode": "x"}));
        assert_eq!(Line::validate(&wire).unwrap(), line);
    }

    #[test]
    fn serialize_then_validate_keeps_set_fields() {
        let line = Line {
            total_amount: Decimal::from_str("12.50").unwrap(),
            bar_code: "x".to_string(),
            colour: Some(Colour::Other("BLUE".to_string())),
            total_vat: Some(Decimal::from_str("1.25").unwrap()),
        };
        let wire = line.serialize();
        assert_eq!(wire["colour"], "BLUE");
        assert_eq!(wire["totalVAT"], json!(1.25));
        let back = Line::validate(&wire).unwrap();
        assert_eq!(back.colour, line.colour);
        assert_eq!(back.total_amount, line.total_amount);
    }

    #[test]
    fn enum_keeps_unknown_literals() {
        assert_eq!(Colour::from("RED"), Colour::Red);
        let other = Colour::from("PURPLE");
        assert!(!other.is_known());
        assert_eq!(other.to_wire(), json!("PURPLE"));
    }

    #[test]
    fn decimal_accepts_all_numeric_spellings() {
        let loc: &[LocSegment] = &[];
        for (raw, expected) in [
            (json!(1000), "1000"),
            (json!(1000.5), "1000.5"),
            (json!("1000.50"), "1000.50"),
            (json!(0.1), "0.1"),
        ] {
            let parsed = Decimal::from_wire(&raw, loc).unwrap();
            assert_eq!(parsed, Decimal::from_str(expected).unwrap(), "{raw}");
        }
        assert!(Decimal::from_wire(&json!(true), loc).is_err());
    }

    #[test]
    fn integral_decimals_serialize_as_integers() {
        let amount = Decimal::from_str("1000.00").unwrap();
        assert_eq!(amount.to_wire(), json!(1000));
    }

    #[test]
    fn decimals_keep_every_digit_on_the_wire() {
        let amount = Decimal::from_str("12345678901.123456789").unwrap();
        let wire = amount.to_wire();
        assert!(wire.is_number());
        assert_eq!(wire.to_string(), "12345678901.123456789");

        let text = serde_json::to_string(&json!({ "totalAmount": wire })).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        let loc: &[LocSegment] = &[];
        assert_eq!(Decimal::from_wire(&parsed["totalAmount"], loc).unwrap(), amount);
    }

    #[test]
    fn lax_booleans() {
        let loc: &[LocSegment] = &[];
        assert!(bool::from_wire(&json!("true"), loc).unwrap());
        assert!(!bool::from_wire(&json!(0), loc).unwrap());
        assert!(bool::from_wire(&json!("maybe"), loc).is_err());
    }

    #[test]
    fn lax_integers() {
        let loc: &[LocSegment] = &[];
        assert_eq!(i64::from_wire(&json!(3.0), loc).unwrap(), 3);
        assert_eq!(i64::from_wire(&json!("42"), loc).unwrap(), 42);
        assert!(i64::from_wire(&json!(3.5), loc).is_err());
    }

    #[test]
    fn timestamps_in_vendor_spellings() {
        let expected = NaiveDate::from_ymd_opt(2026, 2, 12)
            .unwrap()
            .and_hms_opt(15, 31, 42)
            .unwrap();
        for text in [
            "2026-02-12 15:31:42",
            "2026-02-12T15:31:42",
            "2026-02-12T15:31:42+08:00",
            "2026-02-12 15:31:42+08:00",
        ] {
            assert_eq!(parse_timestamp(text), Some(expected), "{text}");
        }
        assert_eq!(
            parse_timestamp("2026-01-27"),
            NaiveDate::from_ymd_opt(2026, 1, 27).and_then(|d| d.and_hms_opt(0, 0, 0))
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn timestamps_serialize_without_fraction() {
        let ts = parse_timestamp("2026-02-12T15:31:42.500").unwrap();
        assert_eq!(ts.to_wire(), json!("2026-02-12 15:31:42"));
    }
}
