//! Canonical ↔ wire field-name translation.
//!
//! Canonical names are snake_case. The wire format is camelCase except for
//! a fixed set of vendor spellings that no derivation rule reproduces; those
//! live in [`override_for`] and always win.

use std::borrow::Cow;

/// Irregular wire names, keyed by canonical name.
pub fn override_for(canonical: &str) -> Option<&'static str> {
    let wire = match canonical {
        "terminal_id" => "terminalID",
        "iban" => "iBan",
        "operator_tin" => "operatorTIN",
        "database_host" => "database-host",
        "supported_databases" => "supported-databases",
        "total_vat" => "totalVAT",
        "stock_qr" => "stockQR",
        _ => return None,
    };
    Some(wire)
}

/// Wire name for a canonical field name.
pub fn to_wire_name(canonical: &str) -> Cow<'_, str> {
    if let Some(wire) = override_for(canonical) {
        return Cow::Borrowed(wire);
    }
    if !canonical.contains('_') {
        return Cow::Borrowed(canonical);
    }

    let mut segments = canonical.split('_');
    let mut wire = String::with_capacity(canonical.len());
    wire.push_str(segments.next().unwrap_or_default());
    for segment in segments {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            wire.extend(first.to_uppercase());
            wire.push_str(chars.as_str());
        }
    }
    Cow::Owned(wire)
}
