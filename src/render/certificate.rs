// fgtctl - CLI for the FortiGate REST API
// Copyright (C) 2024 fgtctl contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Certificate store listings.

use crate::render::format::{PLACEHOLDER, TimestampStyle, as_number, boolean, flatten, timestamp};
use crate::render::{Document, RenderContext, Table, field, record_name};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

const SECS_PER_DAY: i64 = 86_400;

/// Raw certificate type codes and their display names.
const CERT_TYPES: &[(&str, &str)] = &[
    ("local-cer", "Local Certificate"),
    ("remote-cer", "Remote Certificate"),
    ("local-ca", "Local CA"),
    ("remote-ca", "Remote CA"),
    ("crl", "CRL"),
    ("local-ssh", "Local SSH"),
];

/// Boolean flags that make up the usage column.
const USAGE_FLAGS: &[(&str, &str)] = &[
    ("is_ssl_server_cert", "SSL Server"),
    ("is_ssl_client_cert", "SSL Client"),
    ("is_proxy_ssl_cert", "Proxy SSL"),
    ("is_general_allowable_cert", "General"),
    ("is_default_local", "Default"),
];

pub fn cert_type(value: &Value) -> String {
    let raw = flatten(value);
    CERT_TYPES
        .iter()
        .find(|(code, _)| raw.eq_ignore_ascii_case(code))
        .map(|(_, label)| (*label).to_string())
        .unwrap_or(raw)
}

fn usage(record: &Map<String, Value>) -> String {
    let flags: Vec<&str> = USAGE_FLAGS
        .iter()
        .filter(|(key, _)| matches!(field(record, key), Some(Value::Bool(true))))
        .map(|(_, label)| *label)
        .collect();
    if flags.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        flags.join(", ")
    }
}

fn key_summary(record: &Map<String, Value>) -> String {
    let parts: Vec<String> = ["key_type", "key_size"]
        .iter()
        .filter_map(|key| field(record, key).map(flatten))
        .collect();
    if parts.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        parts.join(" ")
    }
}

/// Distinguished name as `CN=fw, O=Fortinet`.
pub fn distinguished_name(value: &Value) -> String {
    match value {
        Value::Object(parts) if !parts.is_empty() => parts
            .iter()
            .map(|(k, v)| format!("{k}={}", flatten(v)))
            .collect::<Vec<_>>()
            .join(", "),
        other => flatten(other),
    }
}

/// Whole days until `valid_to`, or how long ago it lapsed.
pub fn days_remaining(valid_to: &Value, now: DateTime<Utc>) -> String {
    let Some(expiry) = as_number(valid_to) else {
        return PLACEHOLDER.to_string();
    };
    let remaining = (expiry as i64).saturating_sub(now.timestamp());
    if remaining < 0 {
        format!("Expired {} days ago", remaining.unsigned_abs() / SECS_PER_DAY as u64)
    } else {
        format!("{} days", remaining / SECS_PER_DAY)
    }
}

fn or_dash(record: &Map<String, Value>, key: &str, f: impl Fn(&Value) -> String) -> String {
    field(record, key)
        .map(f)
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

pub fn certificates(records: &[Map<String, Value>], ctx: &RenderContext) -> Document {
    if records.is_empty() {
        return ctx.no_data();
    }

    let mut overview = Table::new(
        ["Name", "Type", "Source", "Status", "Key", "CA", "Usage"],
        ctx.width,
    );
    let mut validity = Table::new(["Name", "Valid From", "Valid To", "Remaining"], ctx.width);
    let mut subjects = Table::new(["Name", "Subject", "Issuer"], ctx.width);
    let mut fingerprints = Table::new(["Name", "Fingerprint", "Extensions"], ctx.width);

    for (idx, cert) in records.iter().enumerate() {
        let name = record_name(cert, &format!("cert-{}", idx + 1));
        overview.push_row(vec![
            name.clone(),
            or_dash(cert, "type", cert_type),
            or_dash(cert, "source", flatten),
            or_dash(cert, "status", flatten),
            key_summary(cert),
            or_dash(cert, "is_ca", boolean),
            usage(cert),
        ]);

        if let Some(from) = field(cert, "valid_from")
            && let Some(to) = field(cert, "valid_to")
        {
            validity.push_row(vec![
                name.clone(),
                timestamp(from, TimestampStyle::Date),
                timestamp(to, TimestampStyle::Date),
                days_remaining(to, ctx.now),
            ]);
        }

        if let Some(subject) = field(cert, "subject") {
            subjects.push_row(vec![
                name.clone(),
                distinguished_name(subject),
                or_dash(cert, "issuer", distinguished_name),
            ]);
        }

        if let Some(fingerprint) = field(cert, "fingerprint") {
            fingerprints.push_row(vec![
                name.clone(),
                flatten(fingerprint),
                or_dash(cert, "ext", flatten),
            ]);
        }
    }

    let mut doc = Document::new();
    doc.section("Certificate Overview", overview);
    doc.section("Validity", validity);
    doc.section("Subject & Issuer", subjects);
    doc.section("Fingerprint & Extensions", fingerprints);
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderOptions;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn render_certs(body: Value) -> Document {
        let records: Vec<Map<String, Value>> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect();
        let opts = RenderOptions {
            endpoint: Some("/monitor/system/available-certificates".into()),
            now: Some(fixed_now()),
            ..RenderOptions::default()
        };
        let ctx = RenderContext::new(&opts);
        certificates(&records, &ctx)
    }

    #[test]
    fn days_remaining_both_directions() {
        let now = fixed_now();
        let in_ten_days = json!(now.timestamp() + 10 * SECS_PER_DAY + 5);
        let three_days_ago = json!(now.timestamp() - 3 * SECS_PER_DAY);
        assert_eq!(days_remaining(&in_ten_days, now), "10 days");
        assert_eq!(days_remaining(&three_days_ago, now), "Expired 3 days ago");
        assert_eq!(days_remaining(&json!("soon"), now), "-");
    }

    #[test]
    fn type_codes_are_normalized() {
        assert_eq!(cert_type(&json!("local-cer")), "Local Certificate");
        assert_eq!(cert_type(&json!("remote-ca")), "Remote CA");
        assert_eq!(cert_type(&json!("custom")), "custom");
    }

    #[test]
    fn sections_follow_available_fields() {
        let now = fixed_now().timestamp();
        let doc = render_certs(json!([
            {
                "name": "Fortinet_Factory", "type": "local-cer", "source": "factory",
                "status": "valid", "key_type": "RSA", "key_size": 2048, "is_ca": false,
                "is_ssl_server_cert": true, "is_proxy_ssl_cert": true,
                "valid_from": 1_600_000_000, "valid_to": now + 30 * SECS_PER_DAY,
                "subject": {"CN": "FGT60F", "O": "Fortinet"},
                "issuer": {"CN": "support", "O": "Fortinet"},
                "fingerprint": "AA:BB:CC",
                "ext": [{"name": "X509v3 Basic Constraints"}, {"name": "X509v3 Key Usage"}]
            },
            {"name": "Fortinet_CA", "type": "local-ca", "is_ca": true}
        ]));
        assert_eq!(
            doc.banners().collect::<Vec<_>>(),
            vec![
                "Certificate Overview",
                "Validity",
                "Subject & Issuer",
                "Fingerprint & Extensions"
            ]
        );
        let tables: Vec<&Table> = doc.tables().collect();
        assert_eq!(
            tables[0].rows(),
            [
                vec![
                    "Fortinet_Factory",
                    "Local Certificate",
                    "factory",
                    "valid",
                    "RSA 2048",
                    "No",
                    "SSL Server, Proxy SSL"
                ],
                vec!["Fortinet_CA", "Local CA", "-", "-", "-", "Yes", "-"],
            ]
        );
        assert_eq!(
            tables[1].rows(),
            [vec!["Fortinet_Factory", "2020-09-13", "2024-01-31", "30 days"]]
        );
        assert_eq!(
            tables[2].rows(),
            [vec!["Fortinet_Factory", "CN=FGT60F, O=Fortinet", "CN=support, O=Fortinet"]]
        );
        assert_eq!(
            tables[3].rows()[0][2],
            "X509v3 Basic Constraints, X509v3 Key Usage"
        );
    }

    #[test]
    fn expired_certificate_phrase() {
        let doc = render_certs(json!([
            {"name": "old", "valid_from": 1_500_000_000, "valid_to": 1_600_000_000}
        ]));
        let validity = doc.tables().nth(1).unwrap();
        assert!(validity.rows()[0][3].starts_with("Expired "));
        assert!(validity.rows()[0][3].ends_with(" days ago"));
    }
}
