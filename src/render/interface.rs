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

//! Interface tables: live monitor data and CMDB configuration.

use crate::render::fields::FieldCap;
use crate::render::format::{
    ByteUnits, PLACEHOLDER, byte_size, flatten, ip_mask, ip_with_mask, link_speed, mac,
    packet_count, speed_duplex,
};
use crate::render::{Document, RenderContext, Table, field, record_name};
use serde_json::{Map, Value};
use std::net::IpAddr;

/// Configuration responses with at most this many distinct fields are
/// treated as already filtered and shown as one table.
pub const FILTERED_FIELD_LIMIT: usize = 10;

/// Semantic column groups for interface configuration, in display order.
pub static GROUPS: &[(&str, &[&str])] = &[
    (
        "Basic Information",
        &["vdom", "type", "mode", "status", "alias", "description", "role"],
    ),
    (
        "Network Configuration",
        &["ip", "allowaccess", "secondary-IP", "defaultgw", "gwdetect", "ip6-mode", "vrf"],
    ),
    (
        "Physical Properties",
        &["macaddr", "speed", "mtu-override", "mtu", "mediatype", "lldp-transmission"],
    ),
    (
        "DHCP/DNS",
        &[
            "dhcp-relay-service",
            "dhcp-relay-ip",
            "dhcp-client-identifier",
            "dns-server-override",
            "dns-server-protocol",
        ],
    ),
    (
        "Security",
        &[
            "security-mode",
            "device-identification",
            "src-check",
            "ips-sniffer-mode",
            "fail-detect",
            "explicit-web-proxy",
        ],
    ),
    (
        "Traffic Shaping",
        &[
            "inbandwidth",
            "outbandwidth",
            "egress-shaping-profile",
            "ingress-shaping-profile",
            "estimated-upstream-bandwidth",
            "estimated-downstream-bandwidth",
        ],
    ),
    (
        "Advanced Features",
        &["snmp-index", "tcp-mss", "netbios-forward", "monitor-bandwidth", "weight", "priority"],
    ),
    (
        "VLAN/Aggregation",
        &["interface", "vlanid", "member", "lacp-mode", "algorithm", "min-links"],
    ),
];

/// Values that count as "not configured" when deciding whether a group
/// has anything to show.
pub fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => {
            let s = s.trim();
            s.is_empty() || s.eq_ignore_ascii_case("disable") || is_zero_address(s)
        }
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn is_zero_address(text: &str) -> bool {
    text.split(['/', ' '])
        .filter(|part| !part.is_empty())
        .all(|part| part.parse::<IpAddr>().is_ok_and(|ip| ip.is_unspecified()) || part == "0")
}

fn format_value(key: &str, value: &Value) -> String {
    match key {
        "ip" => ip_mask(value),
        "speed" => speed_duplex(value),
        "macaddr" => mac(value),
        _ => flatten(value),
    }
}

fn cell(record: &Map<String, Value>, key: &str) -> String {
    match field(record, key) {
        Some(value) => format_value(key, value),
        None => PLACEHOLDER.to_string(),
    }
}

/// `results` from `/monitor/system/interface`, keyed by interface name.
pub fn monitor(results: &Map<String, Value>, ctx: &RenderContext) -> Document {
    let interfaces: Vec<(String, &Map<String, Value>)> = results
        .iter()
        .filter_map(|(key, value)| {
            let record = value.as_object()?;
            Some((record_name(record, key), record))
        })
        .collect();
    if interfaces.is_empty() {
        return ctx.no_data();
    }

    let mut overview = Table::new(
        ["Interface", "Status", "MAC", "IP Address", "Speed/Duplex", "Alias"],
        ctx.width,
    );
    let mut traffic = Table::new(
        ["Interface", "RX Packets", "TX Packets", "RX Bytes", "TX Bytes", "RX Errors", "TX Errors"],
        ctx.width,
    );
    let count = |record: &Map<String, Value>, key: &str| match field(record, key) {
        Some(value) => packet_count(value),
        None => PLACEHOLDER.to_string(),
    };
    let bytes = |record: &Map<String, Value>, key: &str| match field(record, key) {
        Some(value) => byte_size(value, ByteUnits::Bare),
        None => PLACEHOLDER.to_string(),
    };

    for (name, record) in &interfaces {
        let status = match field(record, "link") {
            Some(Value::Bool(true)) => "Up".to_string(),
            Some(Value::Bool(false)) => "Down".to_string(),
            Some(other) => flatten(other),
            None => PLACEHOLDER.to_string(),
        };
        overview.push_row(vec![
            name.clone(),
            status,
            field(record, "mac").map(mac).unwrap_or_else(|| PLACEHOLDER.to_string()),
            ip_with_mask(field(record, "ip"), field(record, "mask")),
            link_speed(field(record, "speed"), field(record, "duplex")),
            field(record, "alias")
                .map(flatten)
                .filter(|alias| !alias.is_empty())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
        ]);

        let active = ["tx_packets", "rx_packets"]
            .iter()
            .any(|key| field(record, key).is_some_and(|v| !is_unset(v)));
        if active {
            traffic.push_row(vec![
                name.clone(),
                count(record, "rx_packets"),
                count(record, "tx_packets"),
                bytes(record, "rx_bytes"),
                bytes(record, "tx_bytes"),
                count(record, "rx_errors"),
                count(record, "tx_errors"),
            ]);
        }
    }

    let mut doc = Document::new();
    doc.section("Interface Overview", overview);
    doc.section("Interface Traffic", traffic);
    doc
}

/// Distinct keys across all records, `name` first, then first-seen order.
fn present_fields(records: &[Map<String, Value>]) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    let mut has_name = false;
    for record in records {
        for key in record.keys() {
            if key == "name" {
                has_name = true;
            } else if !fields.contains(key) {
                fields.push(key.clone());
            }
        }
    }
    if has_name {
        fields.insert(0, "name".to_string());
    }
    fields
}

fn rows_table(
    records: &[Map<String, Value>],
    columns: &[String],
    width: Option<usize>,
) -> Table {
    let mut table = Table::new(columns.iter().cloned(), width);
    for record in records {
        table.push_row(columns.iter().map(|key| cell(record, key)).collect());
    }
    table
}

/// Group table: `name` first and uncapped, the rest capped. Returns the
/// table and the number of dropped columns.
fn group_table(
    records: &[Map<String, Value>],
    mut columns: Vec<String>,
    ctx: &RenderContext,
) -> (Table, usize) {
    let total = columns.len();
    ctx.cap.apply(&mut columns);
    let dropped = total - columns.len();
    if records.iter().any(|r| r.contains_key("name")) {
        columns.insert(0, "name".to_string());
    }
    (rows_table(records, &columns, ctx.width), dropped)
}

fn push_group(doc: &mut Document, title: &str, table: Table, dropped: usize, cap: FieldCap) {
    if !doc.section(title, table) {
        return;
    }
    if dropped > 0
        && let FieldCap::Limited(limit) = cap
    {
        doc.note(format!(
            "({dropped} more field(s) not shown, limit is {limit})"
        ));
    }
}

/// `results` from `/cmdb/system/interface`.
pub fn config(records: &[Map<String, Value>], ctx: &RenderContext) -> Document {
    if records.is_empty() {
        return ctx.no_data();
    }
    let fields = present_fields(records);
    let mut doc = Document::message(format!(
        "Endpoint: {} | Interfaces: {}",
        ctx.source(),
        records.len()
    ));

    if fields.len() <= FILTERED_FIELD_LIMIT {
        doc.table(rows_table(records, &fields, ctx.width));
        return doc;
    }

    let grouped: Vec<&str> = GROUPS.iter().flat_map(|(_, keys)| keys.iter().copied()).collect();
    for (title, keys) in GROUPS {
        let columns: Vec<String> = keys
            .iter()
            .filter(|key| records.iter().any(|r| r.contains_key(**key)))
            .map(|key| (*key).to_string())
            .collect();
        let configured = columns.iter().any(|key| {
            records
                .iter()
                .any(|r| field(r, key).is_some_and(|v| !is_unset(v)))
        });
        if !configured {
            continue;
        }
        let (table, dropped) = group_table(records, columns, ctx);
        push_group(&mut doc, title, table, dropped, ctx.cap);
    }

    let extra: Vec<String> = fields
        .into_iter()
        .filter(|key| key != "name" && !grouped.contains(&key.as_str()))
        .collect();
    if !extra.is_empty() {
        let (table, dropped) = group_table(records, extra, ctx);
        push_group(&mut doc, "Additional Fields", table, dropped, ctx.cap);
    }
    doc
}
