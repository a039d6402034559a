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

use crate::render::format::{
    ByteUnits, DurationStyle, PLACEHOLDER, as_number, byte_size, duration, flatten, ip_mask,
};
use crate::render::{Document, RenderContext, Table, field, record_name};
use serde_json::{Map, Value};

const INFINITY: &str = "∞";

fn proxies(tunnel: &Map<String, Value>) -> impl Iterator<Item = &Map<String, Value>> {
    field(tunnel, "proxyid")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn proxy_is_up(proxy: &Map<String, Value>) -> bool {
    field(proxy, "status")
        .and_then(Value::as_str)
        .is_some_and(|s| s.eq_ignore_ascii_case("up"))
}

fn or_dash(record: &Map<String, Value>, key: &str, f: impl Fn(&Value) -> String) -> String {
    field(record, key)
        .map(f)
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn bytes(value: &Value) -> String {
    byte_size(value, ByteUnits::Suffixed)
}

/// Received over sent, or `∞` when nothing was sent but something arrived.
pub fn traffic_ratio(rx: f64, tx: f64) -> String {
    if tx > 0.0 {
        format!("{:.2}", rx / tx)
    } else if rx > 0.0 {
        INFINITY.to_string()
    } else {
        "0".to_string()
    }
}

/// Phase 2 selector list, e.g. `10.0.0.0/24, 10.1.0.0/16`.
fn selectors(value: &Value) -> String {
    let Value::Array(items) = value else {
        return flatten(value);
    };
    if items.is_empty() {
        return PLACEHOLDER.to_string();
    }
    items
        .iter()
        .map(|item| match item.get("subnet") {
            Some(subnet) => ip_mask(subnet),
            None => flatten(item),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn tunnels(records: &[Map<String, Value>], ctx: &RenderContext) -> Document {
    if records.is_empty() {
        return ctx.no_data();
    }

    let mut overview = Table::new(
        ["Tunnel", "Status", "Remote Gateway", "Tunnel ID", "Connections", "Uptime"],
        ctx.width,
    );
    let mut traffic = Table::new(["Tunnel", "RX Bytes", "TX Bytes", "RX/TX Ratio"], ctx.width);
    let mut phase2 = Table::new(
        [
            "Tunnel",
            "Phase 2",
            "Local Selector",
            "Remote Selector",
            "RX Bytes",
            "TX Bytes",
            "Expires",
        ],
        ctx.width,
    );

    for (idx, tunnel) in records.iter().enumerate() {
        let name = record_name(tunnel, &format!("tunnel-{}", idx + 1));
        let status = if proxies(tunnel).any(proxy_is_up) {
            "UP"
        } else {
            "DOWN"
        };
        overview.push_row(vec![
            name.clone(),
            status.to_string(),
            or_dash(tunnel, "rgwy", flatten),
            or_dash(tunnel, "tun_id", flatten),
            or_dash(tunnel, "connection_count", flatten),
            or_dash(tunnel, "creation_time", |v| duration(v, DurationStyle::Long)),
        ]);

        let rx = field(tunnel, "incoming_bytes").and_then(as_number).unwrap_or(0.0);
        let tx = field(tunnel, "outgoing_bytes").and_then(as_number).unwrap_or(0.0);
        if rx != 0.0 || tx != 0.0 {
            traffic.push_row(vec![
                name.clone(),
                or_dash(tunnel, "incoming_bytes", bytes),
                or_dash(tunnel, "outgoing_bytes", bytes),
                traffic_ratio(rx, tx),
            ]);
        }

        for proxy in proxies(tunnel).filter(|p| proxy_is_up(p)) {
            phase2.push_row(vec![
                name.clone(),
                or_dash(proxy, "p2name", flatten),
                or_dash(proxy, "proxy_src", selectors),
                or_dash(proxy, "proxy_dst", selectors),
                or_dash(proxy, "incoming_bytes", bytes),
                or_dash(proxy, "outgoing_bytes", bytes),
                or_dash(proxy, "expire", |v| duration(v, DurationStyle::Countdown)),
            ]);
        }
    }

    let mut doc = Document::new();
    doc.section("Tunnel Overview", overview);
    doc.section("Traffic Statistics", traffic);
    doc.section("Phase 2 Selectors", phase2);
    doc
}
