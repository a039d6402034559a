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

//! Monitor renderers: resource usage history and SD-WAN health checks.

use crate::render::format::{
    ByteUnits, PLACEHOLDER, TimestampStyle, bandwidth, byte_size, fixed_unit, flatten, metric,
    timestamp,
};
use crate::render::{Document, RenderContext, Table, field};
use serde_json::{Map, Value};

/// History windows, shortest first.
pub const TIME_WINDOWS: &[&str] = &["1-min", "10-min", "30-min", "1-hour", "12-hour", "24-hour"];

const TRAFFIC_FIELDS: &[&str] = &["tx_bandwidth", "rx_bandwidth", "tx_bytes", "rx_bytes"];

/// `npu_session` → `Npu Session`.
pub fn title_case(key: &str) -> String {
    key.split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn time_series(results: &Map<String, Value>, ctx: &RenderContext) -> Document {
    let mut doc = Document::new();
    for (name, series) in results {
        let entries: Vec<&Map<String, Value>> = series
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default();
        for (idx, entry) in entries.iter().enumerate() {
            let title = if entries.len() > 1 {
                format!("{} #{}", title_case(name), idx + 1)
            } else {
                title_case(name)
            };
            doc.section(title, series_table(name, entry, ctx));
        }
    }
    if doc.is_empty() {
        return ctx.no_data();
    }
    doc
}

fn series_table(name: &str, entry: &Map<String, Value>, ctx: &RenderContext) -> Table {
    let mut table = Table::new(["Period", "Min", "Max", "Average"], ctx.width);
    if let Some(current) = field(entry, "current") {
        let text = metric(name, current);
        table.push_row(vec!["Current".into(), text.clone(), text.clone(), text]);
    }
    let Some(history) = entry.get("historical").and_then(Value::as_object) else {
        return table;
    };
    for window in TIME_WINDOWS {
        let Some(stats) = history.get(*window).and_then(Value::as_object) else {
            continue;
        };
        let cell = |key: &str| {
            field(stats, key)
                .map(|v| metric(name, v))
                .unwrap_or_else(|| PLACEHOLDER.to_string())
        };
        table.push_row(vec![
            (*window).to_string(),
            cell("min"),
            cell("max"),
            cell("average"),
        ]);
    }
    table
}

/// `wan1_dup` → `wan1 (dup)`, `gw1_wan1` → `gw1 wan1`.
pub fn member_label(key: &str) -> String {
    key.replace("_dup", " (dup)").replace('_', " ")
}

fn is_up(member: &Map<String, Value>) -> bool {
    field(member, "status")
        .and_then(Value::as_str)
        .is_some_and(|s| s.eq_ignore_ascii_case("up"))
}

fn text_or_dash(member: &Map<String, Value>, key: &str, f: impl Fn(&Value) -> String) -> String {
    field(member, key)
        .map(f)
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

pub fn health_check(results: &Map<String, Value>, ctx: &RenderContext) -> Document {
    let mut doc = Document::new();
    for (category, members) in results {
        let Some(members) = members.as_object() else {
            doc.note(format!("{category}: {}", flatten(members)));
            continue;
        };
        let members: Vec<(String, &Map<String, Value>)> = members
            .iter()
            .filter_map(|(key, value)| Some((member_label(key), value.as_object()?)))
            .collect();
        if members.is_empty() {
            doc.note(format!("{category}: no members reported"));
            continue;
        }

        let mut status = Table::new(
            ["Member", "Status", "Latency", "Jitter", "Packet Loss"],
            ctx.width,
        );
        let mut traffic = Table::new(
            ["Member", "TX Bandwidth", "RX Bandwidth", "TX Bytes", "RX Bytes"],
            ctx.width,
        );
        let mut sla = Table::new(["Member", "SLA Targets Met", "State Changed"], ctx.width);

        for (label, member) in &members {
            status.push_row(vec![
                label.clone(),
                text_or_dash(member, "status", flatten),
                text_or_dash(member, "latency", |v| fixed_unit(v, "ms")),
                text_or_dash(member, "jitter", |v| fixed_unit(v, "ms")),
                text_or_dash(member, "packet_loss", |v| fixed_unit(v, "%")),
            ]);
            if !is_up(member) {
                continue;
            }
            if TRAFFIC_FIELDS.iter().any(|k| field(member, k).is_some()) {
                traffic.push_row(vec![
                    label.clone(),
                    text_or_dash(member, "tx_bandwidth", bandwidth),
                    text_or_dash(member, "rx_bandwidth", bandwidth),
                    text_or_dash(member, "tx_bytes", |v| byte_size(v, ByteUnits::Suffixed)),
                    text_or_dash(member, "rx_bytes", |v| byte_size(v, ByteUnits::Suffixed)),
                ]);
            }
            if field(member, "sla_targets_met").is_some() || field(member, "state_changed").is_some()
            {
                sla.push_row(vec![
                    label.clone(),
                    text_or_dash(member, "sla_targets_met", flatten),
                    text_or_dash(member, "state_changed", |v| {
                        timestamp(v, TimestampStyle::DateTime)
                    }),
                ]);
            }
        }

        doc.section(format!("{category} - Status & Performance"), status);
        doc.section(format!("{category} - Traffic"), traffic);
        doc.section(format!("{category} - SLA & Timing"), sla);
    }
    if doc.is_empty() {
        return ctx.no_data();
    }
    doc
}
