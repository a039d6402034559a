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

//! Adaptive table rendering for FortiGate API responses.
//!
//! [`render_document`] classifies a response body, picks a [`Strategy`], selects
//! columns where needed and lays the result out as one or more ASCII grid
//! tables. Rendering is pure: no I/O, no shared state, and no panics for
//! any JSON input.

pub mod certificate;
pub mod classify;
pub mod fields;
pub mod flat;
pub mod format;
pub mod interface;
pub mod metrics;
pub mod table;
pub mod vpn;

pub use classify::{Strategy, classify};
pub use table::{Document, Table};

use chrono::{DateTime, Utc};
use fields::FieldCap;
use serde_json::{Map, Value};
use tracing::debug;

/// Caller-selected knobs for one render.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Resource path the response came from, e.g. `/cmdb/firewall/address`.
    pub endpoint: Option<String>,
    /// Explicit columns; disables auto-detection and the specialised layouts.
    pub custom_fields: Option<Vec<String>>,
    /// Longest allowed cell, in characters. Zero means no limit.
    pub max_cell_width: Option<usize>,
    /// Cap on auto-detected columns. Unset means 6, zero means unlimited.
    pub max_fields: Option<usize>,
    /// Clock used for certificate expiry; the wall clock when unset.
    pub now: Option<DateTime<Utc>>,
}

/// Resolved options handed to each strategy renderer.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    pub endpoint: &'a str,
    pub custom_fields: Option<&'a [String]>,
    pub width: Option<usize>,
    pub cap: FieldCap,
    pub now: DateTime<Utc>,
}

impl<'a> RenderContext<'a> {
    pub fn new(opts: &'a RenderOptions) -> Self {
        Self {
            endpoint: opts.endpoint.as_deref().unwrap_or_default(),
            custom_fields: opts
                .custom_fields
                .as_deref()
                .filter(|fields| !fields.is_empty()),
            width: opts.max_cell_width.filter(|&w| w > 0),
            cap: FieldCap::from_option(opts.max_fields),
            now: opts.now.unwrap_or_else(Utc::now),
        }
    }

    /// Label used in summaries and "no data" messages.
    pub fn source(&self) -> &str {
        if self.endpoint.is_empty() {
            "response"
        } else {
            self.endpoint
        }
    }

    pub fn no_data(&self) -> Document {
        Document::message(format!("No data returned from {}", self.source()))
    }
}

/// Lays a response body out as a document. Never panics for any JSON value;
/// bodies that cannot be tabulated yield a document without tables.
pub fn render_document(response: &Value, opts: &RenderOptions) -> Document {
    let ctx = RenderContext::new(opts);
    let strategy = classify(ctx.endpoint, response, ctx.custom_fields.is_some());
    debug!(?strategy, endpoint = ctx.endpoint, "rendering response");

    let results = response.get("results");
    match strategy {
        Strategy::Unsupported => Document::message(format!(
            "Cannot render a {} response as a table",
            classify::type_name(response)
        )),
        Strategy::FlatList => flat::flat_list(response, &ctx),
        Strategy::TimeSeries => match results.and_then(Value::as_object) {
            Some(map) => metrics::time_series(map, &ctx),
            None => ctx.no_data(),
        },
        Strategy::NestedHealthCheck => match results.and_then(Value::as_object) {
            Some(map) => metrics::health_check(map, &ctx),
            None => ctx.no_data(),
        },
        Strategy::InterfaceMonitor => match results.and_then(Value::as_object) {
            Some(map) => interface::monitor(map, &ctx),
            None => ctx.no_data(),
        },
        Strategy::InterfaceConfig => interface::config(&records_of(results), &ctx),
        Strategy::VpnTunnel => vpn::tunnels(&records_of(results), &ctx),
        Strategy::CertificateList => certificate::certificates(&records_of(results), &ctx),
        Strategy::GenericNestedDict => match results.and_then(Value::as_object) {
            Some(map) => flat::nested_dict(map, &ctx),
            None => ctx.no_data(),
        },
    }
}

/// Object items of an optional `results` sequence; everything else is skipped.
pub(crate) fn records_of(results: Option<&Value>) -> Vec<Map<String, Value>> {
    results
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Field lookup that treats JSON null like a missing key.
pub(crate) fn field<'v>(record: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    record.get(key).filter(|v| !v.is_null())
}

/// Display name of a record, falling back to `fallback`.
pub(crate) fn record_name(record: &Map<String, Value>, fallback: &str) -> String {
    match field(record, "name") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(other @ Value::Number(_)) => other.to_string(),
        _ => fallback.to_string(),
    }
}
