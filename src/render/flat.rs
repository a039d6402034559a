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

use crate::render::fields::select_fields;
use crate::render::format::{PLACEHOLDER, flatten, format_field};
use crate::render::{Document, RenderContext, Table};
use serde_json::{Map, Value};

/// Records of a flat response: `results`, else a `data` list, else the
/// envelope itself. Scalars inside a list are wrapped as `{"value": ...}`.
pub fn extract_records(response: &Value) -> Vec<Map<String, Value>> {
    let Value::Object(envelope) = response else {
        return Vec::new();
    };
    match envelope.get("results") {
        Some(Value::Array(items)) => return items.iter().map(as_record).collect(),
        Some(Value::Object(map)) => return vec![map.clone()],
        _ => {}
    }
    if let Some(Value::Array(items)) = envelope.get("data") {
        return items.iter().map(as_record).collect();
    }
    vec![envelope.clone()]
}

fn as_record(item: &Value) -> Map<String, Value> {
    match item {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other.clone());
            map
        }
    }
}

pub fn flat_list(response: &Value, ctx: &RenderContext) -> Document {
    render_records(&extract_records(response), ctx)
}

/// One row per record, columns from the custom list or the field selector.
pub fn render_records(records: &[Map<String, Value>], ctx: &RenderContext) -> Document {
    if records.is_empty() {
        return ctx.no_data();
    }
    let fields = match ctx.custom_fields {
        Some(custom) => custom.to_vec(),
        None => select_fields(records, Some(ctx.endpoint), ctx.cap),
    };
    if fields.is_empty() {
        return Document::message(format!(
            "No displayable fields found in {} ({} record(s))",
            ctx.source(),
            records.len()
        ));
    }

    let mut table = Table::new(fields.iter().cloned(), ctx.width);
    for record in records {
        table.push_row(
            fields
                .iter()
                .map(|f| match record.get(f) {
                    Some(value) => format_field(f, value),
                    None => PLACEHOLDER.to_string(),
                })
                .collect(),
        );
    }

    let mut doc = Document::message(format!(
        "Endpoint: {} | Records: {}",
        ctx.source(),
        records.len()
    ));
    doc.table(table);
    doc
}

/// `results` keyed by name. Nested objects become records tagged with their
/// key; anything else is shown as a property list.
pub fn nested_dict(results: &Map<String, Value>, ctx: &RenderContext) -> Document {
    if results.is_empty() {
        return ctx.no_data();
    }
    if results.values().all(Value::is_object) {
        let records: Vec<Map<String, Value>> = results
            .iter()
            .filter_map(|(key, value)| {
                let inner = value.as_object()?;
                let mut record = Map::new();
                record.insert("name".to_string(), Value::String(key.clone()));
                for (k, v) in inner {
                    if k != "name" {
                        record.insert(k.clone(), v.clone());
                    }
                }
                Some(record)
            })
            .collect();
        return render_records(&records, ctx);
    }

    let mut table = Table::new(["Property", "Value"], ctx.width);
    for (key, value) in results {
        table.push_row(vec![key.clone(), flatten(value)]);
    }
    let mut doc = Document::message(format!(
        "Endpoint: {} | Properties: {}",
        ctx.source(),
        results.len()
    ));
    doc.table(table);
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RenderOptions, render_document};
    use proptest::prelude::*;
    use serde_json::json;

    fn options(endpoint: &str, max_fields: Option<usize>) -> RenderOptions {
        RenderOptions {
            endpoint: Some(endpoint.to_string()),
            max_fields,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn extracts_results_data_or_envelope() {
        assert_eq!(extract_records(&json!({"results": [{"a": 1}, 2]})).len(), 2);
        assert_eq!(extract_records(&json!({"results": {"a": 1}}))[0]["a"], 1);
        assert_eq!(extract_records(&json!({"data": [{"b": 1}]}))[0]["b"], 1);
        let wrapped = extract_records(&json!({"status": "success"}));
        assert_eq!(wrapped[0]["status"], "success");
        assert_eq!(extract_records(&json!({"results": ["x"]}))[0]["value"], "x");
    }

    #[test]
    fn policies_flatten_named_lists() {
        let body = json!({"results": [{
            "policyid": 1, "name": "Allow-Internal",
            "srcintf": [{"name": "internal"}, {"name": "dmz"}],
            "dstintf": [{"name": "wan1"}],
            "srcaddr": [{"name": "all"}], "dstaddr": [{"name": "all"}],
            "action": "accept", "status": "enable"
        }]});
        let opts = options("/cmdb/firewall/policy", None);
        let ctx = RenderContext::new(&opts);
        let doc = flat_list(&body, &ctx);
        let table = doc.tables().next().unwrap();
        assert_eq!(
            table.headers(),
            ["policyid", "name", "srcintf", "dstintf", "srcaddr", "dstaddr"]
        );
        assert_eq!(table.rows()[0][2], "internal, dmz");
    }

    #[test]
    fn field_cap_limits_detected_columns() {
        let body = json!({"results": [{"a": 1, "b": 2, "c": 3, "d": 4}]});
        let opts = options("/cmdb/unknown", Some(2));
        let ctx = RenderContext::new(&opts);
        let doc = flat_list(&body, &ctx);
        assert_eq!(doc.tables().next().unwrap().headers(), ["a", "b"]);
    }

    #[test]
    fn empty_results_say_no_data() {
        let opts = options("/cmdb/firewall/address", None);
        let ctx = RenderContext::new(&opts);
        let doc = flat_list(&json!({"results": []}), &ctx);
        assert_eq!(doc.tables().count(), 0);
        assert!(doc.render().contains("No data returned from /cmdb/firewall/address"));
    }

    #[test]
    fn fieldless_records_are_reported() {
        let doc = render_document(&json!({"results": [{}]}), &options("/cmdb/x", None));
        assert!(!doc.has_tables());
        assert_eq!(doc.render(), "No displayable fields found in /cmdb/x (1 record(s))\n");
    }

    #[test]
    fn empty_monitor_map_has_no_fields() {
        let doc = render_document(
            &json!({"results": {}}),
            &options("/monitor/system/status", None),
        );
        assert!(!doc.has_tables());
        assert_eq!(
            doc.render(),
            "No displayable fields found in /monitor/system/status (1 record(s))\n"
        );
    }

    #[test]
    fn nested_objects_become_named_records() {
        let results = json!({
            "port1": {"status": "up", "speed": 1000},
            "port2": {"status": "down", "speed": 100}
        });
        let opts = options("/monitor/custom", None);
        let ctx = RenderContext::new(&opts);
        let doc = nested_dict(results.as_object().unwrap(), &ctx);
        let table = doc.tables().next().unwrap();
        assert_eq!(table.headers(), ["name", "status", "speed"]);
        assert_eq!(table.rows()[1], vec!["port2", "down", "100"]);
    }

    #[test]
    fn scalar_values_become_property_list() {
        let results = json!({"hostname": "fw01", "version": "v7.2.5", "ha": {"mode": "a-p", "x": 1}});
        let opts = options("/monitor/system/status", None);
        let ctx = RenderContext::new(&opts);
        let doc = nested_dict(results.as_object().unwrap(), &ctx);
        let table = doc.tables().next().unwrap();
        assert_eq!(table.headers(), ["Property", "Value"]);
        assert_eq!(table.rows()[0], vec!["hostname", "fw01"]);
    }

    fn arb_record() -> impl Strategy<Value = Map<String, Value>> {
        prop::collection::vec(("[a-z]{1,6}", 0i64..1000), 0..12)
            .prop_map(|pairs| pairs.into_iter().map(|(k, v)| (k, json!(v))).collect())
    }

    proptest! {
        #[test]
        fn flat_columns_respect_cap(
            records in prop::collection::vec(arb_record(), 1..8),
            cap in 1usize..8,
        ) {
            let opts = options("/cmdb/unknown", Some(cap));
            let ctx = RenderContext::new(&opts);
            let body = json!({"results": records});
            for table in flat_list(&body, &ctx).tables() {
                prop_assert!(table.headers().len() <= cap);
            }
        }

        #[test]
        fn nested_columns_respect_cap(
            entries in prop::collection::btree_map("[a-z0-9]{1,6}", arb_record(), 1..8),
            cap in 1usize..8,
        ) {
            let results: Map<String, Value> = entries
                .into_iter()
                .map(|(key, record)| (key, Value::Object(record)))
                .collect();
            let opts = options("/monitor/unknown", Some(cap));
            let ctx = RenderContext::new(&opts);
            for table in nested_dict(&results, &ctx).tables() {
                prop_assert!(table.headers().len() <= cap);
            }
        }
    }
}
