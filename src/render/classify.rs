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

//! Picks a rendering strategy from the endpoint path and the response shape.

use serde_json::Value;

/// How a response gets rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Root is not a JSON object.
    Unsupported,
    FlatList,
    /// Per-metric min/max/average across time windows.
    TimeSeries,
    /// SD-WAN health-check members grouped by category.
    NestedHealthCheck,
    InterfaceMonitor,
    InterfaceConfig,
    VpnTunnel,
    CertificateList,
    GenericNestedDict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Monitor,
    VirtualWan,
    Interface,
    VpnTunnel,
    Certificate,
}

const MARKERS: &[(Marker, &str)] = &[
    (Marker::Monitor, "monitor/"),
    (Marker::VirtualWan, "virtual-wan"),
    (Marker::Interface, "system/interface"),
    (Marker::VpnTunnel, "vpn/ipsec"),
    (Marker::Certificate, "certificate"),
];

fn has_marker(endpoint: &str, marker: Marker) -> bool {
    MARKERS
        .iter()
        .filter(|(m, _)| *m == marker)
        .any(|(_, pattern)| endpoint.contains(pattern))
}

/// JSON type name used in diagnostics.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_time_series(results: &serde_json::Map<String, Value>) -> bool {
    results.values().all(|series| {
        series
            .as_array()
            .and_then(|items| items.first())
            .and_then(Value::as_object)
            .is_some_and(|first| first.contains_key("historical"))
    })
}

pub fn classify(endpoint: &str, response: &Value, has_custom_fields: bool) -> Strategy {
    let Value::Object(envelope) = response else {
        return Strategy::Unsupported;
    };
    let results = envelope.get("results");

    if has_marker(endpoint, Marker::Monitor)
        && let Some(Value::Object(map)) = results
        && !map.is_empty()
    {
        if is_time_series(map) {
            return Strategy::TimeSeries;
        }
        if has_marker(endpoint, Marker::VirtualWan) {
            return Strategy::NestedHealthCheck;
        }
        if has_marker(endpoint, Marker::Interface) {
            return Strategy::InterfaceMonitor;
        }
        return Strategy::GenericNestedDict;
    }

    if has_custom_fields {
        return Strategy::FlatList;
    }

    match results {
        Some(Value::Array(_)) if has_marker(endpoint, Marker::Interface) => {
            Strategy::InterfaceConfig
        }
        Some(Value::Object(_)) if has_marker(endpoint, Marker::Interface) => {
            Strategy::InterfaceMonitor
        }
        Some(Value::Array(_)) if has_marker(endpoint, Marker::VpnTunnel) => Strategy::VpnTunnel,
        Some(Value::Array(_)) if has_marker(endpoint, Marker::Certificate) => {
            Strategy::CertificateList
        }
        _ => Strategy::FlatList,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_objects_are_unsupported() {
        assert_eq!(classify("/cmdb/x", &json!("text"), false), Strategy::Unsupported);
        assert_eq!(classify("/cmdb/x", &json!([1, 2]), false), Strategy::Unsupported);
    }

    #[test]
    fn monitor_time_series() {
        let body = json!({"results": {"cpu": [{"current": 5, "historical": {}}]}});
        assert_eq!(
            classify("/monitor/system/resource/usage", &body, false),
            Strategy::TimeSeries
        );
    }

    #[test]
    fn monitor_nested_variants() {
        let body = json!({"results": {"a": {"b": {"status": "up"}}}});
        assert_eq!(
            classify("/monitor/virtual-wan/health-check", &body, false),
            Strategy::NestedHealthCheck
        );
        assert_eq!(
            classify("/monitor/system/interface", &body, false),
            Strategy::InterfaceMonitor
        );
        assert_eq!(
            classify("/monitor/system/status", &body, false),
            Strategy::GenericNestedDict
        );
    }

    #[test]
    fn interface_config_and_specialised_lists() {
        let list = json!({"results": [{"name": "port1"}]});
        assert_eq!(
            classify("/cmdb/system/interface", &list, false),
            Strategy::InterfaceConfig
        );
        assert_eq!(
            classify("/cmdb/system/interface", &list, true),
            Strategy::FlatList
        );
        assert_eq!(classify("/monitor/vpn/ipsec", &list, false), Strategy::VpnTunnel);
        assert_eq!(
            classify("/monitor/system/available-certificates", &list, false),
            Strategy::CertificateList
        );
        assert_eq!(classify("/cmdb/firewall/address", &list, false), Strategy::FlatList);
    }

    #[test]
    fn non_monitor_interface_mapping() {
        let body = json!({"results": {"port1": {"link": true}}});
        assert_eq!(
            classify("/system/interface", &body, false),
            Strategy::InterfaceMonitor
        );
    }

    #[test]
    fn empty_monitor_mapping_falls_through() {
        let body = json!({"results": {}});
        assert_eq!(classify("/monitor/system/status", &body, false), Strategy::FlatList);
    }
}
