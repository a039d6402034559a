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

//! Column selection for flat tables.

use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_MAX_FIELDS: usize = 6;
/// Records inspected when detecting or filtering fields.
pub const SAMPLE_SIZE: usize = 10;

/// Preferred columns per endpoint. Matched by substring, first match wins,
/// so more specific patterns must come before their prefixes.
pub static ENDPOINT_FIELDS: &[(&str, &[&str])] = &[
    ("firewall/addrgrp6", &["name", "member", "comment"]),
    ("firewall/addrgrp", &["name", "member", "comment"]),
    ("firewall/address6", &["name", "ip6", "type", "comment"]),
    ("firewall/address", &["name", "subnet", "type", "comment"]),
    (
        "firewall/policy",
        &[
            "policyid", "name", "srcintf", "dstintf", "srcaddr", "dstaddr", "service", "action",
            "status",
        ],
    ),
    (
        "firewall.service/custom",
        &["name", "category", "protocol", "tcp-portrange", "udp-portrange", "comment"],
    ),
    ("firewall.service/group", &["name", "member", "comment"]),
    (
        "firewall/vip",
        &["name", "type", "extip", "mappedip", "extintf", "portforward", "comment"],
    ),
    ("firewall/ippool", &["name", "type", "startip", "endip", "comments"]),
    (
        "router/static",
        &["seq-num", "dst", "gateway", "device", "distance", "status", "comment"],
    ),
    ("system/admin", &["name", "accprofile", "trusthost1", "vdom"]),
    ("system/dns", &["primary", "secondary", "domain", "protocol"]),
    ("user/local", &["name", "type", "status", "email-to", "two-factor"]),
    ("user/group", &["name", "group-type", "member"]),
    (
        "vpn.ipsec/phase1-interface",
        &["name", "interface", "remote-gw", "proposal", "peertype", "comments"],
    ),
    (
        "vpn.ipsec/phase2-interface",
        &["name", "phase1name", "src-subnet", "dst-subnet", "proposal"],
    ),
    (
        "firewall/session",
        &["proto", "saddr", "sport", "daddr", "dport", "policyid", "duration"],
    ),
    (
        "system/ha-peer",
        &["serial_no", "hostname", "priority", "vcluster_id"],
    ),
];

/// Upper bound on auto-detected columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCap {
    Limited(usize),
    Unlimited,
}

impl FieldCap {
    /// Unset falls back to [`DEFAULT_MAX_FIELDS`]; zero means unlimited.
    pub fn from_option(max_fields: Option<usize>) -> Self {
        match max_fields {
            None => Self::Limited(DEFAULT_MAX_FIELDS),
            Some(0) => Self::Unlimited,
            Some(n) => Self::Limited(n),
        }
    }

    pub fn apply<T>(self, items: &mut Vec<T>) {
        if let Self::Limited(n) = self {
            items.truncate(n);
        }
    }
}

pub fn mapped_fields(endpoint: &str) -> Option<&'static [&'static str]> {
    ENDPOINT_FIELDS
        .iter()
        .find(|(pattern, _)| endpoint.contains(pattern))
        .map(|(_, fields)| *fields)
}

pub fn select_fields(
    records: &[Map<String, Value>],
    endpoint: Option<&str>,
    cap: FieldCap,
) -> Vec<String> {
    let sample = &records[..records.len().min(SAMPLE_SIZE)];

    if let Some(mapped) = endpoint.and_then(mapped_fields) {
        let mut fields: Vec<String> = mapped
            .iter()
            .filter(|field| sample.iter().any(|record| record.contains_key(**field)))
            .map(|field| (*field).to_string())
            .collect();
        cap.apply(&mut fields);
        if !fields.is_empty() {
            debug!(?fields, "using mapped fields");
            return fields;
        }
    }

    let fields = detect_fields(sample, cap);
    debug!(?fields, "auto-detected fields");
    fields
}

/// Most frequent fields first; ties keep first-seen order.
fn detect_fields(sample: &[Map<String, Value>], cap: FieldCap) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for record in sample {
        for key in record.keys() {
            match index.get(key.as_str()) {
                Some(&slot) => counts[slot].1 += 1,
                None => {
                    index.insert(key.as_str(), counts.len());
                    counts.push((key.as_str(), 1));
                }
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let mut fields: Vec<String> = counts.into_iter().map(|(k, _)| k.to_string()).collect();
    cap.apply(&mut fields);
    fields
}
