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

//! Value formatters for table cells.
//!
//! Every function here is total: a value of an unexpected JSON type falls
//! back to [`flatten`] instead of failing, so a malformed field can never
//! abort rendering.

use chrono::DateTime;
use serde_json::Value;
use std::net::Ipv4Addr;

/// Shown for missing or null values.
pub const PLACEHOLDER: &str = "-";
/// Appended to truncated cells.
pub const ELLIPSIS: &str = "...";

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;
const SECS_PER_HOUR: i64 = 3600;
const SECS_PER_DAY: i64 = 86_400;

/// Whether small byte counts carry a trailing `B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteUnits {
    /// `512`, used by the interface tables.
    Bare,
    /// `512B`, used by the tunnel and health-check tables.
    Suffixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationStyle {
    /// Elapsed time: `3d 4h`, `2h 5m`, `7m`.
    Long,
    /// Countdown: `2h 5m`, `7m 12s`, `40s`.
    Countdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampStyle {
    DateTime,
    Date,
}

/// Cuts `text` to at most `width` characters, ending in [`ELLIPSIS`] when
/// there is room for it.
pub fn truncate(text: &str, width: Option<usize>) -> String {
    let Some(width) = width else {
        return text.to_string();
    };
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= ELLIPSIS.len() {
        return text.chars().take(width).collect();
    }
    let mut out: String = text.chars().take(width - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Generic string conversion used as the fallback of every other formatter.
pub fn flatten(value: &Value) -> String {
    match value {
        Value::Null => PLACEHOLDER.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.is_empty() => PLACEHOLDER.to_string(),
        Value::Array(items) => items.iter().map(flatten).collect::<Vec<_>>().join(", "),
        Value::Object(map) => {
            if let Some(name) = map.get("name") {
                return flatten(name);
            }
            if map.len() == 1
                && let Some(only) = map.values().next()
            {
                return flatten(only);
            }
            value.to_string()
        }
    }
}

/// Field-name aware conversion used by the flat tables.
pub fn format_field(field: &str, value: &Value) -> String {
    let lower = field.to_ascii_lowercase();
    if as_number(value).is_some() {
        if lower.ends_with("bytes") {
            return byte_size(value, ByteUnits::Suffixed);
        }
        if lower.ends_with("packets") {
            return packet_count(value);
        }
    }
    flatten(value)
}

/// Numeric view of a value; numeric strings count.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// `1234567` → `1,234,567`.
pub fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Integers print bare, fractions keep at most two decimals.
pub fn plain_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let fixed = format!("{n:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn byte_size(value: &Value, units: ByteUnits) -> String {
    let Some(bytes) = as_number(value) else {
        return flatten(value);
    };
    if bytes >= GIB {
        format!("{:.1}G", bytes / GIB)
    } else if bytes >= MIB {
        format!("{:.1}M", bytes / MIB)
    } else if bytes >= KIB {
        format!("{:.1}K", bytes / KIB)
    } else {
        match units {
            ByteUnits::Bare => format!("{}", bytes as i64),
            ByteUnits::Suffixed => format!("{}B", bytes as i64),
        }
    }
}

pub fn packet_count(value: &Value) -> String {
    let Some(count) = as_number(value) else {
        return flatten(value);
    };
    if count >= 1e6 {
        format!("{:.1}M", count / 1e6)
    } else if count >= 1e3 {
        format!("{:.1}K", count / 1e3)
    } else {
        thousands(count as i64)
    }
}

pub fn bandwidth(value: &Value) -> String {
    let Some(rate) = as_number(value) else {
        return flatten(value);
    };
    if rate >= 1e6 {
        format!("{:.1}M", rate / 1e6)
    } else if rate >= 1e3 {
        format!("{:.1}K", rate / 1e3)
    } else {
        format!("{}", rate as i64)
    }
}

/// Formats a resource metric, choosing the unit from the metric name.
pub fn metric(name: &str, value: &Value) -> String {
    let Some(n) = as_number(value) else {
        return flatten(value);
    };
    let lower = name.to_ascii_lowercase();
    if ["cpu", "mem", "disk"].iter().any(|k| lower.contains(k)) {
        format!("{}%", plain_number(n))
    } else if lower.contains("session") || lower.contains("tunnel") {
        thousands(n.round() as i64)
    } else if lower.contains("rate") {
        format!("{}/s", plain_number(n))
    } else {
        plain_number(n)
    }
}

/// Number with a fixed two-decimal precision and a unit, e.g. `1.25ms`.
pub fn fixed_unit(value: &Value, unit: &str) -> String {
    match as_number(value) {
        Some(n) => format!("{n:.2}{unit}"),
        None => flatten(value),
    }
}

pub fn duration(value: &Value, style: DurationStyle) -> String {
    let Some(secs) = as_integer(value) else {
        return flatten(value);
    };
    let secs = secs.max(0);
    let days = secs / SECS_PER_DAY;
    let hours = secs / SECS_PER_HOUR;
    let minutes = (secs % SECS_PER_HOUR) / 60;
    match style {
        DurationStyle::Long => {
            if secs > SECS_PER_DAY {
                format!("{days}d {}h", hours % 24)
            } else if hours > 0 {
                format!("{hours}h {minutes}m")
            } else {
                format!("{minutes}m")
            }
        }
        DurationStyle::Countdown => {
            if hours > 0 {
                format!("{hours}h {minutes}m")
            } else if minutes > 0 {
                format!("{minutes}m {}s", secs % 60)
            } else {
                format!("{secs}s")
            }
        }
    }
}

/// Unix seconds as UTC text; values chrono cannot represent come back raw.
pub fn timestamp(value: &Value, style: TimestampStyle) -> String {
    let Some(secs) = as_integer(value) else {
        return flatten(value);
    };
    match DateTime::from_timestamp(secs, 0) {
        Some(at) => match style {
            TimestampStyle::DateTime => at.format("%Y-%m-%d %H:%M:%S").to_string(),
            TimestampStyle::Date => at.format("%Y-%m-%d").to_string(),
        },
        None => secs.to_string(),
    }
}

pub fn boolean(value: &Value) -> String {
    match value {
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        other => flatten(other),
    }
}

/// `"10000full"` → `10G Full`, `"100half"` → `100M Half`.
pub fn speed_duplex(value: &Value) -> String {
    let Value::String(raw) = value else {
        return flatten(value);
    };
    let lower = raw.trim().to_ascii_lowercase();
    let digits: String = lower.chars().take_while(|c| c.is_ascii_digit()).collect();
    let Ok(mbps) = digits.parse::<u64>() else {
        return raw.clone();
    };
    let speed = if mbps >= 1000 {
        format!("{}G", plain_number(mbps as f64 / 1000.0))
    } else {
        format!("{mbps}M")
    };
    let rest = &lower[digits.len()..];
    if rest.contains("full") {
        format!("{speed} Full")
    } else if rest.contains("half") {
        format!("{speed} Half")
    } else {
        speed
    }
}

/// Speed and duplex reported as separate monitor fields.
pub fn link_speed(speed: Option<&Value>, duplex: Option<&Value>) -> String {
    let Some(speed) = speed else {
        return PLACEHOLDER.to_string();
    };
    if let Value::String(_) = speed {
        return speed_duplex(speed);
    }
    match as_integer(speed) {
        Some(0) => PLACEHOLDER.to_string(),
        Some(mbps) => {
            let mode = match duplex {
                Some(Value::Number(n)) if n.as_i64() == Some(1) => "full",
                Some(Value::Number(_)) => "half",
                Some(Value::String(s)) => s.as_str(),
                Some(Value::Bool(true)) => "full",
                Some(Value::Bool(false)) => "half",
                _ => "",
            };
            speed_duplex(&Value::String(format!("{mbps}{mode}")))
        }
        None => flatten(speed),
    }
}

fn is_unspecified_ip(ip: &str) -> bool {
    match ip.parse::<std::net::IpAddr>() {
        Ok(addr) => addr.is_unspecified(),
        Err(_) => false,
    }
}

fn prefix_len(mask: &str) -> Option<u32> {
    let mask: Ipv4Addr = mask.parse().ok()?;
    let bits = u32::from(mask);
    let ones = bits.leading_ones();
    (bits.checked_shl(ones).unwrap_or(0) == 0).then_some(ones)
}

/// `"10.0.0.1 255.255.255.0"` or `"10.0.0.1/255.255.255.0"` → `10.0.0.1/24`.
/// Unspecified addresses render as [`PLACEHOLDER`].
pub fn ip_mask(value: &Value) -> String {
    let Value::String(raw) = value else {
        return flatten(value);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return PLACEHOLDER.to_string();
    }
    let mut parts = raw.splitn(2, ['/', ' ']);
    let ip = parts.next().unwrap_or_default().trim();
    let mask = parts.next().map(str::trim);
    if is_unspecified_ip(ip) {
        return PLACEHOLDER.to_string();
    }
    match mask {
        None => ip.to_string(),
        Some(mask) if mask.chars().all(|c| c.is_ascii_digit()) => format!("{ip}/{mask}"),
        Some(mask) => match prefix_len(mask) {
            Some(bits) => format!("{ip}/{bits}"),
            None => raw.to_string(),
        },
    }
}

/// Address plus a mask that may be a prefix length or a dotted quad.
pub fn ip_with_mask(ip: Option<&Value>, mask: Option<&Value>) -> String {
    let Some(Value::String(ip)) = ip else {
        return ip.map(flatten).unwrap_or_else(|| PLACEHOLDER.to_string());
    };
    let combined = match mask {
        Some(Value::Number(n)) => format!("{ip}/{n}"),
        Some(Value::String(m)) if !m.is_empty() => format!("{ip} {m}"),
        _ => ip.clone(),
    };
    ip_mask(&Value::String(combined))
}

/// MAC address with the all-zero sentinel hidden.
pub fn mac(value: &Value) -> String {
    match value {
        Value::String(s) if s.is_empty() => PLACEHOLDER.to_string(),
        Value::String(s) if s.chars().all(|c| c == '0' || c == ':' || c == '-') => {
            PLACEHOLDER.to_string()
        }
        other => flatten(other),
    }
}
