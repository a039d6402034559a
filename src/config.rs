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

use anyhow::{Context, Result};
use dirs::config_dir;
use ini::Ini;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
/// Section holding the connection settings in INI and wrapped JSON/YAML files.
pub const SECTION: &str = "fortigate";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "ip", skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apikey: Option<String>,
    #[serde(alias = "verify_ssl", skip_serializing_if = "Option::is_none")]
    pub verify_tls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_ssl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Config {
    /// Copy with secrets replaced, for display.
    pub fn masked(&self) -> Self {
        let mask = |secret: &Option<String>| secret.as_ref().map(|_| "*****".to_string());
        Self {
            password: mask(&self.password),
            apikey: mask(&self.apikey),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    User,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate a writable config directory for the current user")]
    MissingConfigDir,
    #[error("FortiGate host is required; pass --host or set it with `fgtctl configure --host <host>`")]
    MissingHost,
    #[error("either an API key or a password is required; pass --apikey or --password")]
    MissingCredentials,
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("unable to parse {0} as JSON, INI or YAML")]
    UnrecognizedFormat(PathBuf),
}

/// How requests authenticate. An API key wins over a password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    ApiKey(String),
    Password(String),
}

/// Fully resolved connection settings.
#[derive(Debug, Clone)]
pub struct Connection {
    pub host: String,
    pub username: String,
    pub auth: Auth,
    pub use_ssl: bool,
    pub verify_tls: bool,
    pub timeout: Duration,
}

pub fn config_path(scope: Scope, cwd: &Path) -> Result<PathBuf> {
    match scope {
        Scope::Local => Ok(cwd.join(".fgtctl.yaml")),
        Scope::User => {
            if let Ok(custom) = env::var("FGTCTL_CONFIG_DIR") {
                return Ok(PathBuf::from(custom).join("config.yaml"));
            }
            let base = config_dir().ok_or(ConfigError::MissingConfigDir)?;
            Ok(base.join("fgtctl").join("config.yaml"))
        }
    }
}

/// User scope overlaid with the local scope.
pub fn load(cwd: &Path) -> Result<Config> {
    let user = read_if_exists(&config_path(Scope::User, cwd)?)?.unwrap_or_default();
    let local = read_if_exists(&config_path(Scope::Local, cwd)?)?.unwrap_or_default();
    Ok(merge(user, local))
}

pub fn load_scope(scope: Scope, cwd: &Path) -> Result<Config> {
    Ok(read_if_exists(&config_path(scope, cwd)?)?.unwrap_or_default())
}

pub fn save(scope: Scope, config: &Config, cwd: &Path) -> Result<PathBuf> {
    let path = config_path(scope, cwd)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(config).context("serializing config")?;
    fs::write(&path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Ini,
    Yaml,
}

impl FileFormat {
    fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "ini" | "conf" | "cfg" => Some(Self::Ini),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Reads an explicit `--config` file. The extension picks the format; files
/// without a known one are tried as JSON, then INI, then YAML.
pub fn load_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()).into());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;

    if let Some(format) = FileFormat::from_extension(path) {
        debug!(?format, path = %path.display(), "loading config file");
        return parse_as(format, &contents).with_context(|| format!("parsing {:?}", path));
    }
    for format in [FileFormat::Json, FileFormat::Ini, FileFormat::Yaml] {
        if let Ok(config) = parse_as(format, &contents) {
            debug!(?format, path = %path.display(), "detected config format");
            return Ok(config);
        }
    }
    Err(ConfigError::UnrecognizedFormat(path.to_path_buf()).into())
}

fn parse_as(format: FileFormat, contents: &str) -> Result<Config> {
    match format {
        FileFormat::Json => {
            let mut value: serde_json::Value = serde_json::from_str(contents)?;
            if let Some(inner) = value.get_mut(SECTION).map(serde_json::Value::take) {
                value = inner;
            }
            Ok(serde_json::from_value(value)?)
        }
        FileFormat::Yaml => {
            let mut value: serde_yaml::Value = serde_yaml::from_str(contents)?;
            if let Some(inner) = value.get(SECTION).cloned() {
                value = inner;
            }
            Ok(serde_yaml::from_value(value)?)
        }
        FileFormat::Ini => parse_ini(contents),
    }
}

fn parse_ini(contents: &str) -> Result<Config> {
    let ini = Ini::load_from_str(contents)?;
    let props = ini
        .section(Some(SECTION))
        .unwrap_or_else(|| ini.general_section());
    let text = |key: &str| {
        props
            .get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let flag = |key: &str| text(key).and_then(|v| parse_bool(&v));

    Ok(Config {
        host: text("host").or_else(|| text("ip")),
        username: text("username"),
        password: text("password"),
        apikey: text("apikey"),
        verify_tls: flag("verify_tls").or_else(|| flag("verify_ssl")),
        use_ssl: flag("use_ssl"),
        timeout: text("timeout").and_then(|v| v.parse().ok()),
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Layers scopes, the optional explicit file and command-line overrides
/// (in that order) into connection settings.
pub fn resolve(cwd: &Path, explicit: Option<&Path>, overrides: Config) -> Result<Connection> {
    let mut merged = load(cwd)?;
    if let Some(path) = explicit {
        merged = merge(merged, load_file(path)?);
    }
    let merged = merge(merged, overrides);

    let host = non_empty(merged.host).ok_or(ConfigError::MissingHost)?;
    let auth = match (non_empty(merged.apikey), non_empty(merged.password)) {
        (Some(key), _) => Auth::ApiKey(key),
        (None, Some(password)) => Auth::Password(password),
        (None, None) => return Err(ConfigError::MissingCredentials.into()),
    };

    Ok(Connection {
        host,
        username: non_empty(merged.username).unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
        auth,
        use_ssl: merged.use_ssl.unwrap_or(true),
        verify_tls: merged.verify_tls.unwrap_or(false),
        timeout: Duration::from_secs(merged.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_if_exists(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config = serde_yaml::from_str(&contents).with_context(|| format!("parsing {:?}", path))?;
    Ok(Some(config))
}

/// Fields set in `over` win.
pub fn merge(base: Config, over: Config) -> Config {
    Config {
        host: over.host.or(base.host),
        username: over.username.or(base.username),
        password: over.password.or(base.password),
        apikey: over.apikey.or(base.apikey),
        verify_tls: over.verify_tls.or(base.verify_tls),
        use_ssl: over.use_ssl.or(base.use_ssl),
        timeout: over.timeout.or(base.timeout),
    }
}
