#![forbid(unsafe_code)]

//! Runtime configuration shared by the folio binaries.
//!
//! Values come from three layers, highest priority first: command-line
//! overrides, process environment, then a `.env` file in the working directory.

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    env, fs,
    net::IpAddr,
    path::{Path, PathBuf},
};

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_FOLIO_PORT: u16 = 8080;
pub const DEFAULT_FOLIO_HOST: &str = "127.0.0.1";

const HOST_KEY: &str = "FOLIO_HOST";
const PORT_KEY: &str = "FOLIO_PORT";
const WWW_ROOT_KEY: &str = "WWW_ROOT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: IpAddr,
    pub port: u16,
    /// Prebuilt site to serve for non-API paths. `None` disables static files.
    pub www_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub www_root: Option<PathBuf>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_server_settings(overrides: SettingsOverrides) -> Result<ServerSettings> {
    let env_path = overrides
        .env_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(&env_path)?;
    build_server_settings(&file_vars, env_var_string, overrides)
}

fn build_server_settings(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: SettingsOverrides,
) -> Result<ServerSettings> {
    let host_raw = overrides
        .host
        .and_then(non_blank)
        .or_else(|| lookup_value(HOST_KEY, file_vars, &env_lookup))
        .unwrap_or_else(|| DEFAULT_FOLIO_HOST.to_string());
    let host = host_raw
        .parse::<IpAddr>()
        .with_context(|| format!("{HOST_KEY} must be an IPv4 or IPv6 address, got {host_raw:?}"))?;
    let port = overrides
        .port
        .or_else(|| {
            lookup_value(PORT_KEY, file_vars, &env_lookup)
                .and_then(|value| value.parse::<u16>().ok())
        })
        .unwrap_or(DEFAULT_FOLIO_PORT);
    let www_root = overrides.www_root.or_else(|| {
        lookup_value(WWW_ROOT_KEY, file_vars, &env_lookup).map(PathBuf::from)
    });

    Ok(ServerSettings {
        host,
        port,
        www_root,
    })
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(non_blank)
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| file_vars.get(key).cloned().and_then(non_blank))
}

/// Parses `KEY=value` lines, accepting `export` prefixes, quoted values and
/// `#` comments. A missing file is treated as empty.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), unquote(value_raw.trim()).to_string());
    }
    Ok(vars)
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|quote| value.strip_prefix(*quote)?.strip_suffix(*quote))
        .unwrap_or(value)
}
