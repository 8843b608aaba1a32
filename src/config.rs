#![forbid(unsafe_code)]

//! Runtime settings: CLI override, then process environment, then the `.env`
//! file, then the built-in default.

use crate::layout::DEFAULT_PUBLIC_PREFIX;
use crate::search::{DEFAULT_MAX_PAGE_ATTEMPTS, DEFAULT_PAGE_SIZE};
use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_VIDEOS_ROOT: &str = "./videos";
pub const DEFAULT_LEDGER_PATH: &str = "./downloaded_ids.json";
pub const DEFAULT_YT_DLP_BIN: &str = "yt-dlp";

const KEY_VIDEOS_ROOT: &str = "SHORTS_ROOT";
const KEY_LEDGER: &str = "SHORTS_LEDGER";
const KEY_PUBLIC_PREFIX: &str = "SHORTS_PUBLIC_PREFIX";
const KEY_YT_DLP_BIN: &str = "YT_DLP_BIN";
const KEY_COOKIES: &str = "SHORTS_COOKIES";
const KEY_LOG_DIR: &str = "SHORTS_LOG_DIR";
const KEY_PAGE_SIZE: &str = "SHORTS_PAGE_SIZE";
const KEY_MAX_PAGES: &str = "SHORTS_MAX_PAGES";
const KEY_USERNAME: &str = "SHORTS_USERNAME";
const KEY_PASSWORD_DIGEST: &str = "SHORTS_PASSWORD_BLAKE3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub videos_root: PathBuf,
    pub ledger_path: PathBuf,
    pub public_prefix: String,
    pub yt_dlp_bin: PathBuf,
    pub cookies_file: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub page_size: usize,
    pub max_page_attempts: usize,
    pub username: Option<String>,
    /// Hex BLAKE3 digest of the API password.
    pub password_digest: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub videos_root: Option<PathBuf>,
    pub ledger_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub env_path: Option<PathBuf>,
}

pub fn load_runtime_config() -> Result<RuntimeConfig> {
    resolve_runtime_config(RuntimeOverrides::default())
}

pub fn resolve_runtime_config(overrides: RuntimeOverrides) -> Result<RuntimeConfig> {
    let env_path = overrides
        .env_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(env_path)?;
    Ok(build_runtime_config(&file_vars, env_var_string, overrides))
}

fn build_runtime_config(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: RuntimeOverrides,
) -> RuntimeConfig {
    let lookup = |key: &str| lookup_value(key, file_vars, &env_lookup);
    let path_or = |key: &str, default: &str| {
        PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()))
    };
    let count_or = |key: &str, default: usize| {
        lookup(key)
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(default)
    };

    RuntimeConfig {
        videos_root: overrides
            .videos_root
            .unwrap_or_else(|| path_or(KEY_VIDEOS_ROOT, DEFAULT_VIDEOS_ROOT)),
        ledger_path: overrides
            .ledger_path
            .unwrap_or_else(|| path_or(KEY_LEDGER, DEFAULT_LEDGER_PATH)),
        public_prefix: lookup(KEY_PUBLIC_PREFIX)
            .unwrap_or_else(|| DEFAULT_PUBLIC_PREFIX.to_string()),
        yt_dlp_bin: path_or(KEY_YT_DLP_BIN, DEFAULT_YT_DLP_BIN),
        cookies_file: lookup(KEY_COOKIES).map(PathBuf::from),
        log_dir: overrides
            .log_dir
            .or_else(|| lookup(KEY_LOG_DIR).map(PathBuf::from)),
        page_size: count_or(KEY_PAGE_SIZE, DEFAULT_PAGE_SIZE),
        max_page_attempts: count_or(KEY_MAX_PAGES, DEFAULT_MAX_PAGE_ATTEMPTS),
        username: lookup(KEY_USERNAME),
        password_digest: lookup(KEY_PASSWORD_DIGEST),
    }
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(non_blank)
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| file_vars.get(key).cloned().and_then(non_blank))
}

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
        let value = unquote(value_raw.trim());
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .or_else(|| {
            value
                .strip_prefix('\'')
                .and_then(|value| value.strip_suffix('\''))
        })
        .unwrap_or(value)
}
