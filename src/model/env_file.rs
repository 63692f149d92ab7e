//! The `.env` template written into the workspace root.
//!
//! Keys form a fixed, ordered contract. The file is always rendered from
//! configuration in full; existing content is never consulted.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::model::config::BootstrapConfig;

static KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("valid env key regex"));

pub fn is_valid_key(key: &str) -> bool {
    KEY_RE.is_match(key)
}

/// Ordered `(key, value)` pairs in contract order.
pub fn entries(config: &BootstrapConfig) -> Vec<(String, String)> {
    let env = &config.env;
    let store = &env.object_store;

    let mut entries = vec![
        ("PROFILES".to_string(), env.profiles.clone()),
        ("DATA_DIR".to_string(), path_value(&config.data_dir())),
        ("MODELS_DIR".to_string(), path_value(&config.models_dir())),
        ("DB_DIR".to_string(), path_value(&config.db_dir())),
        ("DATABASE_URL".to_string(), env.database_url.clone()),
        ("REDIS_URL".to_string(), env.redis_url.clone()),
        ("S3_ENDPOINT".to_string(), store.endpoint.clone()),
        ("S3_ACCESS_KEY".to_string(), store.access_key.clone()),
        ("S3_SECRET_KEY".to_string(), store.secret_key.clone()),
        ("S3_BUCKET".to_string(), store.bucket.clone()),
    ];

    entries.extend(
        config
            .models
            .iter()
            .map(|model| (model.env_key.clone(), path_value(&config.model_path(model)))),
    );

    entries.extend([
        ("HOST".to_string(), env.host.clone()),
        ("PORT".to_string(), env.port.to_string()),
        ("UI_PORT".to_string(), env.ui_port.to_string()),
        ("LOG_LEVEL".to_string(), env.log_level.clone()),
        ("LOG_FILE".to_string(), env.log_file.clone()),
    ]);

    entries
}

pub fn render(config: &BootstrapConfig) -> String {
    let mut out = String::from("# Generated by devboot. Re-running bootstrap resets this file.\n");
    for (key, value) in entries(config) {
        out.push_str(&key);
        out.push('=');
        out.push_str(&quote(&value));
        out.push('\n');
    }
    out
}

/// Files carrying credentials are not world-readable.
pub fn file_mode(config: &BootstrapConfig) -> u32 {
    let store = &config.env.object_store;
    if store.access_key.is_empty() && store.secret_key.is_empty() {
        0o644
    } else {
        0o600
    }
}

fn path_value(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn quote(value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '$' | '\\'));
    if !needs_quotes {
        return value.to_string();
    }

    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$");
    format!("\"{escaped}\"")
}
