use std::{fs, path::Path};

use reducer_core::DEFAULT_PLACEHOLDER;
use shared::domain::ExecutionMode;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub mode: ExecutionMode,
    pub queue_capacity: usize,
    pub output_capacity: usize,
    pub placeholder: char,
    pub log_filter: String,
    pub initial_state: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Sync,
            queue_capacity: 64,
            output_capacity: 1024,
            placeholder: DEFAULT_PLACEHOLDER,
            log_filter: "info".into(),
            initial_state: 0,
        }
    }
}

pub fn load_settings_from(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match raw.parse::<toml::Table>() {
            Ok(table) => {
                for (key, value) in table {
                    let value = match value {
                        toml::Value::String(text) => text,
                        other => other.to_string(),
                    };
                    apply_setting(&mut settings, &key, &value);
                }
            }
            Err(err) => warn!("ignoring unreadable settings file '{}': {err}", path.display()),
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

/// Environment keys, in increasing precedence, for each setting.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("REDUCER_MODE", "mode"),
    ("APP__MODE", "mode"),
    ("APP__QUEUE_CAPACITY", "queue_capacity"),
    ("APP__OUTPUT_CAPACITY", "output_capacity"),
    ("APP__PLACEHOLDER", "placeholder"),
    ("RUST_LOG", "log_filter"),
    ("APP__LOG_FILTER", "log_filter"),
    ("APP__INITIAL_STATE", "initial_state"),
];

pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (env_key, setting) in ENV_OVERRIDES {
        if let Some(value) = lookup(env_key) {
            apply_setting(settings, setting, &value);
        }
    }
}

pub fn apply_setting(settings: &mut Settings, key: &str, value: &str) {
    let applied = match key {
        "mode" => value
            .parse::<ExecutionMode>()
            .map(|mode| settings.mode = mode)
            .is_ok(),
        "queue_capacity" => parse_capacity(value)
            .map(|capacity| settings.queue_capacity = capacity)
            .is_some(),
        "output_capacity" => parse_capacity(value)
            .map(|capacity| settings.output_capacity = capacity)
            .is_some(),
        "placeholder" => parse_placeholder(value)
            .map(|placeholder| settings.placeholder = placeholder)
            .is_some(),
        "log_filter" => {
            settings.log_filter = value.to_string();
            true
        }
        "initial_state" => value
            .trim()
            .parse::<i64>()
            .map(|initial| settings.initial_state = initial)
            .is_ok(),
        _ => {
            warn!(key, "ignoring unknown setting");
            return;
        }
    };

    if !applied {
        warn!(key, value, "ignoring invalid setting value");
    }
}

fn parse_capacity(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|capacity| *capacity > 0)
}

/// Accepts a single character or a `U+XXXX` scalar.
pub fn parse_placeholder(value: &str) -> Option<char> {
    let hex = value
        .strip_prefix("U+")
        .or_else(|| value.strip_prefix("u+"));
    if let Some(hex) = hex {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }

    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(placeholder), None) => Some(placeholder),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
