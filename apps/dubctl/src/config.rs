use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use client_core::{ControllerPolicy, LanguageCollision, StatusErrorPolicy};
use shared::languages::{DEFAULT_SOURCE_LANGUAGE, DEFAULT_TARGET_LANGUAGE};
use tracing::warn;

pub const CONFIG_FILE: &str = "dubctl.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub source_language: String,
    pub target_language: String,
    pub email: Option<String>,
    pub output_dir: PathBuf,
    pub lenient: bool,
    pub poll_interval_secs: u64,
    /// 0 disables the duration check.
    pub max_duration_secs: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8443".into(),
            source_language: DEFAULT_SOURCE_LANGUAGE.into(),
            target_language: DEFAULT_TARGET_LANGUAGE.into(),
            email: None,
            output_dir: PathBuf::from("."),
            lenient: false,
            poll_interval_secs: 60,
            max_duration_secs: 120,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn policy(&self) -> ControllerPolicy {
        let mut policy = if self.lenient {
            ControllerPolicy::lenient()
        } else {
            ControllerPolicy::default()
        };
        policy.poll_interval = Duration::from_secs(self.poll_interval_secs.max(1));
        if !self.lenient {
            policy.max_duration =
                (self.max_duration_secs > 0).then(|| Duration::from_secs(self.max_duration_secs));
        }
        policy
    }

    pub fn describe_policy(&self) -> String {
        let policy = self.policy();
        let status_errors = match policy.status_errors {
            StatusErrorPolicy::HardReset => "reset",
            StatusErrorPolicy::SurfaceOnly => "surface",
        };
        let collisions = match policy.language_collision {
            LanguageCollision::AutoAdvance => "auto-advance",
            LanguageCollision::Reject => "reject",
        };
        format!("status errors: {status_errors}, identical languages: {collisions}")
    }
}

/// Defaults, then `dubctl.toml` in the working directory, then `DUBCTL_*` variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(CONFIG_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!(file = CONFIG_FILE, error = %err, "ignoring unreadable config file");
            return;
        }
    };
    let values = file_cfg
        .into_iter()
        .filter_map(|(key, value)| match value {
            toml::Value::String(s) => Some((key, s)),
            toml::Value::Integer(i) => Some((key, i.to_string())),
            toml::Value::Boolean(b) => Some((key, b.to_string())),
            _ => None,
        })
        .collect::<HashMap<_, _>>();
    apply(settings, |key| values.get(key).cloned());
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    apply(settings, |key| lookup(&format!("DUBCTL_{}", key.to_uppercase())));
}

fn apply(settings: &mut Settings, get: impl Fn(&str) -> Option<String>) {
    if let Some(v) = get("api_url") {
        settings.api_url = v;
    }
    if let Some(v) = get("source_language") {
        settings.source_language = v;
    }
    if let Some(v) = get("target_language") {
        settings.target_language = v;
    }
    if let Some(v) = get("email") {
        settings.email = Some(v).filter(|e| !e.trim().is_empty());
    }
    if let Some(v) = get("output_dir") {
        settings.output_dir = PathBuf::from(v);
    }
    if let Some(v) = get("lenient") {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.lenient = parsed;
        }
    }
    if let Some(v) = get("poll_interval_secs") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.poll_interval_secs = parsed;
        }
    }
    if let Some(v) = get("max_duration_secs") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.max_duration_secs = parsed;
        }
    }
    if let Some(v) = get("log_filter") {
        settings.log_filter = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
