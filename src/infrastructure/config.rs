// Service configuration: built-in defaults, optional TOML file, INSIGHTS__* env overrides
use crate::application::app_shell::ShellOptions;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub api: ApiSettings,
    pub auth: AuthSettings,
    pub storage: StorageSettings,
    pub ui: UiSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    /// Accept any login with a demo identity while the backend is unreachable
    pub offline_demo: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UiSettings {
    pub toast_duration_ms: u64,
    pub search_debounce_ms: u64,
    pub default_range_days: u64,
}

impl Settings {
    pub fn shell_options(&self) -> ShellOptions {
        ShellOptions {
            offline_demo: self.auth.offline_demo,
            toast_duration: Duration::from_millis(self.ui.toast_duration_ms),
            search_debounce: Duration::from_millis(self.ui.search_debounce_ms),
            default_range_days: self.ui.default_range_days,
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout_ms)
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    build_settings(config::File::with_name("config/dashboard").required(false))
}

fn build_settings<S>(file: S) -> anyhow::Result<Settings>
where
    S: config::Source + Send + Sync + 'static,
{
    let settings = config::Config::builder()
        .set_default("server.bind_addr", "127.0.0.1:8080")?
        .set_default("api.base_url", "http://localhost:5000")?
        .set_default("api.timeout_ms", 10_000)?
        .set_default("auth.offline_demo", false)?
        .set_default("storage.path", "data/client_state.json")?
        .set_default("ui.toast_duration_ms", 3_000)?
        .set_default("ui.search_debounce_ms", 300)?
        .set_default("ui.default_range_days", 30)?
        .add_source(file)
        .add_source(
            config::Environment::with_prefix("INSIGHTS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    #[test]
    fn test_defaults_without_file() {
        let settings = build_settings(File::from_str("", FileFormat::Toml)).unwrap();
        assert_eq!(settings.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(settings.api.base_url, "http://localhost:5000");
        assert!(!settings.auth.offline_demo);
        assert_eq!(settings.shell_options().search_debounce, Duration::from_millis(300));
        assert_eq!(settings.api_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let toml = r#"
            [auth]
            offline_demo = true

            [ui]
            default_range_days = 7
        "#;
        let settings = build_settings(File::from_str(toml, FileFormat::Toml)).unwrap();
        assert!(settings.auth.offline_demo);
        assert_eq!(settings.ui.default_range_days, 7);
        assert_eq!(settings.ui.toast_duration_ms, 3_000);
        assert_eq!(settings.storage.path, "data/client_state.json");
    }
}
