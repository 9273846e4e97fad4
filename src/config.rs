use serde::Deserialize;
use thiserror::Error;

use crate::telemetry::LogLevel;

pub const DEFAULT_ASSETS: [&str; 4] = [
    "images/image1.jpg",
    "images/image2.png",
    "images/logo.png",
    "images/thumb.png",
];
pub const DEFAULT_FALLBACK_MS: u32 = 8_000;
pub const DEFAULT_LOG_LEVEL: LogLevel = LogLevel::Info;

pub const EASING_FACTOR: f64 = 0.18;
pub const PENDING_PERCENT_CAP: f64 = 95.0;
pub const LABEL_LEFT_BOUNDS: (u32, u32) = (2, 98);

pub const LOADER_TRANSITION_MS: u32 = 550;
pub const FOREGROUND_DELAY_MS: u32 = 200;

pub const HERO_MIN_HEIGHT_PX: u32 = 48;
pub const HERO_FALLBACK_RATIO: f64 = 0.6;
pub const HERO_HEIGHT_VAR: &str = "--hero-height";

pub const FADE_REVEAL_LINE: f64 = 0.92;
pub const FADE_ROOT_MARGIN: &str = "0px 0px -20% 0px";
pub const FADE_THRESHOLD: f64 = 0.08;

pub const COUNTDOWN_HOUR: u32 = 17;
pub const COUNTDOWN_TICK_MS: u32 = 1_000;
pub const PULSE_MS: u32 = 160;
pub const DEFAULT_DONE_LABEL: &str = "開催中";

const FALLBACK_MS_BOUNDS: (u32, u32) = (500, 60_000);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("loader config is not valid JSON: {0}")]
    MalformedLoaderConfig(String),
}

/// Raw `data-loader-config` payload. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoaderOverrides {
    assets: Option<Vec<String>>,
    fallback_ms: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoaderConfig {
    pub assets: Vec<String>,
    pub fallback_ms: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            assets: DEFAULT_ASSETS.iter().map(|src| src.to_string()).collect(),
            fallback_ms: DEFAULT_FALLBACK_MS,
        }
    }
}

impl LoaderConfig {
    /// Applies a `data-loader-config` value on top of the defaults. Out-of-bounds
    /// values are ignored; unparsable JSON is an error so the caller can log it.
    pub fn from_attribute(raw: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let Some(raw) = non_empty(raw) else {
            return Ok(config);
        };

        let overrides: LoaderOverrides = serde_json::from_str(raw)
            .map_err(|err| ConfigError::MalformedLoaderConfig(err.to_string()))?;

        let assets: Vec<String> = overrides
            .assets
            .unwrap_or_default()
            .into_iter()
            .map(|src| src.trim().to_string())
            .filter(|src| !src.is_empty())
            .collect();
        if !assets.is_empty() {
            config.assets = assets;
        }

        config.fallback_ms = overrides
            .fallback_ms
            .and_then(|value| u32::try_from(value).ok())
            .filter(|value| (FALLBACK_MS_BOUNDS.0..=FALLBACK_MS_BOUNDS.1).contains(value))
            .unwrap_or(DEFAULT_FALLBACK_MS);

        Ok(config)
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

pub fn parse_log_level(raw: Option<&str>, default: LogLevel) -> LogLevel {
    match non_empty(raw)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("debug") => LogLevel::Debug,
        Some("info") => LogLevel::Info,
        Some("warn") => LogLevel::Warn,
        _ => default,
    }
}

pub fn done_label(raw: Option<&str>) -> String {
    non_empty(raw).unwrap_or(DEFAULT_DONE_LABEL).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_loader_config_keeps_defaults() {
        assert_eq!(LoaderConfig::from_attribute(None), Ok(LoaderConfig::default()));
        assert_eq!(LoaderConfig::from_attribute(Some("  ")), Ok(LoaderConfig::default()));
    }

    #[test]
    fn loader_config_overrides_assets_and_fallback() {
        let config = LoaderConfig::from_attribute(Some(
            r#"{"assets": ["a.jpg", " ", "b.png"], "fallbackMs": 3000}"#,
        ))
        .expect("valid config");

        assert_eq!(config.assets, vec!["a.jpg".to_string(), "b.png".to_string()]);
        assert_eq!(config.fallback_ms, 3_000);
    }

    #[test]
    fn loader_config_rejects_out_of_bounds_fallback() {
        let config =
            LoaderConfig::from_attribute(Some(r#"{"fallbackMs": 10}"#)).expect("valid config");
        assert_eq!(config.fallback_ms, DEFAULT_FALLBACK_MS);
        assert_eq!(config.assets.len(), DEFAULT_ASSETS.len());

        let config = LoaderConfig::from_attribute(Some(r#"{"fallbackMs": 99999999999}"#))
            .expect("valid config");
        assert_eq!(config.fallback_ms, DEFAULT_FALLBACK_MS);
    }

    #[test]
    fn empty_asset_override_keeps_default_list() {
        let config = LoaderConfig::from_attribute(Some(r#"{"assets": []}"#)).expect("valid config");
        assert_eq!(config.assets.len(), DEFAULT_ASSETS.len());
    }

    #[test]
    fn malformed_loader_config_is_an_error() {
        let result = LoaderConfig::from_attribute(Some("{assets:"));
        assert!(matches!(result, Err(ConfigError::MalformedLoaderConfig(_))));
    }

    #[test]
    fn log_level_parsing_is_case_insensitive() {
        assert_eq!(parse_log_level(Some("DEBUG"), LogLevel::Info), LogLevel::Debug);
        assert_eq!(parse_log_level(Some("warn"), LogLevel::Info), LogLevel::Warn);
        assert_eq!(parse_log_level(Some("verbose"), LogLevel::Info), LogLevel::Info);
        assert_eq!(parse_log_level(None, LogLevel::Warn), LogLevel::Warn);
    }

    #[test]
    fn done_label_defaults_when_blank() {
        assert_eq!(done_label(None), DEFAULT_DONE_LABEL);
        assert_eq!(done_label(Some("")), DEFAULT_DONE_LABEL);
        assert_eq!(done_label(Some(" Live now ")), "Live now");
    }

    #[test]
    fn animation_timings_match_the_stylesheet() {
        assert_eq!(LOADER_TRANSITION_MS, 550);
        assert_eq!(FOREGROUND_DELAY_MS, 200);
        assert_eq!(PULSE_MS, 160);
        assert_eq!(COUNTDOWN_TICK_MS, 1_000);
    }
}
