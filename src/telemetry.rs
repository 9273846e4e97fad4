use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl PartialOrd for LogLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(level: LogLevel) -> u8 {
            match level {
                LogLevel::Debug => 0,
                LogLevel::Info => 1,
                LogLevel::Warn => 2,
            }
        }

        rank(*self).cmp(&rank(*other))
    }
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
        }
    }

    fn facade_level(self) -> log::Level {
        match self {
            Self::Debug => log::Level::Debug,
            Self::Info => log::Level::Info,
            Self::Warn => log::Level::Warn,
        }
    }
}

/// Emits one JSON object per event through the `log` facade.
#[derive(Clone, Copy, Debug)]
pub struct Telemetry {
    min_level: LogLevel,
}

impl Telemetry {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }

    pub fn event(&self, level: LogLevel, event: &str, fields: Value) {
        if let Some(line) = self.render(level, event, fields, now_unix_millis()) {
            log::log!(level.facade_level(), "{line}");
        }
    }

    fn render(&self, level: LogLevel, event: &str, fields: Value, ts: i64) -> Option<String> {
        if level < self.min_level {
            return None;
        }

        let mut payload = Map::new();
        payload.insert("ts".to_string(), Value::Number(Number::from(ts)));
        payload.insert("level".to_string(), Value::String(level.as_str().to_string()));
        payload.insert("event".to_string(), Value::String(event.to_string()));

        if let Value::Object(extra) = fields {
            for (key, value) in extra {
                payload.insert(key, value);
            }
        }

        Some(Value::Object(payload).to_string())
    }
}

fn now_unix_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn levels_below_minimum_are_dropped() {
        let telemetry = Telemetry::new(LogLevel::Info);
        assert!(telemetry
            .render(LogLevel::Debug, "loader.asset_settled", json!({}), 0)
            .is_none());
        assert!(telemetry
            .render(LogLevel::Warn, "countdown.config_rejected", json!({}), 0)
            .is_some());
    }

    #[test]
    fn rendered_event_merges_fields() {
        let telemetry = Telemetry::new(LogLevel::Debug);
        let line = telemetry
            .render(LogLevel::Info, "loader.finished", json!({ "percent": 100 }), 1_700)
            .expect("event should render");
        let parsed: Value = serde_json::from_str(&line).expect("valid json");

        assert_eq!(parsed["ts"], 1_700);
        assert_eq!(parsed["level"], "info");
        assert_eq!(parsed["event"], "loader.finished");
        assert_eq!(parsed["percent"], 100);
    }

    #[test]
    fn level_ordering_follows_severity() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
    }
}
