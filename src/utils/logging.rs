//! Structured Logging with Secret Redaction
//!
//! Writes `key=value` log lines to stderr. Fields whose key names a
//! credential (API keys, passwords, auth headers) are redacted before
//! they are formatted.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Minimum level that gets written; debug is off by default
static MIN_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Set the minimum level that gets written
pub fn set_min_level(level: LogLevel) {
    MIN_LEVEL.store(level as u8, Ordering::SeqCst);
}

pub fn min_level() -> LogLevel {
    LogLevel::from_u8(MIN_LEVEL.load(Ordering::SeqCst))
}

/// Enable debug logging
pub fn enable_debug() {
    set_min_level(LogLevel::Debug);
}

/// Check if debug logging is enabled
pub fn is_debug_enabled() -> bool {
    min_level() == LogLevel::Debug
}

/// Structured log entry
#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field to the log entry (auto-redacts secrets)
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let value_str = value.to_string();
        let redacted = redact_if_sensitive(key, &value_str);
        self.fields.push((key, redacted));
        self
    }

    /// Render without timestamp
    pub fn render(&self) -> String {
        let fields_str = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");

        if fields_str.is_empty() {
            format!("{} [{}] {}", self.level, self.module, self.message)
        } else {
            format!("{} [{}] {} | {}", self.level, self.module, self.message, fields_str)
        }
    }

    /// Log the entry
    pub fn log(self) {
        if self.level < min_level() {
            return;
        }

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        eprintln!("[{}] {}", timestamp, self.render());
    }
}

/// Redact a value if the key suggests it's a credential
fn redact_if_sensitive(key: &str, value: &str) -> String {
    let key_lower = key.to_lowercase();

    let redacted_keys = [
        "api_key", "apikey", "secret", "password", "authorization", "x_cg_pro",
    ];

    if redacted_keys.iter().any(|k| key_lower.contains(k)) {
        return redact_value(value);
    }

    if key_lower == "url" {
        return redact_url_query_secrets(value);
    }

    value.to_string()
}

/// Fully redact a sensitive value
fn redact_value(value: &str) -> String {
    if value.is_empty() {
        return "[EMPTY]".to_string();
    }

    if value.len() <= 4 {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED:{}chars]", value.len())
    }
}

/// Mask query parameters that carry keys (`...?x_cg_pro_api_key=abc` -> `...?x_cg_pro_api_key=[REDACTED]`)
fn redact_url_query_secrets(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let masked = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((k, _)) if k.to_lowercase().contains("key") => format!("{}=[REDACTED]", k),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", base, masked)
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($level:ident, $module:expr, $msg:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::utils::logging::LogEntry::new($crate::utils::logging::LogLevel::$level, $module, $msg)
            $(.field(stringify!($key), &$value))*
            .log()
    };
}

/// `log_debug!(module, "message", key = value, ...)`; dropped unless debug is enabled
#[macro_export]
macro_rules! log_debug {
    ($($args:tt)+) => { $crate::__log_at!(Debug, $($args)+) };
}

#[macro_export]
macro_rules! log_info {
    ($($args:tt)+) => { $crate::__log_at!(Info, $($args)+) };
}

#[macro_export]
macro_rules! log_warn {
    ($($args:tt)+) => { $crate::__log_at!(Warn, $($args)+) };
}

#[macro_export]
macro_rules! log_error {
    ($($args:tt)+) => { $crate::__log_at!(Error, $($args)+) };
}
