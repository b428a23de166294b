//! Leveled logging shared by the index crates.
//!
//! Output goes to stderr unless a sink is installed with [`set_sink`].

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::json;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Level {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
    Text = 0,
    Json = 1,
}

impl Format {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LogConfig {
    pub level: Level,
    pub format: Format,
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Text,
            timestamps: true,
        }
    }
}

type Sink = Box<dyn Write + Send>;

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);
static LOG_FORMAT: AtomicU8 = AtomicU8::new(Format::Text as u8);
static LOG_TIMESTAMPS: AtomicBool = AtomicBool::new(true);
static LOG_SINK: OnceLock<Mutex<Option<Sink>>> = OnceLock::new();

pub fn init(config: LogConfig) {
    LOG_LEVEL.store(config.level as u8, Ordering::Relaxed);
    LOG_FORMAT.store(config.format as u8, Ordering::Relaxed);
    LOG_TIMESTAMPS.store(config.timestamps, Ordering::Relaxed);
}

/// Redirects log lines away from stderr. `None` restores stderr.
pub fn set_sink(sink: Option<Sink>) {
    let slot = LOG_SINK.get_or_init(|| Mutex::new(None));
    if let Ok(mut guard) = slot.lock() {
        *guard = sink;
    }
}

pub fn enabled(level: Level) -> bool {
    level as u8 <= LOG_LEVEL.load(Ordering::Relaxed)
}

/// One log line before rendering. `target` is the index name for index
/// events and the module path otherwise.
pub struct Record<'a> {
    pub level: Level,
    pub target: &'a str,
    pub file: &'a str,
    pub line: u32,
    pub args: fmt::Arguments<'a>,
}

impl Record<'_> {
    fn render(&self, format: Format, timestamps: bool, now: Duration) -> String {
        match format {
            Format::Text => {
                let mut out = String::new();
                if timestamps {
                    let ts = Timestamp {
                        unix_seconds: now.as_secs(),
                        millis: now.subsec_millis(),
                    };
                    out.push_str(&format!("{ts} "));
                }
                out.push_str(&format!(
                    "{} {}: {}",
                    self.level.as_str(),
                    self.target,
                    self.args
                ));
                out
            }
            Format::Json => {
                let ts_ms: u64 = now.as_millis().try_into().unwrap_or(u64::MAX);
                json!({
                    "ts_ms": ts_ms,
                    "level": self.level.as_str(),
                    "target": self.target,
                    "file": self.file,
                    "line": self.line,
                    "msg": self.args.to_string(),
                })
                .to_string()
            }
        }
    }
}

pub fn log(
    level: Level,
    target: &str,
    file: &'static str,
    line: u32,
    args: fmt::Arguments<'_>,
) {
    if !enabled(level) {
        return;
    }
    let format = match LOG_FORMAT.load(Ordering::Relaxed) {
        1 => Format::Json,
        _ => Format::Text,
    };
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let record = Record {
        level,
        target,
        file,
        line,
        args,
    };
    let rendered = record.render(format, LOG_TIMESTAMPS.load(Ordering::Relaxed), now);

    if let Some(slot) = LOG_SINK.get() {
        if let Ok(mut guard) = slot.lock() {
            if let Some(sink) = guard.as_mut() {
                let _ = writeln!(sink, "{rendered}");
                return;
            }
        }
    }
    let _ = writeln!(io::stderr().lock(), "{rendered}");
}

/// `log_at!(level, target: name, ...)` tags the line with `name`; without a
/// target the calling module path is used.
#[macro_export]
macro_rules! log_at {
    ($level:expr, target: $target:expr, $($arg:tt)*) => {{
        if $crate::enabled($level) {
            $crate::log($level, $target, file!(), line!(), format_args!($($arg)*));
        }
    }};
    ($level:expr, $($arg:tt)*) => {{
        if $crate::enabled($level) {
            $crate::log($level, module_path!(), file!(), line!(), format_args!($($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! log_error {
    (target: $target:expr, $($arg:tt)*) => {{
        $crate::log_at!($crate::Level::Error, target: $target, $($arg)*);
    }};
    ($($arg:tt)*) => {{
        $crate::log_at!($crate::Level::Error, $($arg)*);
    }};
}

#[macro_export]
macro_rules! log_warn {
    (target: $target:expr, $($arg:tt)*) => {{
        $crate::log_at!($crate::Level::Warn, target: $target, $($arg)*);
    }};
    ($($arg:tt)*) => {{
        $crate::log_at!($crate::Level::Warn, $($arg)*);
    }};
}

#[macro_export]
macro_rules! log_info {
    (target: $target:expr, $($arg:tt)*) => {{
        $crate::log_at!($crate::Level::Info, target: $target, $($arg)*);
    }};
    ($($arg:tt)*) => {{
        $crate::log_at!($crate::Level::Info, $($arg)*);
    }};
}

#[macro_export]
macro_rules! log_debug {
    (target: $target:expr, $($arg:tt)*) => {{
        $crate::log_at!($crate::Level::Debug, target: $target, $($arg)*);
    }};
    ($($arg:tt)*) => {{
        $crate::log_at!($crate::Level::Debug, $($arg)*);
    }};
}

#[macro_export]
macro_rules! log_trace {
    (target: $target:expr, $($arg:tt)*) => {{
        $crate::log_at!($crate::Level::Trace, target: $target, $($arg)*);
    }};
    ($($arg:tt)*) => {{
        $crate::log_at!($crate::Level::Trace, $($arg)*);
    }};
}

struct Timestamp {
    unix_seconds: u64,
    millis: u32,
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const SECS_PER_DAY: u64 = 86_400;
        let days = (self.unix_seconds / SECS_PER_DAY) as i64;
        let secs_of_day = self.unix_seconds % SECS_PER_DAY;
        let hour = secs_of_day / 3600;
        let minute = (secs_of_day % 3600) / 60;
        let second = secs_of_day % 60;
        let (year, month, day) = civil_from_days(days);
        write!(
            f,
            "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{millis:03}Z",
            millis = self.millis
        )
    }
}

fn civil_from_days(days_since_unix_epoch: i64) -> (i32, u32, u32) {
    // Howard Hinnant's days-to-civil conversion.
    let z = days_since_unix_epoch + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = (yoe as i32) + (era as i32) * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = y + if m <= 2 { 1 } else { 0 };
    (year, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level() {
        assert_eq!(Level::parse("info"), Some(Level::Info));
        assert_eq!(Level::parse("WARN"), Some(Level::Warn));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("trace"), Some(Level::Trace));
        assert_eq!(Level::parse("nope"), None);
    }

    #[test]
    fn parse_format() {
        assert_eq!(Format::parse("text"), Some(Format::Text));
        assert_eq!(Format::parse("JSON"), Some(Format::Json));
        assert_eq!(Format::parse("nope"), None);
    }

    #[test]
    fn timestamp_renders_utc() {
        let ts = Timestamp {
            unix_seconds: 1_700_000_000,
            millis: 7,
        };
        assert_eq!(ts.to_string(), "2023-11-14T22:13:20.007Z");
    }

    #[test]
    fn levels_order_by_verbosity() {
        assert!(Level::Error < Level::Warn);
        assert!(Level::Debug < Level::Trace);
    }

    fn render(
        level: Level,
        target: &str,
        format: Format,
        timestamps: bool,
        now: Duration,
        args: fmt::Arguments<'_>,
    ) -> String {
        Record {
            level,
            target,
            file: "address_index.rs",
            line: 42,
            args,
        }
        .render(format, timestamps, now)
    }

    #[test]
    fn text_line_carries_target() {
        assert_eq!(
            render(
                Level::Warn,
                "timestampindex",
                Format::Text,
                false,
                Duration::ZERO,
                format_args!("parent {} missing", 7)
            ),
            "WARN timestampindex: parent 7 missing"
        );
        assert_eq!(
            render(
                Level::Warn,
                "timestampindex",
                Format::Text,
                true,
                Duration::from_millis(1_700_000_000_007),
                format_args!("parent {} missing", 7)
            ),
            "2023-11-14T22:13:20.007Z WARN timestampindex: parent 7 missing"
        );
    }

    #[test]
    fn json_line_is_structured() {
        let rendered = render(
            Level::Error,
            "addressindex",
            Format::Json,
            true,
            Duration::from_millis(5),
            format_args!("flush failed"),
        );
        let value: serde_json::Value = serde_json::from_str(&rendered).expect("json");
        assert_eq!(value["target"], "addressindex");
        assert_eq!(value["level"], "ERROR");
        assert_eq!(value["line"], 42);
        assert_eq!(value["ts_ms"], 5);
        assert_eq!(value["msg"], "flush failed");
    }
}
