use chainidx_index::{Backend, IndexConfig, IndexContext};
use chainidx_log::{Format, Level, LogConfig};

#[test]
fn open_applies_configured_log_settings() {
    let config = IndexConfig::from_conf_str("loglevel=trace\nlogformat=json\n").expect("parse");
    assert!(!chainidx_log::enabled(Level::Trace));

    IndexContext::open(&IndexConfig {
        backend: Backend::Memory,
        ..config
    })
    .expect("open");
    assert!(chainidx_log::enabled(Level::Trace));

    let quiet = IndexConfig {
        log: LogConfig {
            level: Level::Error,
            format: Format::Text,
            timestamps: false,
        },
        ..IndexConfig::in_memory()
    };
    IndexContext::open(&quiet).expect("reopen");
    assert!(chainidx_log::enabled(Level::Error));
    assert!(!chainidx_log::enabled(Level::Warn));
}
