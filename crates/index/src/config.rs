//! `key=value` configuration for the index store.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chainidx_log::{Format, Level, LogConfig};

use crate::spentindex::SpentUndoPolicy;
use crate::IndexError;

const DEFAULT_DB_CACHE_MB: u64 = 64;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Backend {
    Memory,
    Fjall,
}

impl Backend {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Some(Self::Memory),
            "fjall" => Some(Self::Fjall),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IndexConfig {
    pub backend: Backend,
    pub data_dir: PathBuf,
    pub db_cache_bytes: u64,
    pub address_index: bool,
    pub spent_index: bool,
    pub timestamp_index: bool,
    /// Wipe the index store before opening it.
    pub reindex: bool,
    pub spent_undo: SpentUndoPolicy,
    pub log: LogConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Fjall,
            data_dir: PathBuf::from("data"),
            db_cache_bytes: mb_to_bytes(DEFAULT_DB_CACHE_MB),
            address_index: true,
            spent_index: true,
            timestamp_index: true,
            reindex: false,
            spent_undo: SpentUndoPolicy::Retain,
            log: LogConfig::default(),
        }
    }
}

impl IndexConfig {
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory,
            ..Self::default()
        }
    }

    /// A missing file yields the defaults.
    pub fn from_conf_file(path: &Path) -> Result<Self, IndexError> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_conf_str(&contents),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(IndexError::Config(format!(
                "failed to read {}: {err}",
                path.display()
            ))),
        }
    }

    pub fn from_conf_str(contents: &str) -> Result<Self, IndexError> {
        let conf = parse_conf(contents);
        let mut config = Self::default();

        if let Some(value) = last(&conf, "backend") {
            config.backend = Backend::parse(value)
                .ok_or_else(|| invalid("backend", value))?;
        }
        if let Some(value) = last(&conf, "datadir") {
            if value.is_empty() {
                return Err(invalid("datadir", value));
            }
            config.data_dir = PathBuf::from(value);
        }
        if let Some(value) = last(&conf, "dbcache") {
            let mb = value
                .parse::<u64>()
                .map_err(|_| invalid("dbcache", value))?;
            config.db_cache_bytes = mb_to_bytes(mb);
        }
        if let Some(flag) = bool_key(&conf, "addressindex")? {
            config.address_index = flag;
        }
        if let Some(flag) = bool_key(&conf, "spentindex")? {
            config.spent_index = flag;
        }
        if let Some(flag) = bool_key(&conf, "timestampindex")? {
            config.timestamp_index = flag;
        }
        if let Some(flag) = bool_key(&conf, "reindex")? {
            config.reindex = flag;
        }
        if let Some(flag) = bool_key(&conf, "spentindexundo")? {
            config.spent_undo = if flag {
                SpentUndoPolicy::Tombstone
            } else {
                SpentUndoPolicy::Retain
            };
        }
        if let Some(value) = last(&conf, "loglevel") {
            config.log.level = Level::parse(value).ok_or_else(|| invalid("loglevel", value))?;
        }
        if let Some(value) = last(&conf, "logformat") {
            config.log.format = Format::parse(value).ok_or_else(|| invalid("logformat", value))?;
        }
        if let Some(flag) = bool_key(&conf, "logtimestamps")? {
            config.log.timestamps = flag;
        }
        Ok(config)
    }

    /// Directory holding the index store.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("indexes")
    }

    pub fn any_enabled(&self) -> bool {
        self.address_index || self.spent_index || self.timestamp_index
    }
}

fn parse_conf(contents: &str) -> HashMap<String, Vec<String>> {
    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    for raw_line in contents.lines() {
        let mut line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(idx) = line.find(['#', ';']) {
            line = &line[..idx];
        }
        line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = match line.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => (line, "1"),
        };
        if key.is_empty() {
            continue;
        }
        out.entry(key.to_ascii_lowercase())
            .or_default()
            .push(value.to_string());
    }
    out
}

fn last<'a>(conf: &'a HashMap<String, Vec<String>>, key: &str) -> Option<&'a str> {
    conf.get(key)
        .and_then(|values| values.last())
        .map(String::as_str)
}

fn bool_key(conf: &HashMap<String, Vec<String>>, key: &str) -> Result<Option<bool>, IndexError> {
    match last(conf, key) {
        Some(value) => parse_conf_bool(value)
            .map(Some)
            .ok_or_else(|| invalid(key, value)),
        None => Ok(None),
    }
}

fn parse_conf_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.is_empty() {
        return Some(true);
    }
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str) -> IndexError {
    IndexError::Config(format!("invalid {key} value '{value}'"))
}

fn mb_to_bytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}
