use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "record-ledger.toml";

/// Settings for the `record-ledger` binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecordLedgerConfig {
    /// Directory of the sled database
    pub db_path: PathBuf,
    /// Default filter when `RUST_LOG` is not set
    pub log_level: String,
    /// Emit JSON log lines instead of human readable ones
    pub log_json: bool,
}

impl Default for RecordLedgerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("record-ledger.db"),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl RecordLedgerConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. `path`, or `record-ledger.toml` in the working directory when present
    /// 3. Environment variables (prefixed with RECORD_LEDGER_)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("db_path", defaults.db_path.to_string_lossy().into_owned())?
            .set_default("log_level", defaults.log_level)?
            .set_default("log_json", defaults.log_json)?;

        match path {
            Some(path) => builder = builder.add_source(File::from(path)),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE))
            }
            None => {}
        }

        builder = builder.add_source(Environment::with_prefix("RECORD_LEDGER").try_parsing(true));

        Ok(builder.build()?.try_deserialize()?)
    }
}
