//! Process-wide settings, assembled once at startup and passed down by reference.

use crate::task::result_error::error::Error;
use crate::task::result_error::result::Result;
use crate::task::result_error::WithMsg;
use crate::task::validate::validate_writable_dir;

use bon::Builder;
use clap::ValueEnum;
use derive_more::Display;
use getset::{CopyGetters, Getters};
use tracing::level_filters::LevelFilter;
use validator::Validate;

use std::path::PathBuf;

/// Task configuration document used when none is given explicitly.
pub static DEFAULT_CONFIG_PATH: &str = "./settings.json";

/// Selects how chatty the logs are.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Everything down to debug level.
    #[default]
    #[display("dev")]
    Dev,
    /// Info level and above.
    #[display("prod")]
    Prod,
}

impl RunMode {
    pub fn level_filter(self) -> LevelFilter {
        match self {
            RunMode::Dev => LevelFilter::DEBUG,
            RunMode::Prod => LevelFilter::INFO,
        }
    }
}

#[derive(Clone, Debug, Validate, Builder, Getters, CopyGetters)]
pub struct Settings {
    /// Directory receiving the dated log file.
    #[validate(custom(function = validate_writable_dir))]
    #[builder(into)]
    #[getset(get = "pub")]
    log_dir: PathBuf,
    #[builder(default)]
    #[getset(get_copy = "pub")]
    run_mode: RunMode,
    #[builder(default = PathBuf::from(DEFAULT_CONFIG_PATH), into)]
    #[getset(get = "pub")]
    config_path: PathBuf,
    /// Exit non-zero when any operation of the batch failed.
    #[builder(default)]
    #[getset(get_copy = "pub")]
    strict: bool,
}

impl Settings {
    /// Assembles settings from already-gathered external values.
    ///
    /// The log directory is mandatory: without it there is nowhere to write the
    /// log file and the process must not start.
    pub fn try_new(
        log_dir: Option<PathBuf>,
        run_mode: RunMode,
        config_path: PathBuf,
        strict: bool,
    ) -> Result<Settings> {
        let log_dir = log_dir
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| Error::ConfigurationMissing("no log directory specified".into()))?;

        let settings = Settings::builder()
            .log_dir(log_dir)
            .run_mode(run_mode)
            .config_path(config_path)
            .strict(strict)
            .build();

        settings
            .validate()
            .map_err(Error::from)
            .with_msg(format!("Invalid log directory {:?}", settings.log_dir))?;

        Ok(settings)
    }
}
