use crate::task::function_path;
use crate::task::operation::OperationKind;
use crate::task::path::resolve_target;
use crate::task::result_error::error::Error;
use crate::task::result_error::result::Result;
use crate::task::result_error::WithDebugObjectAndFnName;
use crate::task::validate::validate_not_blank;

use bon::Builder;
use function_name::named;
use getset::{CopyGetters, Getters};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use validator::Validate;

use std::fmt::Debug;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;

/// A declarative task document: a base directory, the targets below it and the
/// operation applied to each of them.
pub trait TaskConfig: DeserializeOwned + Validate + Debug {
    /// Logger name the task runs under.
    const TASK_NAME: &'static str;

    fn base_directory(&self) -> &str;

    fn relative_targets(&self) -> &[String];

    fn operation(&self) -> OperationKind;

    /// Absolute targets, in configuration order.
    fn targets(&self) -> Vec<String> {
        self.relative_targets()
            .iter()
            .map(|relative| resolve_target(self.base_directory(), relative))
            .collect()
    }
}

/// Directories mirrored to a backup destination.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, PartialEq, Eq, Getters)]
#[serde(rename_all = "camelCase")]
#[getset(get = "pub")]
pub struct BackupConfig {
    #[validate(custom(function = validate_not_blank))]
    #[builder(into)]
    home_directory: String,
    #[builder(default, into)]
    source_directories: Vec<String>,
    /// Anything rsync accepts as a destination, including `user@host:/path`.
    #[validate(custom(function = validate_not_blank))]
    #[builder(into)]
    backup_destination: String,
}

impl TaskConfig for BackupConfig {
    const TASK_NAME: &'static str = "backup";

    fn base_directory(&self) -> &str {
        &self.home_directory
    }

    fn relative_targets(&self) -> &[String] {
        &self.source_directories
    }

    fn operation(&self) -> OperationKind {
        OperationKind::Sync {
            destination: self.backup_destination.clone(),
        }
    }
}

/// Directories whose contents are wiped.
#[derive(
    Clone, Debug, Serialize, Deserialize, Validate, Builder, PartialEq, Eq, Getters, CopyGetters,
)]
#[serde(rename_all = "camelCase")]
pub struct CleanupConfig {
    #[validate(custom(function = validate_not_blank))]
    #[builder(into)]
    #[getset(get = "pub")]
    home_directory: String,
    #[builder(default, into)]
    #[getset(get = "pub")]
    temp_directories: Vec<String>,
    /// Also delete dot-entries. Off by default, matching a `dir/*` shell glob.
    #[serde(default)]
    #[builder(default)]
    #[getset(get_copy = "pub")]
    include_hidden: bool,
}

impl TaskConfig for CleanupConfig {
    const TASK_NAME: &'static str = "clean_temp_directories";

    fn base_directory(&self) -> &str {
        &self.home_directory
    }

    fn relative_targets(&self) -> &[String] {
        &self.temp_directories
    }

    fn operation(&self) -> OperationKind {
        OperationKind::DeleteContents {
            include_hidden: self.include_hidden,
        }
    }
}

/// Reads and validates the JSON task document at `path`.
///
/// No path, or a path to a file that does not exist, is
/// [`Error::ConfigurationMissing`]; malformed JSON, missing fields and failed
/// validation are [`Error::ConfigurationParse`].
#[named]
pub fn load_config<C: TaskConfig>(path: Option<&Path>) -> Result<C> {
    tracing::info!("Loading backup configuration file...");
    let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
        tracing::error!("No backup configuration file found!");
        return Err(Error::ConfigurationMissing(
            "Please supply json config file for backup!".into(),
        ));
    };

    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            Error::ConfigurationMissing(format!("configuration file {:?} not found", path))
        }
        _ => Error::from(e).with_debug_object_and_fn_name(path.to_path_buf(), function_path!()),
    })?;

    let config: C = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::configuration_parse(path, e.into()))?;
    config
        .validate()
        .map_err(|e| Error::configuration_parse(path, e.into()))?;

    tracing::info!("Successfully loaded backup configurations!");
    tracing::debug!("Loaded {:?}", config);
    Ok(config)
}
