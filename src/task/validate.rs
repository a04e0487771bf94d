//! Validation functions for configuration values.
//!
//! Custom validators used by `#[validate(custom(...))]` on the settings and
//! task configuration structs.

use validator::ValidationError;

use std::path::Path;

pub fn validate_not_blank<S: AsRef<str>>(value: S) -> Result<(), ValidationError> {
    if value.as_ref().trim().is_empty() {
        return Err(ValidationError::new("Blank").with_message("must not be blank".into()));
    }

    Ok(())
}

pub fn validate_dir_exist_or_created<P: AsRef<Path>>(dir: P) -> Result<(), ValidationError> {
    let dir = dir.as_ref();
    if dir.as_os_str().is_empty() {
        return Err(ValidationError::new("InvalidDirectory")
            .with_message("directory path is empty".into()));
    }

    if dir.exists() {
        if !dir.is_dir() {
            return Err(ValidationError::new("InvalidDirectory")
                .with_message(format!("{:?} is not a directory", dir).into()));
        }
    } else {
        return std::fs::create_dir_all(dir).map_err(|e| {
            ValidationError::new("InvalidDirectory").with_message(
                format!("cannot create or access directory {:?}: {}", dir, e).into(),
            )
        });
    }

    Ok(())
}

pub fn validate_writable_dir<P: AsRef<Path>>(dir: P) -> Result<(), ValidationError> {
    let dir = dir.as_ref();
    validate_dir_exist_or_created(dir)?;
    let md = std::fs::metadata(dir).map_err(|e| {
        ValidationError::new("InvalidDirectory")
            .with_message(format!("cannot access metadata for {:?}: {}", dir, e).into())
    })?;
    if md.permissions().readonly() {
        Err(ValidationError::new("InvalidDirectory")
            .with_message(format!("cannot write to dir {:?}", dir).into()))
    } else {
        Ok(())
    }
}
