use crate::task::result_error::{WithDebugObjectAndFnName, WithMsg};
use itertools::Itertools;
use std::fmt::Debug;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),
    #[error("Configuration {:?} is invalid:\n{}", path, indent::indent_all_with("  ", error.to_string()))]
    ConfigurationParse { path: PathBuf, error: Box<Error> },
    #[error("{program} failed on {target}: {reason}")]
    Operation {
        program: String,
        target: String,
        reason: String,
    },
    #[error("{}:\n{}", msg, indent::indent_all_with("  ", error.to_string()))]
    WithMsg { msg: String, error: Box<Error> },
    #[error("{:?} {} failed:\n{}", obj_debug, fn_name, indent::indent_all_with("  ", error.to_string()))]
    WithDebugObjAndFnName {
        error: Box<Error>,
        obj_debug: Box<dyn Debug + Send>,
        fn_name: String,
    },
    #[error("{}", itertools::join(.0, "\n\n"))]
    LotsOfError(Vec<Error>),
}

impl<S: Into<String>, O: Debug + Send + 'static> WithDebugObjectAndFnName<S, O> for Error {
    fn with_debug_object_and_fn_name(self, obj: O, fn_name: S) -> Self {
        Error::WithDebugObjAndFnName {
            error: Box::new(self),
            obj_debug: Box::new(obj),
            fn_name: fn_name.into(),
        }
    }
}

impl<S: Into<String>> WithMsg<S> for Error {
    fn with_msg(self, msg: S) -> Self {
        Self::WithMsg {
            msg: msg.into(),
            error: Box::new(self),
        }
    }
}

impl From<Vec<Error>> for Error {
    fn from(errors: Vec<Error>) -> Self {
        if errors.is_empty() {
            panic!("Should not create lots of errors when error is empty")
        }
        Self::LotsOfError(errors.into_iter().flat_map(Error::into_iter).collect_vec())
    }
}

impl Error {
    pub fn into_iter(self) -> Box<dyn Iterator<Item = Error>> {
        match self {
            Error::LotsOfError(v) => Box::new(v.into_iter().flat_map(Error::into_iter)),
            e => Box::new(std::iter::once(e)),
        }
    }

    /// Wraps `error` as a parse failure of the document at `path`.
    pub fn configuration_parse<P: Into<PathBuf>>(path: P, error: Error) -> Error {
        Error::ConfigurationParse {
            path: path.into(),
            error: Box::new(error),
        }
    }
}
