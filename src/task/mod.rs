pub mod batch;
pub mod command;
pub mod logging;
pub mod operation;
pub mod path;
pub mod result_error;
pub mod settings;
pub mod task_config;
pub mod validate;

macro_rules! function_path {
    () => {
        concat!(module_path!(), "::", function_name!(), " ", file!(), ":", line!())
    };
}

pub(crate) use function_path;
