//! CLI command implementations.

mod find_meta;
mod identify;
mod show_config;
mod validate;

pub use find_meta::execute_find_meta_command;
pub use identify::execute_identify_command;
pub use show_config::execute_show_config_command;
pub use validate::{ValidationTarget, execute_validation, render_report};
