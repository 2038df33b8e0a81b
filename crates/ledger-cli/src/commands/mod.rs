//! Command implementations.

pub mod config;
pub mod render;
pub mod run;
pub mod validate;

pub use self::config::execute_config;
pub use self::render::execute_render;
pub use self::run::execute_run;
pub use self::validate::execute_validate;
