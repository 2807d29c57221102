//! Configuration file parsing for the app manager
//!
//! Settings live in `<config_dir>/webide/config.toml`.

pub mod settings;
pub mod types;

pub use settings::{default_config_dir, load_settings, save_settings};
pub use types::*;
