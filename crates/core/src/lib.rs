mod assets;
mod provider;

pub mod completion;
pub mod config;
pub mod mcp;
pub mod mode;
pub mod model;
pub mod session;

pub use crate::assets::{env_template, get_config_dir, get_data_dir};
pub use crate::provider::llm::get_chat_model;
