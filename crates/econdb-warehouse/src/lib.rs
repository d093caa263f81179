pub mod api;
pub mod config;
pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod models;
pub mod schema;
pub mod state;

pub use crate::config::Settings;
pub use crate::error::{Error, Result};
pub use crate::state::AppState;
