pub mod config;
pub mod error;
pub mod types;

pub use config::NoemaConfig;
pub use error::{NoemaError, Result};
pub use types::*;
