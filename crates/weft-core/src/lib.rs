pub mod config;
pub mod error;
pub mod records;
pub mod traits;
pub mod types;

pub use config::RuntimeConfig;
pub use error::{Result, WeftError};
pub use records::*;
pub use types::*;
