pub mod config;
pub mod lenient;
pub mod types;

pub use config::KknConfig;
pub use types::*;
