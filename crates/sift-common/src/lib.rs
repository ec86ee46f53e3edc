//! sift-common: shared error taxonomy and engine configuration.

pub mod config;
pub mod error;

pub use config::{EngineConfig, JitConfig, OptLevel};
pub use error::{SiftError, SiftResult};
