//! Logging setup shared by the binaries of this workspace. Keeps the
//! initialization logic in one place so every binary formats its logs the
//! same way.
pub mod config;
pub mod tracing;

pub use config::Config;
