//! Layered configuration: command-line flags over a TOML file over built-in defaults.

pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;
