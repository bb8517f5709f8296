//! Configuration module
//!
//! Settings loaded from the user's TOML config file.

pub mod config;
