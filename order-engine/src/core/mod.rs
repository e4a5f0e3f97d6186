//! Core engine configuration

mod config;

pub use config::Config;
