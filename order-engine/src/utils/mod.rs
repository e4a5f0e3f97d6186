//! Utility modules: logging, clock injection, business-time helpers

pub mod clock;
pub mod logger;
pub mod time;
