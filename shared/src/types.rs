//! Common types for the shared crate

/// Timestamp type (Unix milliseconds)
pub type Timestamp = i64;

/// Chat identifier (one conversation = one chat)
pub type ChatId = i64;

/// User identifier (messenger account id)
pub type UserId = i64;
