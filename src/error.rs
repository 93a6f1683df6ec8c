//! Error types for the cache
//!
//! Provides unified error handling using thiserror.
//!
//! Normal cache operations never fail: a `get` on a missing or expired key
//! is an empty result, and conditional-removal races are absorbed silently.
//! The only fallible surface is configuration validation at construction.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Construction-time configuration was rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
