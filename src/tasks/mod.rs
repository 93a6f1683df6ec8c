//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the cache is live.
//!
//! # Tasks
//! - TTL Sweeper: removes expired cache entries at configured intervals

mod sweeper;

pub(crate) use sweeper::spawn_sweeper;
