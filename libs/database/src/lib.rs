//! Connection helpers for the queue broker.
//!
//! # Features
//!
//! - `redis` (default) - Redis connector and config
//! - `config` - `core_config::FromEnv` implementations
//!
//! ```ignore
//! use database::redis::{connect_from_config_with_retry, RedisConfig};
//!
//! let conn = connect_from_config_with_retry(RedisConfig::from_env()?, None).await?;
//! ```

pub mod common;

#[cfg(feature = "redis")]
pub mod redis;
