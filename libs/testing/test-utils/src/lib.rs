//! Shared test infrastructure.
//!
//! `TestRedis` starts a throwaway Redis container. Tests using it need Docker
//! and are marked `#[ignore]`; run them with `cargo test -- --ignored`.
//!
//! ```rust,ignore
//! use test_utils::{TestRedis, unique_name};
//!
//! #[tokio::test]
//! #[ignore]
//! async fn round_trip() {
//!     let redis = TestRedis::new().await;
//!     let producer = StreamProducer::new(redis.connection_manager().await, unique_name("jobs"));
//! }
//! ```

mod redis;

pub use redis::TestRedis;

use uuid::Uuid;

/// `<prefix>:<random>`, for stream and group names that must not collide
/// between tests sharing a container.
pub fn unique_name(prefix: &str) -> String {
    format!("{}:{}", prefix, Uuid::new_v4().simple())
}
