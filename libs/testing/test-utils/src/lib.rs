//! Shared test utilities for integration tests
//!
//! - `TestDatabase`: PostgreSQL container with the `cloud_plans` schema
//!   migrated and automatic cleanup (feature: "postgres")
//!
//! Tests using it need Docker and are marked `#[ignore]`; run them with
//! `cargo test -- --ignored`.
//!
//! ```rust,no_run
//! use test_utils::TestDatabase;
//!
//! #[tokio::test]
//! #[ignore = "requires Docker"]
//! async fn my_postgres_test() {
//!     let db = TestDatabase::new().await;
//!     let connection = db.connection();
//! }
//! ```

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;
