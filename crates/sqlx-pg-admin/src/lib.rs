//! # sqlx-pg-admin
//!
//! A small capability layer over SQLx for administrative PostgreSQL work:
//! listing roles and databases, running raw statements, and kicking sessions
//! off a database before it is dropped or renamed.
//!
//! ## Core Types
//!
//! - **[`AdminConnection`]** / **[`Connector`]**: capability traits the lifecycle code is written against
//! - **[`PgConnector`]** / **[`PgAdminConnection`]**: sqlx-backed implementations
//! - **[`AdminConfig`]**: host, credentials and data directory of the server
//! - **[`ConnectionLease`]**: RAII lease with a mandatory, non-throwing [`LinkObserver`]
//! - **[`Error`]**: Error type for admin operations
//!
//! ## Usage
//!
//! ```no_run
//! use sqlx_pg_admin::{AdminConfig, ConnectionLease, PgConnector};
//!
//! #[tokio::main]
//! async fn main() -> sqlx_pg_admin::Result<()> {
//!     let connector = PgConnector::new(AdminConfig::new("localhost", "root"));
//!
//!     let mut lease = ConnectionLease::acquire(&connector, None).await?;
//!     let users = lease.list_users().await;
//!     lease.release().await;
//!
//!     println!("{:?}", users?);
//!     Ok(())
//! }
//! ```
//!
//! ## Design Principles
//!
//! - One connection per lease, no pooling: admin operations are short and exclusive
//! - Releasing consumes the lease, so use-after-release does not compile
//! - Link failures are logged by the lease's observer and never escalate to a panic
//!
mod config;
mod connection;
mod error;
mod lease;

// Re-export public types
pub use config::{AdminConfig, DEFAULT_MAINTENANCE_DATABASE, DEFAULT_PORT};
pub use connection::{AdminConnection, Connector, PgAdminConnection, PgConnector};
pub use error::Error;
pub use lease::{ConnectionLease, LinkObserver};

/// A type alias for Results with our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
