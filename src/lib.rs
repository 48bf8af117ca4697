//! Lifecycle management for a PostgreSQL server used by a larger application.
//!
//! The crate attaches to a running server or starts one, waits for it to
//! accept an administrative connection, and provisions the application's
//! user, database and schema exactly once. Maintenance operations (dump, drop,
//! rotate, populate) run against an already running server.
//!
//! - [`LifecycleOrchestrator`]: public entry points composing everything below
//! - [`ExecutableLocator`]: resolves the wrapped binaries
//! - [`ProcessSupervisor`]: spawns and stops the server process
//! - [`ConnectionProbe`]: admin connection with bounded, constant backoff
//! - [`ProvisioningEngine`]: idempotent user and database creation
//! - [`SchemaApplier`]: schema tool, SQL shell, or client-side raw SQL
//! - [`MaintenanceOps`]: dump, drop and rotate
//!
//! Database access goes through the capability traits of [`sqlx_pg_admin`],
//! so any [`Connector`] can stand in for the real server.
//!
//! # Example
//!
//! ```no_run
//! use pg_lifecycle::{Config, LifecycleOrchestrator};
//!
//! # async fn example() -> pg_lifecycle::Result<()> {
//! pg_lifecycle::logging::init();
//!
//! let config = Config::from_path("config.json")?;
//! let mut lifecycle = LifecycleOrchestrator::new(config);
//!
//! lifecycle.connect_or_start_server().await?;
//! if lifecycle.init_database().await? {
//!    lifecycle.populate("mock_data.sql").await;
//! }
//!
//! lifecycle.rotate("appdb", "appdb_previous").await?;
//! lifecycle.stop().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod locator;
pub mod logging;
mod maintenance;
mod orchestrator;
mod probe;
mod provision;
mod schema;
pub mod sql;
mod supervisor;

pub use config::{BinaryOverrides, Config, QueryMode, SchemaSpec};
pub use error::{Error, Result};
pub use locator::{ExecutableLocator, Tool};
pub use maintenance::{MaintenanceOps, STDOUT_DESTINATION, expand_destination};
pub use orchestrator::{LifecycleOrchestrator, STARTUP_DELAY};
pub use probe::{BACKOFF, ConnectionProbe, MAX_ATTEMPTS};
pub use provision::{ProvisioningEngine, ProvisioningTarget};
pub use schema::SchemaApplier;
pub use supervisor::{ProcessSupervisor, STOP_GRACE, ServerHandle};

// Re-export the admin client types callers need to plug in their own connector
pub use sqlx_pg_admin::{
   AdminConfig, AdminConnection, ConnectionLease, Connector, PgAdminConnection, PgConnector,
};
