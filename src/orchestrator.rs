//! Composition of the lifecycle components into the public entry points.

use std::path::Path;
use std::time::Duration;

use sqlx_pg_admin::{ConnectionLease, Connector, PgConnector};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::locator::ExecutableLocator;
use crate::maintenance::{MaintenanceOps, STDOUT_DESTINATION};
use crate::probe::ConnectionProbe;
use crate::provision::{ProvisioningEngine, ProvisioningTarget};
use crate::schema::SchemaApplier;
use crate::supervisor::{ProcessSupervisor, STOP_GRACE, ServerHandle};
use crate::{Error, Result};

/// Pause between spawning the server and the first connection attempt.
pub const STARTUP_DELAY: Duration = Duration::from_secs(1);

/// Drives a server instance through attach-or-start, connect and provision,
/// and exposes the maintenance operations.
///
/// Operations against the same target database must not run concurrently;
/// each one holds its own admin lease for its duration.
///
/// # Example
///
/// ```no_run
/// use pg_lifecycle::LifecycleOrchestrator;
///
/// # async fn example() -> pg_lifecycle::Result<()> {
/// let mut lifecycle = LifecycleOrchestrator::from_path("config.json")?;
/// lifecycle.connect_or_start_server().await?;
/// lifecycle.dump(None, Some("backup-%Y%m%d.sql")).await;
/// lifecycle.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LifecycleOrchestrator<K: Connector = PgConnector> {
   config: Config,
   connector: K,
   locator: ExecutableLocator,
   probe: ConnectionProbe,
   startup_delay: Duration,
   server: Option<ServerHandle>,
}

impl LifecycleOrchestrator<PgConnector> {
   /// Orchestrator talking to the configured server through sqlx.
   pub fn new(config: Config) -> Self {
      let connector = PgConnector::new(config.admin.clone());
      Self::with_connector(config, connector)
   }

   /// Load a JSON configuration file and build an orchestrator from it.
   pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
      Ok(Self::new(Config::from_path(path)?))
   }
}

impl<K: Connector> LifecycleOrchestrator<K> {
   pub fn with_connector(config: Config, connector: K) -> Self {
      let locator = ExecutableLocator::new(config.binaries.clone());
      Self {
         config,
         connector,
         locator,
         probe: ConnectionProbe::default(),
         startup_delay: STARTUP_DELAY,
         server: None,
      }
   }

   pub fn with_probe(mut self, probe: ConnectionProbe) -> Self {
      self.probe = probe;
      self
   }

   pub fn with_startup_delay(mut self, delay: Duration) -> Self {
      self.startup_delay = delay;
      self
   }

   pub fn config(&self) -> &Config {
      &self.config
   }

   pub fn connector(&self) -> &K {
      &self.connector
   }

   /// Handle of the server this orchestrator started, if any.
   pub fn server(&self) -> Option<&ServerHandle> {
      self.server.as_ref()
   }

   /// Attach to a running server or start one, wait until it accepts admin
   /// connections, then provision the target database if one is configured.
   ///
   /// Fails with [`Error::ServerUnreachable`] once the retry budget is spent.
   pub async fn connect_or_start_server(&mut self) -> Result<()> {
      match self.probe.try_connect(&self.connector).await {
         Ok(lease) => {
            lease.release().await;
            info!("Connected to an existing server instance");
         }
         Err(failure) => {
            let wait = if self.start_server()? {
               self.startup_delay
            } else {
               self.probe.backoff()
            };
            tokio::time::sleep(wait).await;

            let lease = self
               .probe
               .retry_after_failure(&self.connector, failure)
               .await?;
            lease.release().await;
         }
      }

      info!("Server is up & running");

      if self.config.database.is_none() {
         return Ok(());
      }

      self.init_database().await?;
      Ok(())
   }

   /// Spawn the server if possible. Returns whether a process was started.
   fn start_server(&mut self) -> Result<bool> {
      if self.server.is_some() {
         warn!("Server started earlier is not reachable yet; waiting for it");
         return Ok(false);
      }

      let Some(data_dir) = &self.config.admin.data_dir else {
         warn!("Server unreachable and no data directory configured; waiting for an external server");
         return Ok(false);
      };

      self.server = ProcessSupervisor::new(&self.locator).ensure_running(false, data_dir)?;
      Ok(self.server.is_some())
   }

   /// Ensure the configured user and database exist.
   ///
   /// Returns `true` if the database was created by this call, in which case
   /// its schema has just been applied and callers may seed it.
   pub async fn init_database(&self) -> Result<bool> {
      let target = self.target()?;
      info!(database = target.database, "Checking main database");

      let mut lease = ConnectionLease::<K::Connection>::acquire(&self.connector, None)
         .await
         .map_err(|e| Error::provisioning(target.database, e))?;
      let result = self
         .provisioning_engine()
         .ensure_user_and_database(&mut lease, &target)
         .await;
      lease.release().await;

      result
   }

   /// Bring an existing installation's schema up to date.
   pub async fn update_database(&self) -> Result<()> {
      let Some(spec) = &self.config.schema else {
         return Ok(());
      };

      let database = self
         .config
         .database
         .as_deref()
         .unwrap_or_else(|| self.config.admin.maintenance_database());
      self.schema_applier().update(spec, database).await
   }

   /// Dump `database` (default: the configured one) to `destination`
   /// (default: standard output). Failures are logged, never returned.
   pub async fn dump(&self, database: Option<&str>, destination: Option<&str>) {
      let Some(database) = database.or(self.config.database.as_deref()) else {
         error!("Could not back up database: no database named or configured");
         return;
      };

      self
         .maintenance()
         .dump(database, destination.unwrap_or(STDOUT_DESTINATION))
         .await;
   }

   /// Load the SQL file at `script` into the configured database, typically
   /// mock or seed data.
   ///
   /// Uses the configured query mode. Failures are logged as
   /// [`Error::MaintenanceOpFailed`] and never returned.
   pub async fn populate(&self, script: impl AsRef<Path>) {
      let script = script.as_ref();
      let Some(database) = self.config.database.as_deref() else {
         error!(script = %script.display(), "Could not populate: no database configured");
         return;
      };

      match self.schema_applier().run_script(script, database).await {
         Ok(()) => info!(database, script = %script.display(), "Populated database"),
         Err(e) => {
            let err = Error::MaintenanceOpFailed {
               operation: "populate",
               reason: e.to_string(),
            };
            error!(database, script = %script.display(), "{}", err);
         }
      }
   }

   /// Drop `database` after terminating its sessions.
   pub async fn drop_database(&self, database: &str) -> Result<()> {
      self.maintenance().drop_database(database).await
   }

   /// Archive `current` under `archive` and provision a fresh `current`.
   pub async fn rotate(&self, current: &str, archive: &str) -> Result<bool> {
      let target = self.target()?;
      self
         .maintenance()
         .rotate(current, archive, &self.provisioning_engine(), &target)
         .await
   }

   /// Stop the server this orchestrator started, waiting at most the stop
   /// grace period. A no-op when the server was already running.
   pub async fn shutdown(&mut self) {
      ProcessSupervisor::terminate(self.server.take(), STOP_GRACE).await;
   }

   /// Stop the server and exit the host process.
   ///
   /// Exit happens within the grace period whether or not the server
   /// acknowledged the stop signal.
   pub async fn stop(mut self) {
      self.shutdown().await;
      info!("Exiting");
      std::process::exit(0);
   }

   fn target(&self) -> Result<ProvisioningTarget<'_>> {
      let (Some(user), Some(database)) = (&self.config.user, &self.config.database) else {
         return Err(Error::InvalidConfig(
            "'user' and 'database' are required to provision".into(),
         ));
      };

      Ok(ProvisioningTarget {
         user,
         password: self.config.password.as_deref(),
         database,
         schema: self.config.schema.as_ref(),
      })
   }

   fn schema_applier(&self) -> SchemaApplier<'_, K> {
      SchemaApplier::new(
         &self.connector,
         &self.locator,
         &self.config.admin,
         self.config.query_mode,
         self.config.verbose,
      )
   }

   fn provisioning_engine(&self) -> ProvisioningEngine<'_, K> {
      ProvisioningEngine::new(self.schema_applier())
   }

   fn maintenance(&self) -> MaintenanceOps<'_, K> {
      MaintenanceOps::new(&self.connector, &self.locator, &self.config.admin)
   }
}

impl<K: Connector> Drop for LifecycleOrchestrator<K> {
   fn drop(&mut self) {
      if let Some(server) = &self.server {
         warn!(
            pid = ?server.id(),
            "Orchestrator dropped while holding a server; call shutdown() to stop it"
         );
      }
   }
}
