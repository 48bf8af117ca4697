//! Dump, drop and rotate operations against a running server.

use std::fmt::Write as _;
use std::process::Stdio;

use chrono::{DateTime, Local};
use sqlx_pg_admin::{AdminConfig, ConnectionLease, Connector};
use tokio::fs::File;
use tokio::io::{self, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{debug, error, info};

use crate::locator::{ExecutableLocator, Tool};
use crate::provision::{ProvisioningEngine, ProvisioningTarget};
use crate::schema::tool_environment;
use crate::{Error, Result, sql};

/// Destination meaning "the process's own standard output".
pub const STDOUT_DESTINATION: &str = "-";

/// Expand strftime-style placeholders in a dump destination.
///
/// A pattern chrono cannot format is returned unchanged.
pub fn expand_destination(pattern: &str, now: DateTime<Local>) -> String {
   let mut expanded = String::new();
   match write!(expanded, "{}", now.format(pattern)) {
      Ok(()) => expanded,
      Err(_) => pattern.to_string(),
   }
}

/// Maintenance operations. Each one acquires and releases its own leases.
#[derive(Debug)]
pub struct MaintenanceOps<'a, K> {
   connector: &'a K,
   locator: &'a ExecutableLocator,
   admin: &'a AdminConfig,
}

impl<'a, K: Connector> MaintenanceOps<'a, K> {
   pub fn new(connector: &'a K, locator: &'a ExecutableLocator, admin: &'a AdminConfig) -> Self {
      Self {
         connector,
         locator,
         admin,
      }
   }

   /// Stream a dump of `database` to `destination`.
   ///
   /// Failures are logged and never returned: dumps are advisory tooling.
   pub async fn dump(&self, database: &str, destination: &str) {
      match self.try_dump(database, destination).await {
         Ok(target) => info!("Dumped '{}' to '{}'", database, target),
         Err(e) => error!(database, "Could not back up database: {}", e),
      }
   }

   /// Fallible core of [`MaintenanceOps::dump`], returning the expanded
   /// destination.
   ///
   /// The destination file only exists once the dump tool is running, and is
   /// removed again if the dump does not complete.
   pub async fn try_dump(&self, database: &str, destination: &str) -> Result<String> {
      let target = expand_destination(destination, Local::now());
      let binary = self.locator.locate(Tool::Dump)?;

      let mut command = Command::new(&binary);
      command
         .args(["-h", self.admin.host.as_str(), "-U", self.admin.user.as_str(), database])
         .stdin(Stdio::inherit())
         .stdout(Stdio::piped())
         .stderr(Stdio::inherit());
      tool_environment(&mut command, self.admin);

      let mut child = command.spawn().map_err(|source| Error::SpawnFailed {
         tool: Tool::Dump,
         binary: binary.clone(),
         source,
      })?;

      if target == STDOUT_DESTINATION {
         let mut stdout = io::stdout();
         stream_dump(&mut child, &mut stdout).await?;
         return Ok(target);
      }

      let mut file = match File::create(&target).await {
         Ok(file) => file,
         Err(e) => {
            // Nobody will read the output; do not leave the tool blocked on it
            if let Err(kill_err) = child.kill().await {
               debug!("Could not stop dump tool: {}", kill_err);
            }
            return Err(e.into());
         }
      };

      if let Err(e) = stream_dump(&mut child, &mut file).await {
         drop(file);
         if let Err(remove_err) = tokio::fs::remove_file(&target).await {
            debug!(target = %target, "Could not remove incomplete dump: {}", remove_err);
         }
         return Err(e);
      }

      Ok(target)
   }

   /// Drop `database` if it exists, terminating its sessions first.
   pub async fn drop_database(&self, database: &str) -> Result<()> {
      self
         .with_sessions_terminated(database, &sql::drop_database(database))
         .await
   }

   /// Rename `from` to `to`, terminating sessions on `from` first.
   pub async fn rename_database(&self, from: &str, to: &str) -> Result<()> {
      self
         .with_sessions_terminated(from, &sql::rename_database(from, to))
         .await
   }

   /// Archive `current` as `archive` and provision a fresh `current`.
   ///
   /// Each step runs on its own lease, released before the next one starts.
   /// Returns whether the fresh database was created, which is always the
   /// case unless something recreated it concurrently.
   pub async fn rotate(
      &self,
      current: &str,
      archive: &str,
      engine: &ProvisioningEngine<'_, K>,
      target: &ProvisioningTarget<'_>,
   ) -> Result<bool> {
      self.drop_database(archive).await?;
      self.rename_database(current, archive).await?;
      info!(current, archive, "Archived database; provisioning a fresh one");

      let target = ProvisioningTarget {
         database: current,
         ..*target
      };
      let mut lease = ConnectionLease::<K::Connection>::acquire(self.connector, None).await?;
      let result = engine.ensure_user_and_database(&mut lease, &target).await;
      lease.release().await;
      result
   }

   /// Run `statement` on a fresh lease after kicking every session off
   /// `database`. The termination always comes first, even when no session
   /// is connected.
   async fn with_sessions_terminated(&self, database: &str, statement: &str) -> Result<()> {
      let mut lease = ConnectionLease::<K::Connection>::acquire(self.connector, None).await?;

      let result = async {
         let terminated = lease.terminate_backends(database).await?;
         if terminated > 0 {
            info!(database, sessions = terminated, "Terminated active sessions");
         }
         lease.execute(statement).await
      }
      .await;

      lease.release().await;
      result.map_err(Error::Admin)
   }
}

/// Copy the dump tool's output into `sink` and wait for the tool to exit.
async fn stream_dump<W>(child: &mut Child, sink: &mut W) -> Result<()>
where
   W: io::AsyncWrite + Unpin,
{
   let mut dump_output = child.stdout.take().ok_or(Error::MaintenanceOpFailed {
      operation: "dump",
      reason: "dump tool output was not captured".into(),
   })?;

   io::copy(&mut dump_output, sink).await?;
   sink.flush().await?;

   let status = child.wait().await?;
   if !status.success() {
      return Err(Error::MaintenanceOpFailed {
         operation: "dump",
         reason: Error::exit_reason(Tool::Dump, status),
      });
   }
   Ok(())
}
