//! Schema application for freshly created databases.

use std::path::Path;
use std::process::Stdio;

use sqlx_pg_admin::{AdminConfig, ConnectionLease, Connector};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::{QueryMode, SchemaSpec};
use crate::locator::{ExecutableLocator, Tool};
use crate::{Error, Result};

/// Run targets understood by the schema tool.
const RUN_INIT: &str = "--run=init_database";
const RUN_UPDATE: &str = "--run=update_database";

/// Applies a [`SchemaSpec`] to a database.
///
/// Failure handling differs by transport: the schema tool and the SQL shell
/// are fatal on a non-zero exit, while a script sent over a client
/// connection is best effort and only logged.
#[derive(Debug)]
pub struct SchemaApplier<'a, K> {
   connector: &'a K,
   locator: &'a ExecutableLocator,
   admin: &'a AdminConfig,
   query_mode: QueryMode,
   verbose: bool,
}

impl<'a, K: Connector> SchemaApplier<'a, K> {
   pub fn new(
      connector: &'a K,
      locator: &'a ExecutableLocator,
      admin: &'a AdminConfig,
      query_mode: QueryMode,
      verbose: bool,
   ) -> Self {
      Self {
         connector,
         locator,
         admin,
         query_mode,
         verbose,
      }
   }

   /// Bring a newly created `database` to its initial schema.
   pub async fn apply(&self, spec: &SchemaSpec, database: &str) -> Result<()> {
      match spec {
         SchemaSpec::ToolManaged { site } => {
            self
               .run_schema_tool(site, RUN_INIT, database, self.verbose)
               .await
         }
         SchemaSpec::RawSql { path } => {
            info!(mode = ?self.query_mode, script = %path.display(), "Applying raw SQL script");
            match self.query_mode {
               QueryMode::Shell => self.run_shell_script(path, database).await,
               QueryMode::Client => {
                  self.run_client_script(path, database).await;
                  Ok(())
               }
            }
         }
      }
   }

   /// Run a raw SQL script against `database` over the configured transport,
   /// reporting failures from either transport.
   pub async fn run_script(&self, script: &Path, database: &str) -> Result<()> {
      info!(mode = ?self.query_mode, script = %script.display(), database, "Running raw SQL script");
      match self.query_mode {
         QueryMode::Shell => self.run_shell_script(script, database).await,
         QueryMode::Client => self.try_run_client_script(script, database).await,
      }
   }

   /// Bring an existing installation up to date. Only the schema tool knows
   /// how to migrate; raw scripts are applied at creation time only.
   pub async fn update(&self, spec: &SchemaSpec, database: &str) -> Result<()> {
      match spec {
         SchemaSpec::ToolManaged { site } => {
            self.run_schema_tool(site, RUN_UPDATE, database, true).await
         }
         SchemaSpec::RawSql { .. } => {
            debug!(database, "Raw SQL schemas have no update step");
            Ok(())
         }
      }
   }

   async fn run_schema_tool(
      &self,
      site: &str,
      run: &str,
      database: &str,
      inherit_output: bool,
   ) -> Result<()> {
      let binary = self.locator.locate(Tool::SchemaTool)?;
      let mut command = Command::new(&binary);
      command.args([site, "sql", run]);
      self.run_to_completion(Tool::SchemaTool, &binary, command, database, inherit_output)
         .await
   }

   async fn run_shell_script(&self, script: &Path, database: &str) -> Result<()> {
      let binary = self.locator.locate(Tool::Shell)?;
      let mut command = Command::new(&binary);
      command
         .arg("-U")
         .arg(&self.admin.user)
         .arg("-h")
         .arg(&self.admin.host)
         .arg("-f")
         .arg(script)
         .arg(database);
      self.run_to_completion(Tool::Shell, &binary, command, database, self.verbose)
         .await
   }

   async fn run_client_script(&self, script: &Path, database: &str) {
      if let Err(e) = self.try_run_client_script(script, database).await {
         error!(
            database,
            script = %script.display(),
            "Could not populate database with raw SQL: {}",
            e
         );
      }
   }

   async fn try_run_client_script(&self, script: &Path, database: &str) -> Result<()> {
      let contents = tokio::fs::read_to_string(script).await?;

      let mut lease = ConnectionLease::<K::Connection>::acquire(self.connector, Some(database)).await?;
      let result = lease.execute(&contents).await;
      lease.release().await;

      result.map_err(Error::Admin)
   }

   async fn run_to_completion(
      &self,
      tool: Tool,
      binary: &Path,
      mut command: Command,
      database: &str,
      inherit_output: bool,
   ) -> Result<()> {
      let output = || {
         if inherit_output {
            Stdio::inherit()
         } else {
            Stdio::null()
         }
      };

      command
         .stdin(Stdio::inherit())
         .stdout(output())
         .stderr(output());
      tool_environment(&mut command, self.admin);

      debug!(%tool, binary = %binary.display(), database, "Running schema step");
      let status = command
         .status()
         .await
         .map_err(|source| Error::SpawnFailed {
            tool,
            binary: binary.to_path_buf(),
            source,
         })?;

      if !status.success() {
         return Err(Error::SchemaApplyFailed {
            database: database.to_string(),
            reason: Error::exit_reason(tool, status),
         });
      }
      Ok(())
   }
}

/// Connection settings for wrapped client tools that are not part of their
/// argument contract.
pub(crate) fn tool_environment(command: &mut Command, admin: &AdminConfig) {
   command.env("PGPORT", admin.port.to_string());
   if let Some(password) = &admin.password {
      command.env("PGPASSWORD", password);
   }
}
