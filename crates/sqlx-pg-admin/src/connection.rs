//! Administrative client capabilities and their PostgreSQL implementation

use crate::Result;
use crate::config::AdminConfig;
use sqlx::postgres::PgConnection;
use sqlx::Connection;
use std::future::Future;
use tracing::debug;

/// An open administrative link to the server.
///
/// Implementors only need to expose the handful of catalog queries and
/// statements that lifecycle management relies on; everything else is
/// expressed as raw SQL through [`AdminConnection::execute`].
pub trait AdminConnection: Send + Sized {
   /// Names of all roles that can log in.
   fn list_users(&mut self) -> impl Future<Output = Result<Vec<String>>> + Send;

   /// Names of all databases in the cluster.
   fn list_databases(&mut self) -> impl Future<Output = Result<Vec<String>>> + Send;

   /// Execute `sql` as a single batch. The batch may hold several statements.
   fn execute(&mut self, sql: &str) -> impl Future<Output = Result<()>> + Send;

   /// Terminate every backend connected to `database` other than this one,
   /// returning how many sessions were signalled.
   fn terminate_backends(&mut self, database: &str) -> impl Future<Output = Result<u64>> + Send;

   /// Close the link gracefully.
   fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens administrative connections.
pub trait Connector: Send + Sync {
   type Connection: AdminConnection;

   /// Connect with admin credentials, landing on `database` if given or on
   /// the maintenance database otherwise.
   fn connect(
      &self,
      database: Option<&str>,
   ) -> impl Future<Output = Result<Self::Connection>> + Send;
}

/// [`Connector`] backed by a single sqlx [`PgConnection`] per link.
///
/// No pool is kept: lifecycle operations are short and each one must hold
/// its own connection exclusively.
#[derive(Debug, Clone)]
pub struct PgConnector {
   config: AdminConfig,
}

impl PgConnector {
   pub fn new(config: AdminConfig) -> Self {
      Self { config }
   }

   pub fn config(&self) -> &AdminConfig {
      &self.config
   }
}

impl Connector for PgConnector {
   type Connection = PgAdminConnection;

   async fn connect(&self, database: Option<&str>) -> Result<PgAdminConnection> {
      let options = self.config.connect_options(database);

      let conn = PgConnection::connect_with(&options).await?;
      debug!(
         host = %self.config.host,
         database = database.unwrap_or_else(|| self.config.maintenance_database()),
         "Opened admin connection"
      );

      Ok(PgAdminConnection { conn })
   }
}

/// Administrative link over a sqlx [`PgConnection`].
#[derive(Debug)]
pub struct PgAdminConnection {
   conn: PgConnection,
}

impl AdminConnection for PgAdminConnection {
   async fn list_users(&mut self) -> Result<Vec<String>> {
      let users = sqlx::query_scalar::<_, String>("SELECT usename::text FROM pg_catalog.pg_user")
         .fetch_all(&mut self.conn)
         .await?;

      Ok(users)
   }

   async fn list_databases(&mut self) -> Result<Vec<String>> {
      let databases =
         sqlx::query_scalar::<_, String>("SELECT datname::text FROM pg_catalog.pg_database")
            .fetch_all(&mut self.conn)
            .await?;

      Ok(databases)
   }

   async fn execute(&mut self, sql: &str) -> Result<()> {
      // Through the trait so the future stays Send for every borrow lifetime
      sqlx::Executor::execute(&mut self.conn, sqlx::raw_sql(sql)).await?;
      Ok(())
   }

   async fn terminate_backends(&mut self, database: &str) -> Result<u64> {
      let signalled = sqlx::query_scalar::<_, Option<bool>>(
         "SELECT pg_terminate_backend(pid) FROM pg_catalog.pg_stat_activity \
          WHERE datname = $1 AND pid <> pg_backend_pid()",
      )
      .bind(database)
      .fetch_all(&mut self.conn)
      .await?;

      Ok(signalled.into_iter().filter(|ok| *ok == Some(true)).count() as u64)
   }

   async fn close(self) -> Result<()> {
      self.conn.close().await?;
      Ok(())
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn assert_send<T: Send>(_: T) {}

   // Compiling this is the check: lifecycle code spawns these futures on a
   // multi-threaded runtime.
   fn admin_futures_are_send(mut conn: PgAdminConnection) {
      assert_send(conn.list_users());
      assert_send(conn.list_databases());
      assert_send(conn.execute("SELECT 1; SELECT 2"));
      assert_send(conn.terminate_backends("appdb"));
      assert_send(conn.close());
   }

   #[test]
   fn test_pg_admin_futures_are_send() {
      let _ = admin_futures_are_send;
   }
}
