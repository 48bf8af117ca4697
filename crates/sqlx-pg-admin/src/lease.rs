//! Scoped, exclusively held administrative connections

use crate::Result;
use crate::connection::{AdminConnection, Connector};
use crate::error::Error;
use tracing::{debug, error};

/// Observer wired into every lease at acquisition time.
///
/// Link-level failures (dropped sockets, protocol errors) are logged here and
/// nowhere else. The observer never panics and never returns an error, so an
/// unexpected link failure cannot take down the host process.
#[derive(Debug, Clone)]
pub struct LinkObserver {
   database: String,
}

impl LinkObserver {
   fn new(database: impl Into<String>) -> Self {
      Self {
         database: database.into(),
      }
   }

   /// Log `err` if it describes a link failure. Statement errors are left to
   /// the caller, who receives them unchanged.
   pub fn observe(&self, err: &Error) {
      if err.is_link_failure() {
         error!(database = %self.database, "Failure in admin client link: {}", err);
      }
   }

   fn inspect<T>(&self, result: Result<T>) -> Result<T> {
      if let Err(e) = &result {
         self.observe(e);
      }
      result
   }
}

/// RAII lease over an administrative connection
///
/// A lease is acquired per operation and never shared. [`ConnectionLease::release`]
/// consumes the lease, so a released connection cannot be used again. If a
/// lease is dropped without being released (an early `?` return, for example)
/// the connection is dropped with it, which closes the socket.
///
/// # Example
///
/// ```no_run
/// use sqlx_pg_admin::{AdminConfig, ConnectionLease, PgConnector};
///
/// # async fn example() -> Result<(), sqlx_pg_admin::Error> {
/// let connector = PgConnector::new(AdminConfig::new("localhost", "root"));
/// let mut lease = ConnectionLease::acquire(&connector, None).await?;
/// let databases = lease.list_databases().await;
/// // Release on every path, success or not
/// lease.release().await;
/// println!("{:?}", databases?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConnectionLease<C: AdminConnection> {
   conn: Option<C>,
   observer: LinkObserver,
}

impl<C: AdminConnection> ConnectionLease<C> {
   /// Open a connection through `connector` and take exclusive ownership of it.
   pub async fn acquire<K>(connector: &K, database: Option<&str>) -> Result<Self>
   where
      K: Connector<Connection = C>,
   {
      let observer = LinkObserver::new(database.unwrap_or("<maintenance>"));
      let conn = observer.inspect(connector.connect(database).await)?;
      Ok(Self::new(conn, observer))
   }

   pub(crate) fn new(conn: C, observer: LinkObserver) -> Self {
      Self {
         conn: Some(conn),
         observer,
      }
   }

   pub fn observer(&self) -> &LinkObserver {
      &self.observer
   }

   fn conn_mut(&mut self) -> Result<&mut C> {
      self.conn.as_mut().ok_or(Error::LeaseReleased)
   }

   pub async fn list_users(&mut self) -> Result<Vec<String>> {
      let result = self.conn_mut()?.list_users().await;
      self.observer.inspect(result)
   }

   pub async fn list_databases(&mut self) -> Result<Vec<String>> {
      let result = self.conn_mut()?.list_databases().await;
      self.observer.inspect(result)
   }

   pub async fn execute(&mut self, sql: &str) -> Result<()> {
      let result = self.conn_mut()?.execute(sql).await;
      self.observer.inspect(result)
   }

   pub async fn terminate_backends(&mut self, database: &str) -> Result<u64> {
      let result = self.conn_mut()?.terminate_backends(database).await;
      self.observer.inspect(result)
   }

   /// Close the connection. Close failures are logged, never returned.
   pub async fn release(mut self) {
      if let Some(conn) = self.conn.take()
         && let Err(e) = conn.close().await
      {
         self.observer.observe(&e);
         debug!(database = %self.observer.database, "Admin connection closed with error: {}", e);
      }
   }
}

impl<C: AdminConnection> Drop for ConnectionLease<C> {
   fn drop(&mut self) {
      if self.conn.is_some() {
         debug!(database = %self.observer.database, "Admin lease dropped without release");
      }
   }
}
