//! Idempotent creation of the target user and database.

use sqlx_pg_admin::{ConnectionLease, Connector};
use tracing::info;

use crate::config::SchemaSpec;
use crate::schema::SchemaApplier;
use crate::{Error, Result, sql};

/// What to provision.
#[derive(Debug, Clone, Copy)]
pub struct ProvisioningTarget<'a> {
   pub user: &'a str,
   pub password: Option<&'a str>,
   pub database: &'a str,
   pub schema: Option<&'a SchemaSpec>,
}

/// Ensures a user and database exist, creating each at most once.
///
/// Every step checks before it creates, so a failed run can simply be
/// repeated from the start.
#[derive(Debug)]
pub struct ProvisioningEngine<'a, K> {
   schema: SchemaApplier<'a, K>,
}

impl<'a, K: Connector> ProvisioningEngine<'a, K> {
   pub fn new(schema: SchemaApplier<'a, K>) -> Self {
      Self { schema }
   }

   /// Ensure `target` exists, returning `true` if the database was created
   /// by this call.
   ///
   /// The user is always ensured before the database is looked at, so a new
   /// database can be granted to it while its schema is applied.
   pub async fn ensure_user_and_database(
      &self,
      lease: &mut ConnectionLease<K::Connection>,
      target: &ProvisioningTarget<'_>,
   ) -> Result<bool> {
      let database = target.database;
      let failed = |source| Error::provisioning(database, source);

      let users = lease.list_users().await.map_err(failed)?;
      if !users.iter().any(|user| user == target.user) {
         info!(user = target.user, "Creating user");
         lease
            .execute(&sql::create_user(target.user, target.password))
            .await
            .map_err(failed)?;
      }

      let databases = lease.list_databases().await.map_err(failed)?;
      let created = !databases.iter().any(|name| name == database);

      if created {
         info!(database, "Creating database");
         lease
            .execute(&sql::create_database(database))
            .await
            .map_err(failed)?;

         if let Some(spec) = target.schema {
            self.schema.apply(spec, database).await?;
         }
      } else {
         info!(database, "Database already exists");
      }

      Ok(created)
   }
}
