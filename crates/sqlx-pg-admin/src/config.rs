//! Administrative connection parameters

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::path::PathBuf;

/// Database the admin link lands on when no target database is named.
pub const DEFAULT_MAINTENANCE_DATABASE: &str = "postgres";

/// Default PostgreSQL port.
pub const DEFAULT_PORT: u16 = 5432;

/// Parameters for the administrative connection
///
/// # Examples
///
/// ```
/// use sqlx_pg_admin::AdminConfig;
///
/// // Only host and user are required
/// let config = AdminConfig::new("localhost", "root");
/// assert_eq!(config.port, 5432);
///
/// // Override just one field
/// let config = AdminConfig {
///     password: Some("secret".into()),
///     ..AdminConfig::new("localhost", "root")
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminConfig {
   /// Host name or socket directory of the server
   pub host: String,

   /// TCP port of the server
   ///
   /// Default: 5432
   #[serde(default = "default_port")]
   pub port: u16,

   /// Role with privileges to create and drop users and databases
   pub user: String,

   /// Password of the admin role, if the server requires one
   #[serde(default)]
   pub password: Option<String>,

   /// Database the admin link connects to for catalog queries
   ///
   /// Default: `postgres`
   #[serde(default)]
   pub database: Option<String>,

   /// Data directory handed to the server binary when this process has to
   /// start the server itself
   #[serde(default)]
   pub data_dir: Option<PathBuf>,
}

fn default_port() -> u16 {
   DEFAULT_PORT
}

impl AdminConfig {
   pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
      Self {
         host: host.into(),
         port: DEFAULT_PORT,
         user: user.into(),
         password: None,
         database: None,
         data_dir: None,
      }
   }

   /// Database used for catalog queries and maintenance statements.
   pub fn maintenance_database(&self) -> &str {
      self
         .database
         .as_deref()
         .unwrap_or(DEFAULT_MAINTENANCE_DATABASE)
   }

   /// Build sqlx connect options, landing on `database` if given or on the
   /// maintenance database otherwise.
   pub fn connect_options(&self, database: Option<&str>) -> PgConnectOptions {
      let options = PgConnectOptions::new()
         .host(&self.host)
         .port(self.port)
         .username(&self.user)
         .database(database.unwrap_or_else(|| self.maintenance_database()));

      match &self.password {
         Some(password) => options.password(password),
         None => options,
      }
   }
}
