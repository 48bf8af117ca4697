//! Configuration for a managed server instance.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sqlx_pg_admin::AdminConfig;

use crate::{Error, Result};

/// How the schema of a freshly created database is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SchemaSpec {
   /// An external schema-management tool owns the schema.
   #[serde(rename = "tool-managed", alias = "clyks")]
   ToolManaged { site: String },

   /// A raw SQL script seeds the database.
   #[serde(rename = "rawsql")]
   RawSql { path: PathBuf },
}

/// Transport used to run raw SQL scripts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
   /// Pipe the script through the SQL shell executable.
   #[default]
   #[serde(alias = "psql")]
   Shell,
   /// Send the script over an admin connection to the target database.
   Client,
}

/// Overrides for the executables the locator resolves.
///
/// Each entry is either a path or a program name looked up on `PATH`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryOverrides {
   #[serde(default)]
   pub server: Option<String>,
   #[serde(default)]
   pub dump: Option<String>,
   #[serde(default)]
   pub shell: Option<String>,
   #[serde(default)]
   pub schema_tool: Option<String>,
}

/// Loaded configuration, immutable once constructed.
///
/// # Examples
///
/// ```
/// use pg_lifecycle::{Config, QueryMode, SchemaSpec};
///
/// let config = Config::from_json_str(r#"{
///    "admin": {"host": "localhost", "user": "root"},
///    "user": "app",
///    "database": "appdb",
///    "dbschema": {"type": "rawsql", "path": "seed.sql"},
///    "querymode": "client"
/// }"#).unwrap();
///
/// assert_eq!(config.query_mode, QueryMode::Client);
/// assert_eq!(config.schema, Some(SchemaSpec::RawSql { path: "seed.sql".into() }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
   /// Administrative connection parameters.
   pub admin: AdminConfig,

   /// Application user owning the target database.
   #[serde(default)]
   pub user: Option<String>,

   /// Password for the application user. Absent means the user is created
   /// without a password clause.
   #[serde(default)]
   pub password: Option<String>,

   /// Target database. Without one, the server is only brought up.
   #[serde(default)]
   pub database: Option<String>,

   /// Schema applied when the target database is first created.
   #[serde(default, rename = "dbschema")]
   pub schema: Option<SchemaSpec>,

   /// Transport for raw SQL scripts.
   #[serde(default, rename = "querymode")]
   pub query_mode: QueryMode,

   #[serde(default)]
   pub binaries: BinaryOverrides,

   /// Inherit all child stdio while applying schemas.
   #[serde(default)]
   pub verbose: bool,
}

impl Config {
   /// Read and validate a JSON configuration file.
   pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
      let contents = fs::read_to_string(path)?;
      Self::from_json_str(&contents)
   }

   /// Parse and validate a JSON configuration document.
   pub fn from_json_str(contents: &str) -> Result<Self> {
      let config: Config = serde_json::from_str(contents)?;
      config.validate()?;
      Ok(config)
   }

   /// Check cross-field requirements serde cannot express.
   pub fn validate(&self) -> Result<()> {
      if self.database.is_some() && self.user.is_none() {
         return Err(Error::InvalidConfig(
            "'user' is required when 'database' is set".into(),
         ));
      }

      if let Some(database) = &self.database
         && database.is_empty()
      {
         return Err(Error::InvalidConfig("'database' cannot be empty".into()));
      }

      Ok(())
   }
}
