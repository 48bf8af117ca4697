use std::path::PathBuf;
use std::process::ExitStatus;

use crate::locator::Tool;

/// Result type alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for server lifecycle management.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// The admin link could not be established within the retry budget.
   #[error("server unreachable after {attempts} attempts: {source}")]
   ServerUnreachable {
      attempts: usize,
      #[source]
      source: sqlx_pg_admin::Error,
   },

   /// A statement failed while ensuring the target user or database.
   #[error("provisioning of '{database}' failed: {source}")]
   ProvisioningFailed {
      database: String,
      #[source]
      source: sqlx_pg_admin::Error,
   },

   /// The schema tool or SQL shell exited unsuccessfully or could not run.
   #[error("schema application for '{database}' failed: {reason}")]
   SchemaApplyFailed { database: String, reason: String },

   /// A maintenance operation failed. Only raised internally; the public
   /// dump entry point logs it instead.
   #[error("{operation} failed: {reason}")]
   MaintenanceOpFailed {
      operation: &'static str,
      reason: String,
   },

   /// A wrapped tool could not be found.
   #[error("{tool} executable '{program}' not found: {source}")]
   ExecutableNotFound {
      tool: Tool,
      program: String,
      #[source]
      source: which::Error,
   },

   /// A wrapped tool was found but could not be started.
   #[error("failed to spawn {tool} binary {binary:?}: {source}")]
   SpawnFailed {
      tool: Tool,
      binary: PathBuf,
      #[source]
      source: std::io::Error,
   },

   /// Configuration is structurally valid JSON but semantically incomplete.
   #[error("invalid configuration: {0}")]
   InvalidConfig(String),

   /// Configuration file could not be parsed.
   #[error("failed to parse configuration: {0}")]
   Config(#[from] serde_json::Error),

   /// Error from the admin client outside of provisioning.
   #[error(transparent)]
   Admin(#[from] sqlx_pg_admin::Error),

   /// I/O error when reading configuration or scripts.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for callers that map
   /// failures to exit codes or reports.
   pub fn error_code(&self) -> String {
      match self {
         Error::ServerUnreachable { .. } => "SERVER_UNREACHABLE".to_string(),
         Error::ProvisioningFailed { .. } => "PROVISIONING_FAILED".to_string(),
         Error::SchemaApplyFailed { .. } => "SCHEMA_APPLY_FAILED".to_string(),
         Error::MaintenanceOpFailed { .. } => "MAINTENANCE_OP_FAILED".to_string(),
         Error::ExecutableNotFound { .. } => "EXECUTABLE_NOT_FOUND".to_string(),
         Error::SpawnFailed { .. } => "SPAWN_FAILED".to_string(),
         Error::InvalidConfig(_) => "INVALID_CONFIG".to_string(),
         Error::Config(_) => "CONFIG_ERROR".to_string(),
         Error::Admin(_) => "ADMIN_ERROR".to_string(),
         Error::Io(_) => "IO_ERROR".to_string(),
      }
   }

   /// Whether the error must abort the calling sequence.
   ///
   /// Maintenance failures are advisory; everything else is fatal.
   pub fn is_fatal(&self) -> bool {
      !matches!(self, Error::MaintenanceOpFailed { .. })
   }

   pub(crate) fn provisioning(database: &str, source: sqlx_pg_admin::Error) -> Self {
      Error::ProvisioningFailed {
         database: database.to_string(),
         source,
      }
   }

   pub(crate) fn exit_reason(tool: Tool, status: ExitStatus) -> String {
      match status.code() {
         Some(code) => format!("{tool} exited with status {code}"),
         None => format!("{tool} was terminated by a signal"),
      }
   }
}
