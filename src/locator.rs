//! Resolution of the external binaries the lifecycle wraps.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::BinaryOverrides;
use crate::{Error, Result};

/// External tools driven by the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
   /// Database server binary, started against a data directory.
   Server,
   /// Logical dump tool.
   Dump,
   /// Interactive SQL shell, used to run scripts in shell mode.
   Shell,
   /// External schema-management tool.
   SchemaTool,
}

impl Tool {
   /// Program name looked up on `PATH` when no override is configured.
   pub fn default_program(self) -> &'static str {
      match self {
         Self::Server => "postgres",
         Self::Dump => "pg_dump",
         Self::Shell => "psql",
         Self::SchemaTool => "clyks",
      }
   }
}

impl fmt::Display for Tool {
   fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         Self::Server => formatter.write_str("server"),
         Self::Dump => formatter.write_str("dump tool"),
         Self::Shell => formatter.write_str("SQL shell"),
         Self::SchemaTool => formatter.write_str("schema tool"),
      }
   }
}

/// Resolves tool paths from overrides or `PATH`. Holds no other state.
#[derive(Debug, Clone, Default)]
pub struct ExecutableLocator {
   overrides: BinaryOverrides,
}

impl ExecutableLocator {
   pub fn new(overrides: BinaryOverrides) -> Self {
      Self { overrides }
   }

   /// Resolve `tool` to an executable path.
   ///
   /// An override containing a path separator is used as-is; any other
   /// override, like the default program name, is looked up on `PATH`.
   pub fn locate(&self, tool: Tool) -> Result<PathBuf> {
      let program = self.program(tool);
      let candidate = Path::new(program);
      if candidate.components().count() > 1 {
         return Ok(candidate.to_path_buf());
      }

      which::which(program).map_err(|source| Error::ExecutableNotFound {
         tool,
         program: program.to_string(),
         source,
      })
   }

   fn program(&self, tool: Tool) -> &str {
      let configured = match tool {
         Tool::Server => self.overrides.server.as_deref(),
         Tool::Dump => self.overrides.dump.as_deref(),
         Tool::Shell => self.overrides.shell.as_deref(),
         Tool::SchemaTool => self.overrides.schema_tool.as_deref(),
      };
      configured.unwrap_or_else(|| tool.default_program())
   }
}
