//! Server process spawning and termination.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::locator::{ExecutableLocator, Tool};
use crate::{Error, Result};

/// Grace period between the stop signal and giving up on the server.
pub const STOP_GRACE: Duration = Duration::from_secs(1);

/// A server process started by this supervisor.
///
/// Only exists when this process launched the server; attaching to an
/// already running server yields no handle, and stopping is then a no-op.
#[derive(Debug)]
pub struct ServerHandle {
   child: Child,
   data_dir: PathBuf,
}

impl ServerHandle {
   /// OS process id, or `None` once the process has been reaped.
   pub fn id(&self) -> Option<u32> {
      self.child.id()
   }

   pub fn data_dir(&self) -> &Path {
      &self.data_dir
   }
}

/// Starts the server binary and stops it again.
#[derive(Debug, Clone, Copy)]
pub struct ProcessSupervisor<'a> {
   locator: &'a ExecutableLocator,
}

impl<'a> ProcessSupervisor<'a> {
   pub fn new(locator: &'a ExecutableLocator) -> Self {
      Self { locator }
   }

   /// Start the server against `data_dir` unless the caller already reached it.
   ///
   /// The server's stdout and stderr are inherited so its own diagnostics
   /// reach the operator.
   pub fn ensure_running(
      &self,
      already_reachable: bool,
      data_dir: &Path,
   ) -> Result<Option<ServerHandle>> {
      if already_reachable {
         debug!("Server already reachable; not spawning");
         return Ok(None);
      }

      let binary = self.locator.locate(Tool::Server)?;
      let child = Command::new(&binary)
         .arg(data_dir)
         .stdin(Stdio::null())
         .stdout(Stdio::inherit())
         .stderr(Stdio::inherit())
         .spawn()
         .map_err(|source| Error::SpawnFailed {
            tool: Tool::Server,
            binary: binary.clone(),
            source,
         })?;

      info!(
         binary = %binary.display(),
         data_dir = %data_dir.display(),
         pid = ?child.id(),
         "Spawned server process"
      );

      Ok(Some(ServerHandle {
         child,
         data_dir: data_dir.to_path_buf(),
      }))
   }

   /// Ask the server to stop and wait at most `grace` for it to exit.
   ///
   /// A server that has not exited by then is left to finish on its own;
   /// shutdown latency stays bounded either way.
   pub async fn terminate(handle: Option<ServerHandle>, grace: Duration) {
      let Some(mut handle) = handle else {
         debug!("No server handle held; nothing to stop");
         return;
      };

      if let Err(e) = signal_stop(&mut handle.child) {
         warn!("Failed to signal server to stop: {}", e);
      }

      match tokio::time::timeout(grace, handle.child.wait()).await {
         Ok(Ok(status)) => info!(%status, "Server process exited"),
         Ok(Err(e)) => warn!("Failed to wait for server process: {}", e),
         Err(_) => warn!(
            "Server did not exit within {:?}; leaving it to finish shutting down",
            grace
         ),
      }
   }
}

/// Send the graceful stop signal (SIGTERM on unix).
fn signal_stop(child: &mut Child) -> io::Result<()> {
   let Some(pid) = child.id() else {
      // Already exited and reaped
      return Ok(());
   };

   #[cfg(unix)]
   {
      // SAFETY: `kill(2)` is memory-safe even for a stale pid; the kernel
      // reports an error which we surface as io::Error.
      let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
      if result == 0 {
         Ok(())
      } else {
         Err(io::Error::last_os_error())
      }
   }

   #[cfg(not(unix))]
   {
      let _ = pid;
      child.start_kill()
   }
}
