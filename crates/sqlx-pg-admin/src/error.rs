//! Error types for sqlx-pg-admin

use thiserror::Error;

/// Errors that may occur when talking to the server over an administrative link
#[derive(Error, Debug)]
pub enum Error {
   /// IO error on the underlying link. Standard library IO errors
   /// are converted to this variant.
   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   /// Error from the sqlx library. Standard sqlx errors are converted to this variant
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// The lease has already handed its connection back
   #[error("Connection lease has been released")]
   LeaseReleased,
}

impl Error {
   /// Whether the error describes the link itself failing (as opposed to a
   /// statement being rejected by the server).
   pub fn is_link_failure(&self) -> bool {
      match self {
         Error::Io(_) => true,
         Error::Sqlx(e) => matches!(
            e,
            sqlx::Error::Io(_)
               | sqlx::Error::Tls(_)
               | sqlx::Error::Protocol(_)
               | sqlx::Error::PoolClosed
               | sqlx::Error::PoolTimedOut
               | sqlx::Error::WorkerCrashed
         ),
         Error::LeaseReleased => false,
      }
   }
}
