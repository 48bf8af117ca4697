//! Administrative connection establishment with bounded retry.

use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use sqlx_pg_admin::{ConnectionLease, Connector, Error as AdminError};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Attempts before the server is declared unreachable.
pub const MAX_ATTEMPTS: usize = 5;

/// Fixed delay between attempts.
pub const BACKOFF: Duration = Duration::from_millis(1500);

/// Opens the admin link, retrying with a constant delay.
///
/// The expected failure is a server that is still initialising, which clears
/// within seconds; the delay therefore stays constant rather than growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionProbe {
   max_attempts: usize,
   backoff: Duration,
}

impl Default for ConnectionProbe {
   fn default() -> Self {
      Self {
         max_attempts: MAX_ATTEMPTS,
         backoff: BACKOFF,
      }
   }
}

impl ConnectionProbe {
   pub fn new(max_attempts: usize, backoff: Duration) -> Self {
      Self {
         max_attempts: max_attempts.max(1),
         backoff,
      }
   }

   pub fn max_attempts(&self) -> usize {
      self.max_attempts
   }

   pub fn backoff(&self) -> Duration {
      self.backoff
   }

   /// Single attempt, used to detect an already running server. This counts
   /// as the first attempt of the budget when followed by
   /// [`ConnectionProbe::retry_after_failure`].
   pub async fn try_connect<K: Connector>(
      &self,
      connector: &K,
   ) -> std::result::Result<ConnectionLease<K::Connection>, AdminError> {
      ConnectionLease::<K::Connection>::acquire(connector, None)
         .await
         .inspect_err(|e| debug!("Server not reachable yet: {}", e))
   }

   /// Connect, sleeping `backoff` between failures, and give up with
   /// [`Error::ServerUnreachable`] after `max_attempts` consecutive failures.
   pub async fn connect_with_retry<K: Connector>(
      &self,
      connector: &K,
   ) -> Result<ConnectionLease<K::Connection>> {
      self.retry(connector, self.max_attempts).await
   }

   /// Spend the rest of the attempt budget after a failed [`try_connect`].
   ///
   /// The caller is responsible for the wait between the failed attempt and
   /// this call.
   ///
   /// [`try_connect`]: ConnectionProbe::try_connect
   pub async fn retry_after_failure<K: Connector>(
      &self,
      connector: &K,
      failure: AdminError,
   ) -> Result<ConnectionLease<K::Connection>> {
      if self.max_attempts == 1 {
         return Err(self.unreachable(failure));
      }
      self.retry(connector, self.max_attempts - 1).await
   }

   async fn retry<K: Connector>(
      &self,
      connector: &K,
      attempts: usize,
   ) -> Result<ConnectionLease<K::Connection>> {
      let policy = ConstantBuilder::default()
         .with_delay(self.backoff)
         .with_max_times(attempts - 1);

      (|| ConnectionLease::<K::Connection>::acquire(connector, None))
         .retry(policy)
         .sleep(tokio::time::sleep)
         .notify(|err, delay| {
            warn!("Admin connection failed ({}); retrying in {:?}", err, delay);
         })
         .await
         .map_err(|source| self.unreachable(source))
   }

   fn unreachable(&self, source: AdminError) -> Error {
      Error::ServerUnreachable {
         attempts: self.max_attempts,
         source,
      }
   }
}
