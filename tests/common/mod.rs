#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use pg_lifecycle::{AdminConfig, AdminConnection, Config, Connector, QueryMode, SchemaSpec};
use sqlx_pg_admin::{Error, Result};

/// In-memory stand-in for a server: users, databases with the statements
/// applied to each, active sessions, and an ordered event log.
#[derive(Debug, Default)]
pub struct ClusterState {
   pub users: Vec<String>,
   pub databases: BTreeMap<String, Vec<String>>,
   pub sessions: BTreeMap<String, u64>,
   pub log: Vec<String>,
   pub connect_attempts: usize,
   pub open_leases: usize,
   pub refuse_first: usize,
   pub fail_pattern: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeCluster {
   state: Arc<Mutex<ClusterState>>,
}

impl FakeCluster {
   pub fn new() -> Self {
      let cluster = Self::default();
      cluster.state().users.push("root".into());
      cluster.state().databases.insert("postgres".into(), Vec::new());
      cluster
   }

   pub fn state(&self) -> MutexGuard<'_, ClusterState> {
      self.state.lock().unwrap()
   }

   /// Refuse the first `attempts` connections.
   pub fn refuse_first(self, attempts: usize) -> Self {
      self.state().refuse_first = attempts;
      self
   }

   pub fn never_reachable(self) -> Self {
      self.refuse_first(usize::MAX)
   }

   /// Reject any statement containing `pattern`.
   pub fn fail_statements_containing(&self, pattern: &str) {
      self.state().fail_pattern = Some(pattern.to_string());
   }

   pub fn clear_failures(&self) {
      self.state().fail_pattern = None;
   }

   pub fn add_user(&self, user: &str) {
      self.state().users.push(user.to_string());
   }

   pub fn add_database(&self, database: &str, contents: &[&str]) {
      self
         .state()
         .databases
         .insert(database.to_string(), contents.iter().map(|s| s.to_string()).collect());
   }

   pub fn open_session(&self, database: &str) {
      *self.state().sessions.entry(database.to_string()).or_default() += 1;
   }

   pub fn log(&self) -> Vec<String> {
      self.state().log.clone()
   }

   pub fn statements_starting_with(&self, prefix: &str) -> Vec<String> {
      self
         .log()
         .into_iter()
         .filter(|entry| entry.starts_with(prefix))
         .collect()
   }

   pub fn contents(&self, database: &str) -> Option<Vec<String>> {
      self.state().databases.get(database).cloned()
   }

   pub fn has_user(&self, user: &str) -> bool {
      self.state().users.iter().any(|u| u == user)
   }

   pub fn connect_attempts(&self) -> usize {
      self.state().connect_attempts
   }

   pub fn open_leases(&self) -> usize {
      self.state().open_leases
   }

   /// Position of the first log entry starting with `prefix`.
   pub fn position(&self, prefix: &str) -> Option<usize> {
      self.log().iter().position(|entry| entry.starts_with(prefix))
   }
}

fn rejected(message: &str) -> Error {
   Error::Sqlx(sqlx::Error::Configuration(message.to_string().into()))
}

fn quoted_names(sql: &str) -> Vec<String> {
   sql.split('"')
      .enumerate()
      .filter(|(i, _)| i % 2 == 1)
      .map(|(_, name)| name.to_string())
      .collect()
}

impl Connector for FakeCluster {
   type Connection = FakeConnection;

   async fn connect(&self, database: Option<&str>) -> Result<FakeConnection> {
      let mut state = self.state();
      state.connect_attempts += 1;
      if state.connect_attempts <= state.refuse_first {
         return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
         )));
      }

      if let Some(database) = database
         && !state.databases.contains_key(database)
      {
         return Err(rejected(&format!("database \"{database}\" does not exist")));
      }

      state.open_leases += 1;
      Ok(FakeConnection {
         state: Arc::clone(&self.state),
         database: database.map(str::to_string),
      })
   }
}

#[derive(Debug)]
pub struct FakeConnection {
   state: Arc<Mutex<ClusterState>>,
   database: Option<String>,
}

impl FakeConnection {
   fn state(&self) -> MutexGuard<'_, ClusterState> {
      self.state.lock().unwrap()
   }

   fn run(&self, sql: &str) -> Result<()> {
      let mut state = self.state();
      state.log.push(sql.to_string());

      if let Some(pattern) = &state.fail_pattern
         && sql.contains(pattern.as_str())
      {
         return Err(rejected(&format!("syntax error near \"{pattern}\"")));
      }

      let names = quoted_names(sql);
      if sql.starts_with("CREATE USER") {
         if state.users.contains(&names[0]) {
            return Err(rejected("role already exists"));
         }
         state.users.push(names[0].clone());
      } else if sql.starts_with("CREATE DATABASE") {
         if state.databases.contains_key(&names[0]) {
            return Err(rejected("database already exists"));
         }
         state.databases.insert(names[0].clone(), Vec::new());
      } else if sql.starts_with("DROP DATABASE IF EXISTS") {
         if state.sessions.get(&names[0]).copied().unwrap_or(0) > 0 {
            return Err(rejected("database is being accessed by other users"));
         }
         state.databases.remove(&names[0]);
      } else if sql.starts_with("ALTER DATABASE") {
         let (from, to) = (&names[0], &names[1]);
         if state.sessions.get(from).copied().unwrap_or(0) > 0 {
            return Err(rejected("database is being accessed by other users"));
         }
         if state.databases.contains_key(to) {
            return Err(rejected("database already exists"));
         }
         let contents = state
            .databases
            .remove(from)
            .ok_or_else(|| rejected("database does not exist"))?;
         state.databases.insert(to.clone(), contents);
      } else if let Some(database) = &self.database {
         state
            .databases
            .entry(database.clone())
            .or_default()
            .push(sql.to_string());
      }

      Ok(())
   }
}

impl AdminConnection for FakeConnection {
   async fn list_users(&mut self) -> Result<Vec<String>> {
      let mut state = self.state();
      state.log.push("LIST USERS".into());
      Ok(state.users.clone())
   }

   async fn list_databases(&mut self) -> Result<Vec<String>> {
      let mut state = self.state();
      state.log.push("LIST DATABASES".into());
      Ok(state.databases.keys().cloned().collect())
   }

   async fn execute(&mut self, sql: &str) -> Result<()> {
      self.run(sql)
   }

   async fn terminate_backends(&mut self, database: &str) -> Result<u64> {
      let mut state = self.state();
      state.log.push(format!("TERMINATE {database}"));
      Ok(state.sessions.remove(database).unwrap_or(0))
   }

   async fn close(self) -> Result<()> {
      self.state().open_leases -= 1;
      Ok(())
   }
}

pub fn admin() -> AdminConfig {
   AdminConfig::new("localhost", "root")
}

/// `{admin: {host: localhost, user: root}, user: app, database: appdb}`
pub fn base_config() -> Config {
   Config {
      admin: admin(),
      user: Some("app".into()),
      password: None,
      database: Some("appdb".into()),
      schema: None,
      query_mode: QueryMode::Shell,
      binaries: Default::default(),
      verbose: false,
   }
}

pub fn client_rawsql_config(path: impl Into<std::path::PathBuf>) -> Config {
   Config {
      schema: Some(SchemaSpec::RawSql { path: path.into() }),
      query_mode: QueryMode::Client,
      ..base_config()
   }
}
