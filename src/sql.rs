//! Statement text for provisioning and maintenance.

/// Quote an identifier, doubling embedded double quotes.
pub fn quote_ident(name: &str) -> String {
   format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
   format!("'{}'", value.replace('\'', "''"))
}

/// `CREATE USER`, with a password clause only when a password is given.
pub fn create_user(user: &str, password: Option<&str>) -> String {
   match password {
      Some(password) => format!(
         "CREATE USER {} WITH PASSWORD {};",
         quote_ident(user),
         quote_literal(password)
      ),
      None => format!("CREATE USER {};", quote_ident(user)),
   }
}

pub fn create_database(database: &str) -> String {
   format!("CREATE DATABASE {} ENCODING 'UTF8';", quote_ident(database))
}

pub fn drop_database(database: &str) -> String {
   format!("DROP DATABASE IF EXISTS {};", quote_ident(database))
}

pub fn rename_database(from: &str, to: &str) -> String {
   format!(
      "ALTER DATABASE {} RENAME TO {};",
      quote_ident(from),
      quote_ident(to)
   )
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_create_user_without_password() {
      assert_eq!(create_user("app", None), r#"CREATE USER "app";"#);
   }

   #[test]
   fn test_create_user_with_password() {
      assert_eq!(
         create_user("app", Some("s3cret")),
         r#"CREATE USER "app" WITH PASSWORD 's3cret';"#
      );
   }

   #[test]
   fn test_quoting_escapes_delimiters() {
      assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
      assert_eq!(quote_literal("it's"), "'it''s'");
   }

   #[test]
   fn test_database_statements() {
      assert_eq!(
         create_database("appdb"),
         r#"CREATE DATABASE "appdb" ENCODING 'UTF8';"#
      );
      assert_eq!(drop_database("old"), r#"DROP DATABASE IF EXISTS "old";"#);
      assert_eq!(
         rename_database("appdb", "appdb_archive"),
         r#"ALTER DATABASE "appdb" RENAME TO "appdb_archive";"#
      );
   }
}
