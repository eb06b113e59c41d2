//! # rev-db
//!
//! Revision capture for entities stored in libSQL.
//!
//! Whenever a tracked entity is updated or destroyed, a revision recording
//! the prior values of the changed attributes, the acting author, and a UTC
//! timestamp is written to a derived history table inside the same
//! transaction as the mutation.
//!
//! - [`host`] defines what a persistence host must provide: entity
//!   registration, pre-mutation hooks, and transaction-aware row access.
//! - [`service::LibsqlHost`] is a host backed by a libSQL connection.
//! - [`tracking`] holds the recorders, the read-only guard for history
//!   rows, and the [`tracking::RevisionTracker`] that wires them together.

pub mod ddl;
pub mod error;
pub mod helpers;
pub mod host;
pub mod repos;
pub mod service;
pub mod tracking;
pub mod updates;

#[cfg(test)]
mod test_support;

use error::TrackingError;
use libsql::Builder;

/// Database handle: a libSQL database and its single connection.
pub struct RevDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl RevDb {
    /// Open a local database at the given path, or `":memory:"`.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError` if the database cannot be opened.
    pub async fn open_local(path: &str) -> Result<Self, TrackingError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| TrackingError::Persistence(format!("PRAGMA foreign_keys: {e}")))?;

        Ok(Self { db, conn })
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Begin a transaction on the connection.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError` if `BEGIN` fails (e.g. a transaction is
    /// already open on this connection).
    pub async fn transaction(&self) -> Result<libsql::Transaction, TrackingError> {
        Ok(self.conn.transaction().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> RevDb {
        RevDb::open_local(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn open_local_enables_foreign_keys() {
        let db = test_db().await;
        let mut rows = db.conn().query("PRAGMA foreign_keys", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 1);
    }

    #[tokio::test]
    async fn rolled_back_transaction_discards_writes() {
        let db = test_db().await;
        db.conn()
            .execute("CREATE TABLE counters (name TEXT PRIMARY KEY, val INTEGER)", ())
            .await
            .unwrap();

        let tx = db.transaction().await.unwrap();
        tx.execute(
            "INSERT INTO counters (name, val) VALUES (?1, ?2)",
            libsql::params!["rolled_back", 99],
        )
        .await
        .unwrap();
        tx.rollback().await.unwrap();

        let mut rows = db.conn().query("SELECT COUNT(*) FROM counters", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 0);
    }
}
