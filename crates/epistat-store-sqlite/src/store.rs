//! [`SqliteStore`] — the SQLite implementation of [`SnapshotStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use epistat_core::{snapshot::CountrySnapshot, store::SnapshotStore};

use crate::{
  Error, Result,
  schema::{DROP_TABLES, PRAGMAS, TABLES},
};

const SELECT_COLUMNS: &str =
  "SELECT code, name, confirmed, deaths, recovered, active FROM snapshots";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A snapshot store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        conn.execute_batch(TABLES)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CountrySnapshot> {
  Ok(CountrySnapshot {
    code:            row.get(0)?,
    name:            row.get(1)?,
    confirmed_total: row.get(2)?,
    deaths_total:    row.get(3)?,
    recovered_total: row.get(4)?,
    active_delta:    row.get(5)?,
  })
}

// ─── SnapshotStore impl ──────────────────────────────────────────────────────

impl SnapshotStore for SqliteStore {
  type Error = Error;

  async fn upsert(&self, snapshot: CountrySnapshot) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        // A single statement, so readers never observe a half-written row.
        conn.execute(
          "INSERT INTO snapshots (code, name, confirmed, deaths, recovered, active)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT(code) DO UPDATE SET
             name      = excluded.name,
             confirmed = excluded.confirmed,
             deaths    = excluded.deaths,
             recovered = excluded.recovered,
             active    = excluded.active",
          rusqlite::params![
            snapshot.code,
            snapshot.name,
            snapshot.confirmed_total,
            snapshot.deaths_total,
            snapshot.recovered_total,
            snapshot.active_delta,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get(&self, code: &str) -> Result<Option<CountrySnapshot>> {
    let code = code.to_owned();

    let row = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("{SELECT_COLUMNS} WHERE code = ?1"),
            rusqlite::params![code],
            read_row,
          )
          .optional()?)
      })
      .await?;

    Ok(row)
  }

  async fn list(&self) -> Result<Vec<CountrySnapshot>> {
    let rows = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY code"))?;
        let rows = stmt
          .query_map([], read_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(rows)
  }

  async fn reset_all(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        tx.execute_batch(DROP_TABLES)?;
        tx.execute_batch(TABLES)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::warn!("snapshot store reset; all rows deleted");
    Ok(())
  }
}
