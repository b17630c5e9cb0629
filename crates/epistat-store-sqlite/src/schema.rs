//! SQL schema for the epistat SQLite store.
//!
//! Executed once at connection startup, and again (tables only) by
//! [`SqliteStore::reset_all`](crate::SqliteStore).

/// Connection-level settings. Must run outside a transaction.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
";

/// Table DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const TABLES: &str = "
-- One row per country code plus the synthetic 'GBL' aggregate.
-- Rows are replaced in place; only a full reset deletes them.
CREATE TABLE IF NOT EXISTS snapshots (
    code       TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    confirmed  INTEGER NOT NULL,
    deaths     INTEGER NOT NULL,
    recovered  INTEGER NOT NULL,
    active     INTEGER NOT NULL   -- day-over-day delta, not a cumulative count
);

PRAGMA user_version = 1;
";

/// Drops all data; followed by [`TABLES`] inside the same transaction.
pub const DROP_TABLES: &str = "
DROP TABLE IF EXISTS snapshots;
";
