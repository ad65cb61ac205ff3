//! Schema setup for the application database.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{Error, contribution::create_contribution_table, member::create_member_table};

/// The schema version this build reads and writes.
pub const SCHEMA_VERSION: i64 = 1;

/// Create the tables for the domain models and switch on foreign key
/// enforcement for `connection`.
///
/// Safe to call on an already initialized database.
///
/// # Errors
///
/// Returns [Error::UnsupportedSchemaVersion] if the database was written by a
/// newer schema, or [Error::SqlError] if an SQL query failed.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Must be set outside of a transaction, otherwise SQLite ignores it.
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    let version = schema_version(connection)?;
    if version > SCHEMA_VERSION {
        return Err(Error::UnsupportedSchemaVersion(version));
    }

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_member_table(&transaction)?;
    create_contribution_table(&transaction)?;
    transaction.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;

    transaction.commit()?;

    if version < SCHEMA_VERSION {
        tracing::info!("Initialized database schema version {SCHEMA_VERSION}");
    }

    Ok(())
}

/// The schema version stored in the database, zero for a fresh database.
pub fn schema_version(connection: &Connection) -> Result<i64, Error> {
    connection
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|error| error.into())
}
