//! Chama is a tracker for the members of a small savings group and the money
//! they contribute.
//!
//! This library provides the persistence core: a SQLite-backed [RecordStore]
//! with live query sequences, and the [MemberManager] and
//! [ContributionManager] facades that a presentation layer talks to.

mod config;
mod contribution;
mod contribution_manager;
mod database_id;
mod db;
mod live;
mod logging;
mod member;
mod member_manager;
mod outcome;
mod shared_state;
mod store;

pub use config::ManagerConfig;
pub use contribution::{
    Contribution, ContributionId, MemberWithContributions, NewContribution, Timestamp,
    timestamp_now,
};
pub use contribution_manager::ContributionManager;
pub use live::{LiveSequence, SnapshotSource};
pub use logging::setup_logging;
pub use member::{Member, MemberId, MemberName, NewMember, PhoneNumber};
pub use member_manager::MemberManager;
pub use outcome::{Outcome, SkipReason};
pub use shared_state::SharedState;
pub use store::{RecordStore, TableChange};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A write broke a schema constraint, e.g. a contribution referred to a
    /// member that does not exist, or a blank name got past validation.
    ///
    /// Holds SQLite's description of the failed constraint.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// An empty or whitespace-only string was used as a member name.
    #[error("member name cannot be empty")]
    EmptyMemberName,

    /// An empty or whitespace-only string was used as a phone number.
    #[error("phone number cannot be empty")]
    EmptyPhoneNumber,

    /// The database was created by a newer version of the schema.
    #[error("unsupported database schema version {0}")]
    UnsupportedSchemaVersion(i64),

    /// Could not acquire the database lock because another thread panicked
    /// while holding it.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// A database task on the blocking thread pool panicked or was cancelled.
    #[error("background database task failed: {0}")]
    BackgroundTaskFailed(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Covers FOREIGN KEY (787), CHECK (275), NOT NULL (1299) and UNIQUE (2067).
            rusqlite::Error::SqliteFailure(sql_error, description)
                if sql_error.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::ConstraintViolation(description.unwrap_or_else(|| sql_error.to_string()))
            }
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
