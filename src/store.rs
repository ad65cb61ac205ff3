//! The record store: the single source of truth for members and
//! contributions.
//!
//! Mutations run on Tokio's blocking thread pool against one shared SQLite
//! connection, then publish a [TableChange] that wakes the live sequences.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tokio::sync::broadcast;

use crate::{
    Error,
    contribution::{
        Contribution, ContributionId, MemberWithContributions, NewContribution,
        count_contributions_for_member, delete_contribution_by_id, get_all_contributions,
        get_contributions_for_member, get_members_with_contributions, insert_contribution,
    },
    db::initialize,
    live::LiveSequence,
    member::{
        Member, MemberId, NewMember, delete_member_by_id, get_all_members, get_member_by_id,
        insert_member,
    },
};

/// How many unread changes a live sequence may fall behind before it skips
/// ahead and re-queries.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Which rows a committed mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableChange {
    /// A member was inserted, replaced or deleted.
    Members,
    /// A contribution of `member_id` was inserted or deleted, either directly
    /// or by deleting the member.
    Contributions { member_id: MemberId },
}

/// A handle to the application database.
///
/// Cloning the handle is cheap and every clone shares the same connection and
/// change notifications.
#[derive(Debug, Clone)]
pub struct RecordStore {
    connection: Arc<Mutex<Connection>>,
    changes: broadcast::Sender<TableChange>,
}

impl RecordStore {
    /// Create a store from an open connection.
    ///
    /// This function will modify the database by adding the tables for the
    /// domain models if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new(connection: Connection) -> Result<Self, Error> {
        initialize(&connection)?;

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            changes,
        })
    }

    /// Open or create the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::new(Connection::open(path)?)
    }

    /// Create a store backed by a fresh in-memory database.
    pub fn open_in_memory() -> Result<Self, Error> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Insert a member, or replace the member with the same ID.
    ///
    /// # Errors
    ///
    /// Returns [Error::ConstraintViolation] if the row breaks a schema
    /// constraint.
    pub async fn insert_member(&self, new_member: NewMember) -> Result<Member, Error> {
        self.mutate(move |connection, changes| {
            let member = insert_member(new_member, connection)?;

            tracing::debug!("Saved member {}", member.id);
            publish(changes, TableChange::Members);

            Ok(member)
        })
        .await
    }

    /// Get the member with `member_id`, or `None` if there is no such member.
    pub async fn get_member_by_id(&self, member_id: MemberId) -> Result<Option<Member>, Error> {
        self.with_connection(move |connection| get_member_by_id(member_id, connection))
            .await
    }

    /// Delete a member together with all of their contributions.
    ///
    /// Returns `false`, and notifies nobody, if there was no such member.
    pub async fn delete_member_by_id(&self, member_id: MemberId) -> Result<bool, Error> {
        self.mutate(move |connection, changes| {
            let transaction =
                Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

            let cascaded = count_contributions_for_member(member_id, &transaction)?;
            let deleted = delete_member_by_id(member_id, &transaction)?;

            transaction.commit()?;

            if !deleted {
                tracing::debug!("Member {member_id} was already deleted");
                return Ok(false);
            }

            tracing::debug!("Deleted member {member_id} and {cascaded} contribution(s)");
            publish(changes, TableChange::Members);
            if cascaded > 0 {
                publish(changes, TableChange::Contributions { member_id });
            }

            Ok(true)
        })
        .await
    }

    /// Record a contribution.
    ///
    /// # Errors
    ///
    /// Returns [Error::ConstraintViolation] if the member does not exist.
    pub async fn insert_contribution(
        &self,
        new_contribution: NewContribution,
    ) -> Result<Contribution, Error> {
        self.mutate(move |connection, changes| {
            let contribution = insert_contribution(new_contribution, connection)?;

            tracing::debug!(
                "Saved contribution {} for member {}",
                contribution.id,
                contribution.member_id
            );
            publish(
                changes,
                TableChange::Contributions {
                    member_id: contribution.member_id,
                },
            );

            Ok(contribution)
        })
        .await
    }

    /// Delete a contribution. Returns `false` if there was no such
    /// contribution.
    pub async fn delete_contribution_by_id(
        &self,
        contribution_id: ContributionId,
    ) -> Result<bool, Error> {
        self.mutate(move |connection, changes| {
            match delete_contribution_by_id(contribution_id, connection)? {
                Some(member_id) => {
                    tracing::debug!("Deleted contribution {contribution_id}");
                    publish(changes, TableChange::Contributions { member_id });
                    Ok(true)
                }
                None => Ok(false),
            }
        })
        .await
    }

    /// All members ordered by name, re-emitted whenever a member changes.
    pub fn observe_all_members(&self) -> LiveSequence<Member> {
        self.live_sequence(
            |change| matches!(change, TableChange::Members),
            get_all_members,
        )
    }

    /// The contributions of one member, newest first, re-emitted whenever one
    /// of them is added or removed.
    pub fn observe_contributions_for_member(
        &self,
        member_id: MemberId,
    ) -> LiveSequence<Contribution> {
        self.live_sequence(
            move |change| {
                matches!(change, TableChange::Contributions { member_id: changed } if *changed == member_id)
            },
            move |connection: &Connection| get_contributions_for_member(member_id, connection),
        )
    }

    /// Every contribution, newest first.
    pub fn observe_all_contributions(&self) -> LiveSequence<Contribution> {
        self.live_sequence(
            |change| matches!(change, TableChange::Contributions { .. }),
            get_all_contributions,
        )
    }

    /// Every member with their contributions, re-emitted on any change to
    /// either table.
    pub fn observe_members_with_contributions(&self) -> LiveSequence<MemberWithContributions> {
        self.live_sequence(|_| true, get_members_with_contributions)
    }

    /// Receive every [TableChange] published after this call.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<TableChange> {
        self.changes.subscribe()
    }

    fn live_sequence<T, R, Q>(&self, is_relevant: R, query: Q) -> LiveSequence<T>
    where
        T: Send + 'static,
        R: Fn(&TableChange) -> bool + Send + Sync + 'static,
        Q: Fn(&Connection) -> Result<Vec<T>, Error> + Send + Sync + 'static,
    {
        LiveSequence::new(
            self.connection.clone(),
            self.changes.subscribe(),
            Box::new(is_relevant),
            Arc::new(query),
        )
    }

    /// Run a mutation on the blocking thread pool.
    ///
    /// Changes are published from the blocking task right after the commit,
    /// so they still go out if the caller stops waiting for the result.
    async fn mutate<T, F>(&self, operation: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &broadcast::Sender<TableChange>) -> Result<T, Error>
            + Send
            + 'static,
    {
        let changes = self.changes.clone();

        self.with_connection(move |connection| operation(connection, &changes))
            .await
    }

    async fn with_connection<T, F>(&self, operation: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, Error> + Send + 'static,
    {
        run_blocking(self.connection.clone(), operation).await
    }
}

fn publish(changes: &broadcast::Sender<TableChange>, change: TableChange) {
    // Sending only fails when nobody is observing.
    let _ = changes.send(change);
}

/// Run `operation` against the shared connection on the blocking thread pool.
pub(crate) async fn run_blocking<T, F>(
    connection: Arc<Mutex<Connection>>,
    operation: F,
) -> Result<T, Error>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, Error> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let connection = connection.lock().map_err(|_| Error::DatabaseLockError)?;

        operation(&connection)
    })
    .await
    .map_err(|error| Error::BackgroundTaskFailed(error.to_string()))?
}
