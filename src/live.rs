//! Live query sequences: a query result that is delivered again whenever the
//! rows behind it change.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{
    Error,
    store::{TableChange, run_blocking},
};

type Query<T> = Arc<dyn Fn(&Connection) -> Result<Vec<T>, Error> + Send + Sync>;
type ChangeFilter = Box<dyn Fn(&TableChange) -> bool + Send + Sync>;

/// Anything that produces a sequence of snapshots.
///
/// `Ok(None)` means the sequence has ended and will never produce another
/// snapshot.
#[async_trait]
pub trait SnapshotSource<T>: Send {
    /// Wait for and return the next snapshot.
    async fn next_snapshot(&mut self) -> Result<Option<Vec<T>>, Error>;
}

/// A query that yields its current result first and then a fresh result
/// after every relevant change to the database.
///
/// Results are read from the last committed state at the time of the
/// re-query, so several quick changes may be folded into one snapshot.
/// Dropping the sequence unsubscribes it.
pub struct LiveSequence<T> {
    connection: Arc<Mutex<Connection>>,
    changes: broadcast::Receiver<TableChange>,
    is_relevant: ChangeFilter,
    query: Query<T>,
    emitted_initial: bool,
}

impl<T: Send + 'static> LiveSequence<T> {
    pub(crate) fn new(
        connection: Arc<Mutex<Connection>>,
        changes: broadcast::Receiver<TableChange>,
        is_relevant: ChangeFilter,
        query: Query<T>,
    ) -> Self {
        Self {
            connection,
            changes,
            is_relevant,
            query,
            emitted_initial: false,
        }
    }

    /// Wait for the next snapshot.
    ///
    /// The first call returns immediately with the current result. Returns
    /// `Ok(None)` once every handle to the store has been dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the query failed. The sequence stays usable and the
    /// next call waits for the next change.
    pub async fn next(&mut self) -> Result<Option<Vec<T>>, Error> {
        if !self.emitted_initial {
            self.emitted_initial = true;
            return self.refresh().await.map(Some);
        }

        loop {
            match self.changes.recv().await {
                Ok(change) if (self.is_relevant)(&change) => {
                    return self.refresh().await.map(Some);
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Live sequence missed {skipped} change(s), re-querying");
                    return self.refresh().await.map(Some);
                }
                Err(RecvError::Closed) => return Ok(None),
            }
        }
    }

    async fn refresh(&self) -> Result<Vec<T>, Error> {
        let query = self.query.clone();

        run_blocking(self.connection.clone(), move |connection| query(connection)).await
    }
}

#[async_trait]
impl<T: Send + 'static> SnapshotSource<T> for LiveSequence<T> {
    async fn next_snapshot(&mut self) -> Result<Option<Vec<T>>, Error> {
        self.next().await
    }
}

#[cfg(test)]
mod live_sequence_tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use crate::{
        contribution::NewContribution,
        member::{Member, MemberName, NewMember, PhoneNumber},
        store::RecordStore,
    };

    async fn create_member(store: &RecordStore, name: &str) -> Member {
        store
            .insert_member(NewMember::new(
                MemberName::new_unchecked(name),
                PhoneNumber::new_unchecked("0700"),
            ))
            .await
            .expect("Could not create test member")
    }

    fn names(members: &[Member]) -> Vec<&str> {
        members.iter().map(|member| member.name.as_ref()).collect()
    }

    #[tokio::test]
    async fn first_snapshot_is_current_state() {
        let store = RecordStore::open_in_memory().unwrap();
        create_member(&store, "Akinyi").await;
        let mut members = store.observe_all_members();

        let snapshot = members.next().await.unwrap().unwrap();

        assert_eq!(names(&snapshot), ["Akinyi"]);
    }

    #[tokio::test]
    async fn re_emits_sorted_list_after_each_insert() {
        let store = RecordStore::open_in_memory().unwrap();
        let mut members = store.observe_all_members();
        assert_eq!(members.next().await.unwrap(), Some(vec![]));

        for name in ["C", "A", "B"] {
            create_member(&store, name).await;
            members.next().await.unwrap();
        }
        let member = create_member(&store, "D").await;
        let snapshot = members.next().await.unwrap().unwrap();

        assert_eq!(names(&snapshot), ["A", "B", "C", "D"]);
        assert!(snapshot.contains(&member));
    }

    #[tokio::test]
    async fn ignores_changes_to_other_members() {
        let store = RecordStore::open_in_memory().unwrap();
        let watched = create_member(&store, "Akinyi").await;
        let other = create_member(&store, "Baraka").await;
        let mut contributions = store.observe_contributions_for_member(watched.id);
        assert_eq!(contributions.next().await.unwrap(), Some(vec![]));

        store
            .insert_contribution(NewContribution {
                member_id: other.id,
                amount: 100.0,
                timestamp: 1,
            })
            .await
            .unwrap();

        let result = timeout(Duration::from_millis(100), contributions.next()).await;
        assert!(result.is_err(), "want no snapshot, got {result:?}");
    }

    #[tokio::test]
    async fn newest_contribution_comes_first() {
        let store = RecordStore::open_in_memory().unwrap();
        let member = create_member(&store, "Akinyi").await;
        let mut contributions = store.observe_contributions_for_member(member.id);
        contributions.next().await.unwrap();

        for timestamp in [200, 100] {
            store
                .insert_contribution(NewContribution {
                    member_id: member.id,
                    amount: 50.0,
                    timestamp,
                })
                .await
                .unwrap();
            contributions.next().await.unwrap();
        }
        let newest = store
            .insert_contribution(NewContribution {
                member_id: member.id,
                amount: 75.0,
                timestamp: 300,
            })
            .await
            .unwrap();

        let snapshot = contributions.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0], newest);
    }

    #[tokio::test]
    async fn cascade_delete_re_emits_contributions() {
        let store = RecordStore::open_in_memory().unwrap();
        let member = create_member(&store, "Akinyi").await;
        for timestamp in [1, 2] {
            store
                .insert_contribution(NewContribution {
                    member_id: member.id,
                    amount: 10.0,
                    timestamp,
                })
                .await
                .unwrap();
        }
        let mut all = store.observe_all_contributions();
        assert_eq!(all.next().await.unwrap().map(|list| list.len()), Some(2));

        store.delete_member_by_id(member.id).await.unwrap();

        assert_eq!(all.next().await.unwrap(), Some(vec![]));
    }

    #[tokio::test]
    async fn joined_view_follows_both_tables() {
        let store = RecordStore::open_in_memory().unwrap();
        let mut view = store.observe_members_with_contributions();
        assert_eq!(view.next().await.unwrap(), Some(vec![]));

        let member = create_member(&store, "Akinyi").await;
        let snapshot = view.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].contributions.is_empty());

        let contribution = store
            .insert_contribution(NewContribution {
                member_id: member.id,
                amount: 10.0,
                timestamp: 1,
            })
            .await
            .unwrap();
        let snapshot = view.next().await.unwrap().unwrap();
        assert_eq!(snapshot[0].contributions, vec![contribution]);
    }

    #[tokio::test]
    async fn ends_when_store_is_dropped() {
        let store = RecordStore::open_in_memory().unwrap();
        let mut members = store.observe_all_members();
        members.next().await.unwrap();

        drop(store);

        assert_eq!(members.next().await, Ok(None));
    }
}
