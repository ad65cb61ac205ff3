//! Contribution management: recording contributions and following the
//! contributions of the member the operator has selected.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::{
    Error,
    config::ManagerConfig,
    contribution::{
        Contribution, ContributionId, MemberWithContributions, NewContribution, Timestamp,
    },
    live::{LiveSequence, SnapshotSource},
    member::{Member, MemberId},
    outcome::{Outcome, SkipReason},
    shared_state::SharedState,
    store::RecordStore,
};

/// Validates contribution commands before they reach the [RecordStore] and
/// republishes the contribution views.
///
/// The only state kept here is which member is selected, and that is never
/// saved.
#[derive(Clone)]
pub struct ContributionManager {
    store: RecordStore,
    selected_member: Arc<watch::Sender<Option<MemberId>>>,
    all_members: SharedState<Member>,
    all_contributions: SharedState<Contribution>,
    contributions_for_selected_member: SharedState<Contribution>,
    members_with_contributions: SharedState<MemberWithContributions>,
}

impl ContributionManager {
    /// Create a manager over `store` with no member selected.
    pub fn new(store: RecordStore, config: ManagerConfig) -> Self {
        let grace = config.idle_grace_period;
        let (selected_member, selection) = watch::channel(None);

        let all_members = {
            let store = store.clone();
            SharedState::new(grace, move || store.observe_all_members())
        };
        let all_contributions = {
            let store = store.clone();
            SharedState::new(grace, move || store.observe_all_contributions())
        };
        let contributions_for_selected_member = {
            let store = store.clone();
            SharedState::new(grace, move || {
                SelectedContributions::new(store.clone(), selection.clone())
            })
        };
        let members_with_contributions = {
            let store = store.clone();
            SharedState::new(grace, move || store.observe_members_with_contributions())
        };

        Self {
            store,
            selected_member: Arc::new(selected_member),
            all_members,
            all_contributions,
            contributions_for_selected_member,
            members_with_contributions,
        }
    }

    /// Record a contribution.
    ///
    /// An amount that is not greater than zero is skipped without touching
    /// the store.
    ///
    /// # Errors
    ///
    /// Returns [Error::ConstraintViolation] if `member_id` does not refer to
    /// a member.
    pub async fn add_contribution(
        &self,
        member_id: MemberId,
        amount: f64,
        timestamp: Timestamp,
    ) -> Result<Outcome<Contribution>, Error> {
        if amount.is_nan() || amount <= 0.0 {
            tracing::debug!("Skipped contribution of {amount} for member {member_id}");
            return Ok(Outcome::Skipped(SkipReason::NonPositiveAmount));
        }

        let contribution = self
            .store
            .insert_contribution(NewContribution {
                member_id,
                amount,
                timestamp,
            })
            .await?;

        Ok(Outcome::Applied(contribution))
    }

    /// Remove a contribution. Returns `false` if it had already been removed.
    pub async fn remove_contribution(&self, contribution_id: ContributionId) -> Result<bool, Error> {
        self.store.delete_contribution_by_id(contribution_id).await
    }

    /// Select the member whose contributions
    /// [contributions_for_selected_member](Self::contributions_for_selected_member)
    /// follows, or clear the selection with `None`.
    pub fn select_member(&self, member_id: Option<MemberId>) {
        self.selected_member.send_replace(member_id);
    }

    /// The currently selected member.
    pub fn selected_member(&self) -> Option<MemberId> {
        *self.selected_member.borrow()
    }

    /// The contributions of one member, straight from the store.
    pub fn observe_contributions_for_member(
        &self,
        member_id: MemberId,
    ) -> LiveSequence<Contribution> {
        self.store.observe_contributions_for_member(member_id)
    }

    /// Every contribution, straight from the store.
    pub fn observe_all_contributions(&self) -> LiveSequence<Contribution> {
        self.store.observe_all_contributions()
    }

    /// Every member with their contributions, straight from the store.
    pub fn observe_members_with_contributions(&self) -> LiveSequence<MemberWithContributions> {
        self.store.observe_members_with_contributions()
    }

    /// All members ordered by name, e.g. for picking the selected member.
    pub fn all_members(&self) -> &SharedState<Member> {
        &self.all_members
    }

    /// Every contribution, newest first.
    pub fn all_contributions(&self) -> &SharedState<Contribution> {
        &self.all_contributions
    }

    /// The contributions of the selected member, newest first, or an empty
    /// list when no member is selected.
    pub fn contributions_for_selected_member(&self) -> &SharedState<Contribution> {
        &self.contributions_for_selected_member
    }

    /// Every member with their contributions.
    pub fn members_with_contributions(&self) -> &SharedState<MemberWithContributions> {
        &self.members_with_contributions
    }
}

/// Follows the contributions of whichever member is selected.
///
/// A new selection drops the sequence for the old member, including any query
/// still in flight, so a stale result never replaces a newer one.
struct SelectedContributions {
    store: RecordStore,
    selection: watch::Receiver<Option<MemberId>>,
    current: Option<LiveSequence<Contribution>>,
    selection_changed: bool,
}

impl SelectedContributions {
    fn new(store: RecordStore, selection: watch::Receiver<Option<MemberId>>) -> Self {
        Self {
            store,
            selection,
            current: None,
            selection_changed: true,
        }
    }
}

#[async_trait]
impl SnapshotSource<Contribution> for SelectedContributions {
    async fn next_snapshot(&mut self) -> Result<Option<Vec<Contribution>>, Error> {
        loop {
            if self.selection_changed {
                self.selection_changed = false;

                let selected = *self.selection.borrow_and_update();
                self.current =
                    selected.map(|member_id| self.store.observe_contributions_for_member(member_id));

                if self.current.is_none() {
                    return Ok(Some(Vec::new()));
                }
            }

            match self.current.as_mut() {
                Some(sequence) => {
                    tokio::select! {
                        changed = self.selection.changed() => {
                            if changed.is_err() {
                                return Ok(None);
                            }
                            self.selection_changed = true;
                        }
                        snapshot = sequence.next() => return snapshot,
                    }
                }
                None => {
                    if self.selection.changed().await.is_err() {
                        return Ok(None);
                    }
                    self.selection_changed = true;
                }
            }
        }
    }
}
