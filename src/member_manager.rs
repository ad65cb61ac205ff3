//! Member management: the entry point for adding and removing members.

use crate::{
    Error,
    config::ManagerConfig,
    live::LiveSequence,
    member::{Member, MemberName, NewMember, PhoneNumber},
    outcome::{Outcome, SkipReason},
    shared_state::SharedState,
    store::RecordStore,
};

/// Validates member commands before they reach the [RecordStore] and
/// republishes the member list.
#[derive(Clone)]
pub struct MemberManager {
    store: RecordStore,
    all_members: SharedState<Member>,
}

impl MemberManager {
    /// Create a manager over `store`.
    pub fn new(store: RecordStore, config: ManagerConfig) -> Self {
        let all_members = {
            let store = store.clone();
            SharedState::new(config.idle_grace_period, move || store.observe_all_members())
        };

        Self { store, all_members }
    }

    /// Add a member.
    ///
    /// A blank name or phone number is skipped without touching the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejected the member.
    pub async fn add_member(&self, name: &str, phone: &str) -> Result<Outcome<Member>, Error> {
        let Ok(name) = MemberName::new(name) else {
            return Ok(skip(SkipReason::BlankName));
        };
        let Ok(phone) = PhoneNumber::new(phone) else {
            return Ok(skip(SkipReason::BlankPhone));
        };

        let member = self.store.insert_member(NewMember::new(name, phone)).await?;

        Ok(Outcome::Applied(member))
    }

    /// Remove a member and all of their contributions.
    ///
    /// Returns `false` if the member had already been removed.
    pub async fn remove_member(&self, member: &Member) -> Result<bool, Error> {
        self.store.delete_member_by_id(member.id).await
    }

    /// All members ordered by name, straight from the store.
    pub fn observe_all_members(&self) -> LiveSequence<Member> {
        self.store.observe_all_members()
    }

    /// All members ordered by name, as a shared state.
    pub fn all_members(&self) -> &SharedState<Member> {
        &self.all_members
    }
}

fn skip<T>(reason: SkipReason) -> Outcome<T> {
    tracing::debug!("Skipped command: {reason}");
    Outcome::Skipped(reason)
}
