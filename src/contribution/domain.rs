//! Core contribution domain types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    database_id::DatabaseId,
    member::{Member, MemberId},
};

/// A newtype wrapper for integer contribution IDs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct ContributionId(DatabaseId);

impl ContributionId {
    /// Create a new contribution ID.
    pub fn new(id: DatabaseId) -> Self {
        Self(id)
    }

    /// Cast the contribution ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for ContributionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Milliseconds since the Unix epoch.
///
/// Only used to order contributions, never broken down into calendar fields.
pub type Timestamp = i64;

/// The current time as a [Timestamp].
pub fn timestamp_now() -> Timestamp {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();

    (nanos / 1_000_000) as Timestamp
}

/// A single deposit recorded against one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    /// The ID of the contribution.
    pub id: ContributionId,
    /// The member who made the contribution.
    pub member_id: MemberId,
    /// How much money was deposited.
    pub amount: f64,
    /// When the contribution was made, in milliseconds since the Unix epoch.
    pub timestamp: Timestamp,
}

/// The data needed to insert a contribution.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContribution {
    pub member_id: MemberId,
    pub amount: f64,
    pub timestamp: Timestamp,
}

/// A member together with all of their contributions, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberWithContributions {
    pub member: Member,
    pub contributions: Vec<Contribution>,
}
