mod db;
mod domain;

pub use db::{
    count_contributions_for_member, create_contribution_table, delete_contribution_by_id,
    get_all_contributions, get_contributions_for_member, get_members_with_contributions,
    insert_contribution,
};
pub use domain::{
    Contribution, ContributionId, MemberWithContributions, NewContribution, Timestamp,
    timestamp_now,
};
