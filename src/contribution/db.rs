//! Database operations for contributions.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::{
    Error,
    contribution::{Contribution, ContributionId, MemberWithContributions, NewContribution},
    member::{MemberId, map_member_row_with_offset},
};

/// Create the contribution table and its member index.
///
/// Contributions are removed along with their member.
pub fn create_contribution_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS contributions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            member_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            timestamp INTEGER NOT NULL,
            FOREIGN KEY(member_id) REFERENCES members(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_contributions_member_id ON contributions(member_id);",
    )?;

    Ok(())
}

/// Insert a contribution and return it with its generated ID.
///
/// # Errors
///
/// Returns [Error::ConstraintViolation] if `member_id` does not refer to a
/// member.
pub fn insert_contribution(
    new_contribution: NewContribution,
    connection: &Connection,
) -> Result<Contribution, Error> {
    let NewContribution {
        member_id,
        amount,
        timestamp,
    } = new_contribution;

    connection.execute(
        "INSERT INTO contributions (member_id, amount, timestamp) VALUES (?1, ?2, ?3)",
        (member_id.as_i64(), amount, timestamp),
    )?;

    let id = ContributionId::new(connection.last_insert_rowid());

    Ok(Contribution {
        id,
        member_id,
        amount,
        timestamp,
    })
}

/// Delete a contribution.
///
/// Returns the ID of the member the contribution belonged to, or `None` if
/// there was nothing to delete.
pub fn delete_contribution_by_id(
    contribution_id: ContributionId,
    connection: &Connection,
) -> Result<Option<MemberId>, Error> {
    connection
        .query_row(
            "DELETE FROM contributions WHERE id = ?1 RETURNING member_id",
            [contribution_id.as_i64()],
            |row| row.get(0).map(MemberId::new),
        )
        .optional()
        .map_err(|error| error.into())
}

/// Count the contributions made by one member.
pub fn count_contributions_for_member(
    member_id: MemberId,
    connection: &Connection,
) -> Result<usize, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM contributions WHERE member_id = ?1",
        [member_id.as_i64()],
        |row| row.get(0),
    )?;

    // COUNT is never negative.
    Ok(usize::try_from(count).unwrap_or_default())
}

/// Get the contributions of one member, most recent first.
pub fn get_contributions_for_member(
    member_id: MemberId,
    connection: &Connection,
) -> Result<Vec<Contribution>, Error> {
    connection
        .prepare(
            "SELECT id, member_id, amount, timestamp FROM contributions
            WHERE member_id = :member_id
            ORDER BY timestamp DESC, id DESC",
        )?
        .query_map(&[(":member_id", &member_id.as_i64())], map_contribution_row)?
        .map(|maybe_contribution| maybe_contribution.map_err(|error| error.into()))
        .collect()
}

/// Get every contribution, most recent first.
pub fn get_all_contributions(connection: &Connection) -> Result<Vec<Contribution>, Error> {
    connection
        .prepare(
            "SELECT id, member_id, amount, timestamp FROM contributions
            ORDER BY timestamp DESC, id DESC",
        )?
        .query_map([], map_contribution_row)?
        .map(|maybe_contribution| maybe_contribution.map_err(|error| error.into()))
        .collect()
}

/// Get every member, ordered by name, each with their contributions ordered
/// most recent first.
///
/// Members without contributions are included with an empty list.
pub fn get_members_with_contributions(
    connection: &Connection,
) -> Result<Vec<MemberWithContributions>, Error> {
    let mut statement = connection.prepare(
        "SELECT m.id, m.name, m.phone, c.id, c.member_id, c.amount, c.timestamp
        FROM members m
        LEFT JOIN contributions c ON c.member_id = m.id
        ORDER BY m.name ASC, m.id ASC, c.timestamp DESC, c.id DESC",
    )?;

    let rows = statement.query_map([], |row| {
        let member = map_member_row_with_offset(row, 0)?;
        let contribution = map_optional_contribution_row(row, 3)?;

        Ok((member, contribution))
    })?;

    let mut grouped: Vec<MemberWithContributions> = Vec::new();

    for row in rows {
        let (member, contribution) = row?;

        // Rows arrive grouped by member because of the ORDER BY.
        let starts_new_group = grouped
            .last()
            .is_none_or(|group| group.member.id != member.id);

        if starts_new_group {
            grouped.push(MemberWithContributions {
                member,
                contributions: Vec::new(),
            });
        }

        if let (Some(contribution), Some(group)) = (contribution, grouped.last_mut()) {
            group.contributions.push(contribution);
        }
    }

    Ok(grouped)
}

fn map_contribution_row(row: &Row) -> Result<Contribution, rusqlite::Error> {
    let id = ContributionId::new(row.get(0)?);
    let member_id = MemberId::new(row.get(1)?);
    let amount = row.get(2)?;
    let timestamp = row.get(3)?;

    Ok(Contribution {
        id,
        member_id,
        amount,
        timestamp,
    })
}

/// Map the contribution columns of a `LEFT JOIN` row, which are all `NULL`
/// when the member has no contributions.
fn map_optional_contribution_row(
    row: &Row,
    offset: usize,
) -> Result<Option<Contribution>, rusqlite::Error> {
    let raw_id: Option<i64> = row.get(offset)?;

    let Some(raw_id) = raw_id else {
        return Ok(None);
    };

    Ok(Some(Contribution {
        id: ContributionId::new(raw_id),
        member_id: MemberId::new(row.get(offset + 1)?),
        amount: row.get(offset + 2)?,
        timestamp: row.get(offset + 3)?,
    }))
}
