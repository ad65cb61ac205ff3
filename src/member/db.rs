//! Database operations for members.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::{
    Error,
    member::{Member, MemberId, MemberName, NewMember, PhoneNumber},
};

/// Create the member table.
///
/// IDs use `AUTOINCREMENT` so that the ID of a deleted member is never handed
/// out again.
pub fn create_member_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (trim(name) <> ''),
            phone TEXT NOT NULL CHECK (trim(phone) <> '')
        )",
        (),
    )?;

    Ok(())
}

/// Insert a member, or replace the name and phone number of the member with
/// the same ID.
///
/// Replacing keeps the existing row, so the member's contributions survive.
///
/// # Errors
///
/// Returns [Error::ConstraintViolation] if the name or phone number is blank.
pub fn insert_member(new_member: NewMember, connection: &Connection) -> Result<Member, Error> {
    let NewMember { id, name, phone } = new_member;

    let id = match id {
        Some(id) => {
            connection.execute(
                "INSERT INTO members (id, name, phone) VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET name = excluded.name, phone = excluded.phone",
                (id.as_i64(), name.as_ref(), phone.as_ref()),
            )?;
            id
        }
        None => {
            connection.execute(
                "INSERT INTO members (name, phone) VALUES (?1, ?2)",
                (name.as_ref(), phone.as_ref()),
            )?;
            MemberId::new(connection.last_insert_rowid())
        }
    };

    Ok(Member { id, name, phone })
}

/// Get the member with `member_id`, or `None` if there is no such member.
pub fn get_member_by_id(
    member_id: MemberId,
    connection: &Connection,
) -> Result<Option<Member>, Error> {
    connection
        .prepare("SELECT id, name, phone FROM members WHERE id = :id")?
        .query_row(&[(":id", &member_id.as_i64())], map_member_row)
        .optional()
        .map_err(|error| error.into())
}

/// Get all members ordered by name.
pub fn get_all_members(connection: &Connection) -> Result<Vec<Member>, Error> {
    connection
        .prepare("SELECT id, name, phone FROM members ORDER BY name ASC, id ASC")?
        .query_map([], map_member_row)?
        .map(|maybe_member| maybe_member.map_err(|error| error.into()))
        .collect()
}

/// Delete a member and, through the foreign key cascade, its contributions.
///
/// Returns `false` if there was no member with `member_id`.
pub fn delete_member_by_id(member_id: MemberId, connection: &Connection) -> Result<bool, Error> {
    let rows_affected =
        connection.execute("DELETE FROM members WHERE id = ?1", [member_id.as_i64()])?;

    Ok(rows_affected > 0)
}

/// Map a row to a [Member], reading three columns starting at `offset`.
pub fn map_member_row_with_offset(row: &Row, offset: usize) -> Result<Member, rusqlite::Error> {
    let id = MemberId::new(row.get(offset)?);
    let raw_name: String = row.get(offset + 1)?;
    let raw_phone: String = row.get(offset + 2)?;

    Ok(Member {
        id,
        name: MemberName::new_unchecked(&raw_name),
        phone: PhoneNumber::new_unchecked(&raw_phone),
    })
}

fn map_member_row(row: &Row) -> Result<Member, rusqlite::Error> {
    map_member_row_with_offset(row, 0)
}

#[cfg(test)]
mod member_query_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        db::initialize,
        member::{MemberId, MemberName, NewMember, PhoneNumber},
    };

    use super::{delete_member_by_id, get_all_members, get_member_by_id, insert_member};

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).expect("Could not initialize database");
        connection
    }

    fn new_member(name: &str, phone: &str) -> NewMember {
        NewMember::new(MemberName::new_unchecked(name), PhoneNumber::new_unchecked(phone))
    }

    #[test]
    fn insert_member_assigns_fresh_id() {
        let connection = get_test_db_connection();

        let first = insert_member(new_member("Akinyi", "0700"), &connection).unwrap();
        let second = insert_member(new_member("Baraka", "0711"), &connection).unwrap();

        assert!(first.id.as_i64() > 0);
        assert_ne!(first.id, second.id);
        assert_eq!(first.name.as_ref(), "Akinyi");
        assert_eq!(first.phone.as_ref(), "0700");
    }

    #[test]
    fn insert_member_with_existing_id_replaces_row() {
        let connection = get_test_db_connection();
        let original = insert_member(new_member("Akinyi", "0700"), &connection).unwrap();

        let replaced =
            insert_member(new_member("Akinyi O.", "0799").with_id(original.id), &connection)
                .unwrap();

        assert_eq!(replaced.id, original.id);
        assert_eq!(
            get_all_members(&connection).unwrap(),
            vec![replaced],
            "want exactly one member after replacing"
        );
    }

    #[test]
    fn insert_member_with_blank_name_violates_constraint() {
        let connection = get_test_db_connection();

        let result = insert_member(new_member("  ", "0700"), &connection);

        assert!(
            matches!(result, Err(Error::ConstraintViolation(_))),
            "want constraint violation, got {result:?}"
        );
        assert!(get_all_members(&connection).unwrap().is_empty());
    }

    #[test]
    fn get_member_by_id_returns_none_on_miss() {
        let connection = get_test_db_connection();

        assert_eq!(get_member_by_id(MemberId::new(42), &connection), Ok(None));
    }

    #[test]
    fn get_member_by_id_returns_inserted_member() {
        let connection = get_test_db_connection();
        let member = insert_member(new_member("Chege", "0722"), &connection).unwrap();

        assert_eq!(get_member_by_id(member.id, &connection), Ok(Some(member)));
    }

    #[test]
    fn get_all_members_orders_by_name() {
        let connection = get_test_db_connection();
        for name in ["C", "A", "B"] {
            insert_member(new_member(name, "0700"), &connection).unwrap();
        }

        let names: Vec<String> = get_all_members(&connection)
            .unwrap()
            .into_iter()
            .map(|member| member.name.to_string())
            .collect();

        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn delete_member_reports_whether_a_row_was_removed() {
        let connection = get_test_db_connection();
        let member = insert_member(new_member("Chege", "0722"), &connection).unwrap();

        assert_eq!(delete_member_by_id(member.id, &connection), Ok(true));
        assert_eq!(delete_member_by_id(member.id, &connection), Ok(false));
        assert_eq!(get_member_by_id(member.id, &connection), Ok(None));
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let connection = get_test_db_connection();
        let member = insert_member(new_member("Chege", "0722"), &connection).unwrap();
        delete_member_by_id(member.id, &connection).unwrap();

        let next = insert_member(new_member("Dalia", "0733"), &connection).unwrap();

        assert!(next.id > member.id);
    }
}
