mod db;
mod domain;

pub use db::{
    create_member_table, delete_member_by_id, get_all_members, get_member_by_id, insert_member,
    map_member_row_with_offset,
};
pub use domain::{Member, MemberId, MemberName, NewMember, PhoneNumber};
