//! Core member domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, database_id::DatabaseId};

/// A newtype wrapper for integer member IDs.
///
/// This helps disambiguate member IDs from contribution IDs, leading to better
/// compile time errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct MemberId(DatabaseId);

impl MemberId {
    /// Create a new member ID.
    pub fn new(id: DatabaseId) -> Self {
        Self(id)
    }

    /// Cast the member ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A validated, non-blank member name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct MemberName(String);

impl MemberName {
    /// Create a member name.
    ///
    /// Leading and trailing whitespace is removed.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyMemberName] if `name` is empty
    /// or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyMemberName)
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a member name without validation.
    ///
    /// The caller should ensure that the string is not blank. A blank name is
    /// rejected by the database with [Error::ConstraintViolation].
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for MemberName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for MemberName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MemberName::new(s)
    }
}

impl Display for MemberName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated, non-blank phone number.
///
/// No format rules apply beyond being non-blank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Create a phone number.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyPhoneNumber] if `phone` is
    /// empty or only whitespace.
    pub fn new(phone: &str) -> Result<Self, Error> {
        let phone = phone.trim();

        if phone.is_empty() {
            Err(Error::EmptyPhoneNumber)
        } else {
            Ok(Self(phone.to_owned()))
        }
    }

    /// Create a phone number without validation.
    pub fn new_unchecked(phone: &str) -> Self {
        Self(phone.to_owned())
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for PhoneNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhoneNumber::new(s)
    }
}

impl Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A participant in the savings group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Member {
    /// The member's ID in the application database.
    pub id: MemberId,
    /// The member's display name.
    pub name: MemberName,
    /// How to reach the member.
    pub phone: PhoneNumber,
}

/// The data needed to insert a member.
///
/// Leave `id` as `None` to have the database assign a fresh ID. Setting `id`
/// to an existing member's ID replaces that member's name and phone number.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub id: Option<MemberId>,
    pub name: MemberName,
    pub phone: PhoneNumber,
}

impl NewMember {
    /// A member that will be given a fresh ID on insertion.
    pub fn new(name: MemberName, phone: PhoneNumber) -> Self {
        Self {
            id: None,
            name,
            phone,
        }
    }

    /// Replace the existing member with `id`, or insert with that ID if
    /// there is none.
    pub fn with_id(mut self, id: MemberId) -> Self {
        self.id = Some(id);
        self
    }
}

#[cfg(test)]
mod member_name_tests {
    use crate::{Error, member::MemberName};

    #[test]
    fn new_fails_on_empty_string() {
        assert_eq!(MemberName::new(""), Err(Error::EmptyMemberName));
    }

    #[test]
    fn new_fails_on_just_whitespace() {
        assert_eq!(MemberName::new("\n\t \r"), Err(Error::EmptyMemberName));
    }

    #[test]
    fn new_trims_surrounding_whitespace() {
        let name = MemberName::new("  Wanjiru ").unwrap();

        assert_eq!(name.as_ref(), "Wanjiru");
    }
}

#[cfg(test)]
mod phone_number_tests {
    use crate::{Error, member::PhoneNumber};

    #[test]
    fn new_fails_on_blank_string() {
        assert_eq!(PhoneNumber::new("   "), Err(Error::EmptyPhoneNumber));
    }

    #[test]
    fn new_accepts_any_non_blank_text() {
        assert!(PhoneNumber::new("call me maybe").is_ok());
    }
}
