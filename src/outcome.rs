//! The result of a facade command that may decline invalid input.

use std::fmt::Display;

/// What happened to a command that passed the database without error.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The command was carried out.
    Applied(T),
    /// The input was invalid so nothing was written and nothing was emitted.
    ///
    /// This is not an error: callers that want to tell the user why should
    /// validate before calling, or inspect the reason.
    Skipped(SkipReason),
}

impl<T> Outcome<T> {
    /// The value of an applied command, `None` if it was skipped.
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Skipped(_) => None,
        }
    }

    /// Whether the command was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }
}

/// Why a command was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The member name was empty or whitespace.
    BlankName,
    /// The phone number was empty or whitespace.
    BlankPhone,
    /// The contribution amount was zero, negative or not a number.
    NonPositiveAmount,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::BlankName => write!(f, "name is blank"),
            SkipReason::BlankPhone => write!(f, "phone number is blank"),
            SkipReason::NonPositiveAmount => write!(f, "amount is not positive"),
        }
    }
}
