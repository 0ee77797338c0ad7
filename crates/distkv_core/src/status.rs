//! Stable outcome codes.

use std::fmt;

/// Outcome of a store operation, with a stable numeric code.
///
/// Every [`crate::CoreError`] maps onto one of these through
/// [`crate::CoreError::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    /// The operation completed.
    Success = 0,
    /// Unspecified failure.
    Error = 1,
    /// An argument was rejected.
    InvalidArgs = 2,
    /// The requested item does not exist.
    NotFound = 3,
    /// The operation or operation kind is not supported.
    NotSupported = 4,
    /// The cursor has already been closed.
    AlreadyClosed = 5,
    /// A resource limit was reached.
    OverMaxLimits = 6,
}

impl Status {
    /// Returns the numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Looks up a status by numeric code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::Error),
            2 => Some(Self::InvalidArgs),
            3 => Some(Self::NotFound),
            4 => Some(Self::NotSupported),
            5 => Some(Self::AlreadyClosed),
            6 => Some(Self::OverMaxLimits),
            _ => None,
        }
    }

    /// Returns true for [`Status::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
            Self::InvalidArgs => "INVALID_ARGS",
            Self::NotFound => "NOT_FOUND",
            Self::NotSupported => "NOT_SUPPORT",
            Self::AlreadyClosed => "ALREADY_CLOSED",
            Self::OverMaxLimits => "OVER_MAX_LIMITS",
        };
        write!(f, "{name}({})", self.code())
    }
}
