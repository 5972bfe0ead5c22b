//! Strongly-typed value objects used by domain entities.
//!
//! These wrappers enforce basic invariants (e.g., non-empty remote identifiers,
//! GUID-shaped user ids, valid context urls) so that once a value reaches the
//! domain layer it can be treated as trusted.
use std::fmt::{Display, Formatter};
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidateUrl;

/// Errors produced when attempting to construct a constrained value object.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TypeConstraintError {
    /// Provided string contained no non-whitespace characters.
    #[error("value cannot be empty")]
    EmptyString,
    /// Provided user id is not a directory object id.
    #[error("invalid user id")]
    InvalidUserId,
    /// Provided url failed format validation.
    #[error("invalid url address")]
    InvalidUrl,
    /// Completion percentage outside of `0..=100`.
    #[error("percentage must be between 0 and 100")]
    InvalidPercent,
    /// Provided value failed custom validation.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Trims the input and rejects blank values.
fn non_empty<S: Into<String>>(value: S) -> Result<String, TypeConstraintError> {
    let trimmed = value.into().trim().to_string();
    if trimmed.is_empty() {
        Err(TypeConstraintError::EmptyString)
    } else {
        Ok(trimmed)
    }
}

macro_rules! non_empty_string_newtype {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Constructs a trimmed, non-empty value.
            pub fn new<S: Into<String>>(value: S) -> Result<Self, TypeConstraintError> {
                Ok(Self(non_empty(value)?))
            }

            /// Borrow the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the owned string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeConstraintError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = TypeConstraintError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

/// Macro to generate opaque identifiers assigned by the remote planner.
///
/// Every typed identifier converts from the untyped [`ResourceId`] returned by
/// the find-or-create locator.
macro_rules! remote_id_newtype {
    ($name:ident, $doc:expr) => {
        non_empty_string_newtype!($name, $doc);

        impl From<ResourceId> for $name {
            fn from(value: ResourceId) -> Self {
                Self(value.into_inner())
            }
        }
    };
}

non_empty_string_newtype!(
    ResourceId,
    "Opaque identifier of any remote resource as returned by a query or create call."
);

remote_id_newtype!(GroupId, "Identifier of a collaborative group.");
remote_id_newtype!(PlanId, "Identifier of a task plan owned by a group.");
remote_id_newtype!(BucketId, "Identifier of a bucket within a plan.");
remote_id_newtype!(TaskId, "Identifier of a reminder task.");

non_empty_string_newtype!(
    VersionTag,
    "Opaque revision tag; changes on every mutation of the tagged resource."
);

non_empty_string_newtype!(
    ResourceName,
    "Display name of a group, plan or bucket."
);

non_empty_string_newtype!(LeadTitle, "Lead title wrapper enforcing non-empty values.");

/// Directory object id of the acting user.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Accepts any GUID representation and stores its hyphenated lower-case form.
    pub fn new<S: Into<String>>(value: S) -> Result<Self, TypeConstraintError> {
        let trimmed = non_empty(value)?;
        let guid = Uuid::parse_str(&trimmed).map_err(|_| TypeConstraintError::InvalidUserId)?;
        Ok(Self(guid.hyphenated().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = TypeConstraintError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for UserId {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
/// Link back to the page the reminder was scheduled from.
pub struct ContextUrl(String);

impl ContextUrl {
    /// Ensures a trimmed url is non-empty and well formed before wrapping.
    pub fn new<S: Into<String>>(value: S) -> Result<Self, TypeConstraintError> {
        let url = non_empty(value)?;

        if !url.as_str().validate_url() {
            Err(TypeConstraintError::InvalidUrl)
        } else {
            Ok(Self(url))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for ContextUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ContextUrl {
    type Error = TypeConstraintError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContextUrl> for String {
    fn from(value: ContextUrl) -> Self {
        value.0
    }
}

/// Lead completion percentage in `0..=100`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub struct Percent(u8);

impl Percent {
    pub fn new(value: u8) -> Result<Self, TypeConstraintError> {
        if value <= 100 {
            Ok(Self(value))
        } else {
            Err(TypeConstraintError::InvalidPercent)
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Rounds and clamps any reported number into range; `NaN` becomes zero.
    pub fn saturating_from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Self(0);
        }
        Self(value.round().clamp(0.0, 100.0) as u8)
    }
}

impl TryFrom<u8> for Percent {
    type Error = TypeConstraintError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percent> for u8 {
    fn from(value: Percent) -> Self {
        value.0
    }
}
