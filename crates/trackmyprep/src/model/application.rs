//! The application record and its enumerated fields.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Declares a closed string enum whose wire form is exactly the given literal.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// A string that is not a member of the enumerated set it was parsed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

wire_enum! {
    /// Where an application currently stands.
    Status {
        Applied => "Applied",
        Interview => "Interview",
        Offer => "Offer",
        Rejected => "Rejected",
    }
}

wire_enum! {
    Priority {
        High => "High",
        Medium => "Medium",
        Low => "Low",
    }
}

wire_enum! {
    /// Kind of position applied for.
    Category {
        Internship => "Internship",
        FullTime => "Full-time",
        Remote => "Remote",
        Contract => "Contract",
    }
}

/// A stored job application.
///
/// `id`, `owner_id` and `created_at` are assigned by the store at creation and
/// never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub id: String,
    pub owner_id: String,
    pub company: String,
    pub role: String,
    pub status: Status,
    pub priority: Priority,
    pub category: Category,
    pub deadline: Option<NaiveDate>,
    pub note: Option<String>,
    /// Public URL of the uploaded resume, empty when none was attached.
    pub resume_url: String,
    pub created_at: DateTime<Utc>,
}
