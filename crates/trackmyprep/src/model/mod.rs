//! Domain types: the application record, its enums and client payloads.

pub mod application;
pub mod form;

pub use application::{ApplicationRecord, Category, Priority, Status, UnknownVariant};
pub use form::{
    ApplicationForm, ApplicationPatch, ListFilter, ListQuery, NewApplication, PatchPayload,
};

use std::fmt;

/// The verified subject identifier of a caller; the sole authorization key.
///
/// Only the authorization layer constructs one from a verified credential, so
/// holding an `OwnerId` means the identity provider vouched for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(subject: impl Into<String>) -> Self {
        Self(subject.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
