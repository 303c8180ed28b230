//! Client payloads and their validation into typed inputs.
//!
//! Raw payloads keep every field as an optional string so that a missing or
//! out-of-range value becomes a [`ValidationError`] naming the field, rather
//! than an opaque deserialization failure.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};

use super::application::{Category, Priority, Status};
use crate::error::ValidationError;

/// A fully validated create payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub company: String,
    pub role: String,
    pub status: Status,
    pub priority: Priority,
    pub category: Category,
    pub deadline: Option<NaiveDate>,
    pub note: Option<String>,
}

/// Text fields of a create request as they arrive in the multipart form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationForm {
    pub company: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub deadline: Option<String>,
    pub note: Option<String>,
}

impl ApplicationForm {
    /// Records a named form field. Returns `false` for names the record does
    /// not know about; ownership and identity fields are among those.
    pub fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "company" => &mut self.company,
            "role" => &mut self.role,
            "status" => &mut self.status,
            "priority" => &mut self.priority,
            "category" => &mut self.category,
            "deadline" => &mut self.deadline,
            "note" => &mut self.note,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Checks every required field and enum membership, reporting all
    /// offending fields at once.
    pub fn validate(self) -> Result<NewApplication, ValidationError> {
        let mut invalid = Vec::new();

        let company = required_text(self.company, "company", &mut invalid);
        let role = required_text(self.role, "role", &mut invalid);
        let status = required_enum::<Status>(self.status, "status", &mut invalid);
        let priority = required_enum::<Priority>(self.priority, "priority", &mut invalid);
        let category = required_enum::<Category>(self.category, "category", &mut invalid);
        let deadline = match self.deadline.as_deref().map(parse_deadline) {
            None => None,
            Some(Ok(date)) => date,
            Some(Err(_)) => {
                invalid.push("deadline".to_string());
                None
            }
        };

        match (company, role, status, priority, category) {
            (Some(company), Some(role), Some(status), Some(priority), Some(category))
                if invalid.is_empty() =>
            {
                Ok(NewApplication {
                    company,
                    role,
                    status,
                    priority,
                    category,
                    deadline,
                    note: normalize_note(self.note),
                })
            }
            _ => Err(ValidationError { fields: invalid }),
        }
    }
}

/// A partial update as sent by the client, JSON or urlencoded.
///
/// Unknown keys (`id`, `ownerId`, `createdAt`, `resumeUrl`, ...) are ignored:
/// identity and ownership come from the path and the credential, and the
/// resume URL is only ever set by an upload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchPayload {
    pub company: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub deadline: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub note: Option<Option<String>>,
}

/// A validated partial update. `None` leaves the stored value untouched; for
/// the nullable fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationPatch {
    pub company: Option<String>,
    pub role: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub deadline: Option<Option<NaiveDate>>,
    pub note: Option<Option<String>>,
}

impl ApplicationPatch {
    pub fn is_empty(&self) -> bool {
        self.company.is_none()
            && self.role.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.deadline.is_none()
            && self.note.is_none()
    }
}

impl PatchPayload {
    pub fn validate(self) -> Result<ApplicationPatch, ValidationError> {
        let mut invalid = Vec::new();

        let company = optional_text(self.company, "company", &mut invalid);
        let role = optional_text(self.role, "role", &mut invalid);
        let status = optional_enum::<Status>(self.status, "status", &mut invalid);
        let priority = optional_enum::<Priority>(self.priority, "priority", &mut invalid);
        let category = optional_enum::<Category>(self.category, "category", &mut invalid);
        let deadline = match self.deadline {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) => match parse_deadline(&raw) {
                Ok(date) => Some(date),
                Err(_) => {
                    invalid.push("deadline".to_string());
                    None
                }
            },
        };
        let note = self.note.map(normalize_note);

        if !invalid.is_empty() {
            return Err(ValidationError { fields: invalid });
        }

        Ok(ApplicationPatch {
            company,
            role,
            status,
            priority,
            category,
            deadline,
            note,
        })
    }
}

/// Query parameters accepted by the list operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
}

/// Validated list filters. All criteria are combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilter {
    /// Case-insensitive substring of the company name.
    pub search: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
}

impl ListQuery {
    pub fn validate(self) -> Result<ListFilter, ValidationError> {
        let mut invalid = Vec::new();

        let search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let status = filter_enum::<Status>(self.status, "status", &mut invalid);
        let priority = filter_enum::<Priority>(self.priority, "priority", &mut invalid);
        let category = filter_enum::<Category>(self.category, "category", &mut invalid);

        if !invalid.is_empty() {
            return Err(ValidationError { fields: invalid });
        }

        Ok(ListFilter {
            search,
            status,
            priority,
            category,
        })
    }
}

/// Parses a deadline given as `YYYY-MM-DD` or a full RFC 3339 timestamp.
/// An empty string means "no deadline".
fn parse_deadline(raw: &str) -> Result<Option<NaiveDate>, chrono::ParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    DateTime::parse_from_rfc3339(raw).map(|dt| Some(dt.date_naive()))
}

fn normalize_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

fn required_text(value: Option<String>, field: &str, invalid: &mut Vec<String>) -> Option<String> {
    let value = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    if value.is_none() {
        invalid.push(field.to_string());
    }
    value
}

fn optional_text(value: Option<String>, field: &str, invalid: &mut Vec<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        invalid.push(field.to_string());
        return None;
    }
    Some(trimmed.to_string())
}

fn required_enum<T: std::str::FromStr>(
    value: Option<String>,
    field: &str,
    invalid: &mut Vec<String>,
) -> Option<T> {
    match value.as_deref().map(str::trim).map(str::parse::<T>) {
        Some(Ok(v)) => Some(v),
        _ => {
            invalid.push(field.to_string());
            None
        }
    }
}

fn optional_enum<T: std::str::FromStr>(
    value: Option<String>,
    field: &str,
    invalid: &mut Vec<String>,
) -> Option<T> {
    value.as_ref()?;
    required_enum(value, field, invalid)
}

fn filter_enum<T: std::str::FromStr>(
    value: Option<String>,
    field: &str,
    invalid: &mut Vec<String>,
) -> Option<T> {
    match value.as_deref().map(str::trim) {
        None | Some("") | Some("All") => None,
        Some(raw) => match raw.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                invalid.push(field.to_string());
                None
            }
        },
    }
}

/// Distinguishes an absent key (`None`) from an explicit `null` (`Some(None)`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
