//! Application repository: owner-scoped CRUD for the `applications` table.
//!
//! There is no unscoped entry point: every read and write goes through an
//! [`OwnedApplications`] handle, and every statement it issues carries an
//! `owner_id = ?` constraint. A record owned by someone else is therefore
//! indistinguishable from a record that does not exist.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};
use crate::model::{ApplicationPatch, ApplicationRecord, ListFilter, NewApplication, OwnerId};

const COLUMNS: &str = "id, owner_id, company, role, status, priority, category, deadline, note, resume_url, created_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Repository view restricted to the records of a single owner.
pub struct OwnedApplications<'a> {
    pub(super) db: &'a Database,
    pub(super) owner: &'a OwnerId,
}

impl Database {
    /// Scopes application access to `owner`.
    pub fn applications_for<'a>(&'a self, owner: &'a OwnerId) -> OwnedApplications<'a> {
        OwnedApplications { db: self, owner }
    }
}

impl OwnedApplications<'_> {
    /// Lists the owner's records, newest first.
    ///
    /// Enum filters run in SQL. The company search folds case in Rust, since
    /// SQLite's `LIKE` and `lower()` only fold ASCII.
    pub fn list(&self, filter: &ListFilter) -> Result<Vec<ApplicationRecord>, DatabaseError> {
        self.db.with_conn(|conn| {
            let mut conditions = vec!["owner_id = ?1".to_string()];
            let mut param_values: Vec<Box<dyn ToSql>> =
                vec![Box::new(self.owner.as_str().to_string())];

            if let Some(status) = filter.status {
                conditions.push(format!("status = ?{}", param_values.len() + 1));
                param_values.push(Box::new(status.as_str()));
            }
            if let Some(priority) = filter.priority {
                conditions.push(format!("priority = ?{}", param_values.len() + 1));
                param_values.push(Box::new(priority.as_str()));
            }
            if let Some(category) = filter.category {
                conditions.push(format!("category = ?{}", param_values.len() + 1));
                param_values.push(Box::new(category.as_str()));
            }

            let sql = format!(
                "SELECT {} FROM applications WHERE {} ORDER BY created_at DESC, rowid DESC",
                COLUMNS,
                conditions.join(" AND ")
            );

            let params_ref: Vec<&dyn ToSql> = param_values.iter().map(|p| p.as_ref()).collect();
            let mut stmt = conn.prepare(&sql)?;
            let needle = filter.search.as_deref().map(str::to_lowercase);
            let mut rows = Vec::new();
            for row in stmt.query_map(params_ref.as_slice(), record_from_row)? {
                let record = row?;
                if let Some(ref needle) = needle {
                    if !record.company.to_lowercase().contains(needle.as_str()) {
                        continue;
                    }
                }
                rows.push(record);
            }
            Ok(rows)
        })
    }

    /// Finds one of the owner's records by id.
    pub fn find(&self, id: &str) -> Result<Option<ApplicationRecord>, DatabaseError> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM applications WHERE id = ?1 AND owner_id = ?2",
                COLUMNS
            );
            let record = conn
                .query_row(&sql, params![id, self.owner.as_str()], record_from_row)
                .optional()?;
            Ok(record)
        })
    }

    /// Inserts a new record owned by this handle's owner. The store assigns
    /// `id` and `created_at`.
    pub fn create(
        &self,
        new: NewApplication,
        resume_url: String,
    ) -> Result<ApplicationRecord, DatabaseError> {
        let record = ApplicationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: self.owner.as_str().to_string(),
            company: new.company,
            role: new.role,
            status: new.status,
            priority: new.priority,
            category: new.category,
            deadline: new.deadline,
            note: new.note,
            resume_url,
            // Stored with microsecond precision; truncate so the returned
            // value matches what a later read yields.
            created_at: Utc::now().trunc_subsecs(6),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO applications (id, owner_id, company, role, status, priority, category,
                 deadline, note, resume_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id,
                    record.owner_id,
                    record.company,
                    record.role,
                    record.status.as_str(),
                    record.priority.as_str(),
                    record.category.as_str(),
                    record.deadline.map(format_date),
                    record.note,
                    record.resume_url,
                    format_timestamp(&record.created_at),
                ],
            )?;
            Ok(())
        })?;

        Ok(record)
    }

    /// Applies only the fields present in `patch`. Returns `None` when no
    /// record with `id` exists under this owner.
    pub fn update(
        &self,
        id: &str,
        patch: &ApplicationPatch,
    ) -> Result<Option<ApplicationRecord>, DatabaseError> {
        if patch.is_empty() {
            return self.find(id);
        }

        self.db.with_conn(|conn| {
            let mut assignments = Vec::new();
            let mut param_values: Vec<Box<dyn ToSql>> = vec![
                Box::new(id.to_string()),
                Box::new(self.owner.as_str().to_string()),
            ];

            let mut assign = |column: &str, value: Box<dyn ToSql>| {
                param_values.push(value);
                assignments.push(format!("{} = ?{}", column, param_values.len()));
            };

            if let Some(ref company) = patch.company {
                assign("company", Box::new(company.clone()));
            }
            if let Some(ref role) = patch.role {
                assign("role", Box::new(role.clone()));
            }
            if let Some(status) = patch.status {
                assign("status", Box::new(status.as_str()));
            }
            if let Some(priority) = patch.priority {
                assign("priority", Box::new(priority.as_str()));
            }
            if let Some(category) = patch.category {
                assign("category", Box::new(category.as_str()));
            }
            if let Some(deadline) = patch.deadline {
                assign("deadline", Box::new(deadline.map(format_date)));
            }
            if let Some(ref note) = patch.note {
                assign("note", Box::new(note.clone()));
            }

            let sql = format!(
                "UPDATE applications SET {} WHERE id = ?1 AND owner_id = ?2 RETURNING {}",
                assignments.join(", "),
                COLUMNS
            );

            let params_ref: Vec<&dyn ToSql> = param_values.iter().map(|p| p.as_ref()).collect();
            let record = conn
                .query_row(&sql, params_ref.as_slice(), record_from_row)
                .optional()?;
            Ok(record)
        })
    }

    /// Physically removes a record, returning what was removed. Returns `None`
    /// when no record with `id` exists under this owner.
    pub fn delete(&self, id: &str) -> Result<Option<ApplicationRecord>, DatabaseError> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "DELETE FROM applications WHERE id = ?1 AND owner_id = ?2 RETURNING {}",
                COLUMNS
            );
            let record = conn
                .query_row(&sql, params![id, self.owner.as_str()], record_from_row)
                .optional()?;
            Ok(record)
        })
    }
}

fn record_from_row(row: &Row<'_>) -> Result<ApplicationRecord, rusqlite::Error> {
    let deadline: Option<String> = row.get(7)?;
    let created_at: String = row.get(10)?;

    Ok(ApplicationRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        company: row.get(2)?,
        role: row.get(3)?,
        status: parse_column(row, 4)?,
        priority: parse_column(row, 5)?,
        category: parse_column(row, 6)?,
        deadline: deadline
            .map(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT))
            .transpose()
            .map_err(|e| conversion_error(7, e))?,
        note: row.get(8)?,
        resume_url: row.get(9)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(10, e))?,
    })
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Fixed-width RFC 3339 so that text ordering matches chronological ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Priority, Status};

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample(company: &str) -> NewApplication {
        NewApplication {
            company: company.to_string(),
            role: "SDE Intern".to_string(),
            status: Status::Applied,
            priority: Priority::High,
            category: Category::Internship,
            deadline: NaiveDate::from_ymd_opt(2026, 12, 1),
            note: Some("referral".to_string()),
        }
    }

    #[test]
    fn test_create_and_find() {
        let db = test_db();
        let owner = OwnerId::new("user_1");
        let repo = db.applications_for(&owner);

        let created = repo.create(sample("Acme"), String::new()).unwrap();
        assert_eq!(created.owner_id, "user_1");
        assert!(!created.id.is_empty());

        let found = repo.find(&created.id).unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[test]
    fn test_list_empty_for_new_owner() {
        let db = test_db();
        let owner = OwnerId::new("nobody");
        let rows = db
            .applications_for(&owner)
            .list(&ListFilter::default())
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_list_newest_first() {
        let db = test_db();
        let owner = OwnerId::new("user_1");
        let repo = db.applications_for(&owner);
        let first = repo.create(sample("First"), String::new()).unwrap();
        let second = repo.create(sample("Second"), String::new()).unwrap();
        let third = repo.create(sample("Third"), String::new()).unwrap();

        let ids: Vec<String> = repo
            .list(&ListFilter::default())
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
    }

    #[test]
    fn test_owners_are_isolated() {
        let db = test_db();
        let alice = OwnerId::new("alice");
        let bob = OwnerId::new("bob");
        let record = db
            .applications_for(&alice)
            .create(sample("Acme"), String::new())
            .unwrap();

        let bobs = db.applications_for(&bob);
        assert!(bobs.list(&ListFilter::default()).unwrap().is_empty());
        assert!(bobs.find(&record.id).unwrap().is_none());

        let patch = ApplicationPatch {
            status: Some(Status::Rejected),
            ..Default::default()
        };
        assert!(bobs.update(&record.id, &patch).unwrap().is_none());
        assert!(bobs.delete(&record.id).unwrap().is_none());

        let unchanged = db.applications_for(&alice).find(&record.id).unwrap().unwrap();
        assert_eq!(unchanged, record);
    }

    #[test]
    fn test_partial_update_touches_only_given_fields() {
        let db = test_db();
        let owner = OwnerId::new("user_1");
        let repo = db.applications_for(&owner);
        let record = repo.create(sample("Acme"), String::new()).unwrap();

        let patch = ApplicationPatch {
            status: Some(Status::Offer),
            ..Default::default()
        };
        let updated = repo.update(&record.id, &patch).unwrap().unwrap();
        assert_eq!(updated.status, Status::Offer);
        assert_eq!(
            ApplicationRecord {
                status: Status::Applied,
                ..updated
            },
            record
        );
    }

    #[test]
    fn test_update_clears_nullable_fields() {
        let db = test_db();
        let owner = OwnerId::new("user_1");
        let repo = db.applications_for(&owner);
        let record = repo.create(sample("Acme"), String::new()).unwrap();

        let patch = ApplicationPatch {
            deadline: Some(None),
            note: Some(None),
            ..Default::default()
        };
        let updated = repo.update(&record.id, &patch).unwrap().unwrap();
        assert_eq!(updated.deadline, None);
        assert_eq!(updated.note, None);
        assert_eq!(updated.company, "Acme");
    }

    #[test]
    fn test_empty_patch_returns_current_record() {
        let db = test_db();
        let owner = OwnerId::new("user_1");
        let repo = db.applications_for(&owner);
        let record = repo.create(sample("Acme"), String::new()).unwrap();

        let same = repo
            .update(&record.id, &ApplicationPatch::default())
            .unwrap()
            .unwrap();
        assert_eq!(same, record);
        assert!(repo
            .update("missing", &ApplicationPatch::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete_twice() {
        let db = test_db();
        let owner = OwnerId::new("user_1");
        let repo = db.applications_for(&owner);
        let record = repo.create(sample("Acme"), "http://x/uploads/1.pdf".to_string()).unwrap();

        let removed = repo.delete(&record.id).unwrap().unwrap();
        assert_eq!(removed.resume_url, "http://x/uploads/1.pdf");
        assert!(repo.delete(&record.id).unwrap().is_none());
        assert!(repo.list(&ListFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_list_filters() {
        let db = test_db();
        let owner = OwnerId::new("user_1");
        let repo = db.applications_for(&owner);
        repo.create(sample("Acme Corp"), String::new()).unwrap();
        let mut remote = sample("Globex");
        remote.category = Category::Remote;
        remote.status = Status::Interview;
        repo.create(remote, String::new()).unwrap();
        repo.create(sample("100% Legit_Co"), String::new()).unwrap();

        let by_search = repo
            .list(&ListFilter {
                search: Some("acme".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_search.len(), 1);
        assert_eq!(by_search[0].company, "Acme Corp");

        let by_status = repo
            .list(&ListFilter {
                status: Some(Status::Interview),
                category: Some(Category::Remote),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].company, "Globex");

        let wildcard = repo
            .list(&ListFilter {
                search: Some("0% L".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(wildcard.len(), 1);

        let literal_underscore = repo
            .list(&ListFilter {
                search: Some("_".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(literal_underscore.len(), 1);
    }

    #[test]
    fn test_search_folds_non_ascii_case() {
        let db = test_db();
        let owner = OwnerId::new("user_1");
        let repo = db.applications_for(&owner);
        repo.create(sample("Élan Systèmes"), String::new()).unwrap();
        repo.create(sample("Acme"), String::new()).unwrap();

        for needle in ["Élan", "élan", "ÉLAN", "systèmes", "SYSTÈMES"] {
            let rows = repo
                .list(&ListFilter {
                    search: Some(needle.to_string()),
                    ..Default::default()
                })
                .unwrap();
            assert_eq!(rows.len(), 1, "search {:?}", needle);
            assert_eq!(rows[0].company, "Élan Systèmes");
        }
    }
}
