//! Dashboard statistics: per-status counts and a 7-day creation histogram.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use rusqlite::params;
use serde::Serialize;

use super::{DatabaseError, OwnedApplications};
use crate::model::Status;

/// Number of days covered by the activity histogram, today included.
pub const HISTOGRAM_DAYS: i64 = 7;

/// Aggregate summary of one owner's applications.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: i64,
    pub by_status: StatusCounts,
    /// Oldest day first, ending today.
    pub weekly: Vec<DayCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    #[serde(rename = "Applied")]
    pub applied: i64,
    #[serde(rename = "Interview")]
    pub interview: i64,
    #[serde(rename = "Offer")]
    pub offer: i64,
    #[serde(rename = "Rejected")]
    pub rejected: i64,
}

impl StatusCounts {
    fn slot(&mut self, status: Status) -> &mut i64 {
        match status {
            Status::Applied => &mut self.applied,
            Status::Interview => &mut self.interview,
            Status::Offer => &mut self.offer,
            Status::Rejected => &mut self.rejected,
        }
    }
}

/// Applications created on a single calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCount {
    /// Three-letter weekday, e.g. `Mon`.
    pub day: String,
    pub date: NaiveDate,
    pub count: i64,
}

impl OwnedApplications<'_> {
    /// Computes the dashboard summary with the histogram ending on `today`.
    pub fn stats(&self, today: NaiveDate) -> Result<DashboardStats, DatabaseError> {
        let start = today - Duration::days(HISTOGRAM_DAYS - 1);
        let end = today + Duration::days(1);

        let (by_status, per_day) = self.db.with_conn(|conn| {
            let mut by_status = StatusCounts::default();
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM applications WHERE owner_id = ?1 GROUP BY status",
            )?;
            let rows = stmt.query_map(params![self.owner.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (status, count) = row?;
                // The schema CHECK constraint keeps unknown statuses out.
                if let Ok(status) = status.parse::<Status>() {
                    *by_status.slot(status) += count;
                }
            }

            let mut stmt = conn.prepare(
                "SELECT substr(created_at, 1, 10) AS day, COUNT(*) FROM applications
                 WHERE owner_id = ?1 AND created_at >= ?2 AND created_at < ?3
                 GROUP BY day",
            )?;
            let per_day = stmt
                .query_map(
                    params![
                        self.owner.as_str(),
                        start.format("%Y-%m-%d").to_string(),
                        end.format("%Y-%m-%d").to_string(),
                    ],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                )?
                .collect::<Result<HashMap<_, _>, _>>()?;

            Ok((by_status, per_day))
        })?;

        let weekly = (0..HISTOGRAM_DAYS)
            .map(|offset| {
                let date = start + Duration::days(offset);
                let key = date.format("%Y-%m-%d").to_string();
                DayCount {
                    day: date.format("%a").to_string(),
                    date,
                    count: per_day.get(&key).copied().unwrap_or(0),
                }
            })
            .collect();

        let total =
            by_status.applied + by_status.interview + by_status.offer + by_status.rejected;

        Ok(DashboardStats {
            total,
            by_status,
            weekly,
        })
    }
}
