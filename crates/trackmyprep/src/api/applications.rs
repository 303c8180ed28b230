//! Handlers for the `/applications` resource.
//!
//! Every handler takes [`Owner`] first, so credentials are checked before
//! the body is read or the store is touched. Store calls run on the blocking
//! pool through [`with_store`], always scoped to the caller.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::{Form, Json};
use chrono::Utc;
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::auth::Owner;
use crate::db::{DashboardStats, DatabaseError, OwnedApplications};
use crate::error::{StorageError, ValidationError};
use crate::model::{ApplicationForm, ApplicationRecord, ListQuery, OwnerId, PatchPayload};
use crate::storage::StoredResume;

const LIST_FAILED: &str = "Failed to fetch applications";
const CREATE_FAILED: &str = "Failed to create application";
const UPDATE_FAILED: &str = "Failed to update application";
const DELETE_FAILED: &str = "Failed to delete application";
const STATS_FAILED: &str = "Failed to fetch statistics";
const INVALID_FILTER: &str = "Invalid filter";

/// Runs `f` against the caller's records on the blocking pool.
async fn with_store<T, F>(state: &AppState, owner: OwnerId, f: F) -> Result<T, DatabaseError>
where
    T: Send + 'static,
    F: FnOnce(OwnedApplications<'_>) -> Result<T, DatabaseError> + Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || f(db.applications_for(&owner))).await?
}

pub(crate) async fn list_applications(
    State(state): State<AppState>,
    Owner(owner): Owner,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<ApplicationRecord>>, ApiError> {
    let Query(query) = query.map_err(|e| {
        tracing::debug!(error = %e, "unreadable list query");
        ApiError::bad_request(INVALID_FILTER)
    })?;
    let filter = query
        .validate()
        .map_err(|e| ApiError::invalid(INVALID_FILTER, e))?;

    let records = with_store(&state, owner, move |apps| apps.list(&filter))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "listing applications failed");
            ApiError::internal(LIST_FAILED)
        })?;

    Ok(Json(records))
}

/// An uploaded file part, before it is written to disk.
struct ResumePart {
    file_name: String,
    content: Bytes,
}

pub(crate) async fn create_application(
    State(state): State<AppState>,
    Owner(owner): Owner,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApplicationRecord>), ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(error = %e, "create request is not multipart");
        ApiError::new(e.status(), CREATE_FAILED)
    })?;
    let mut form = ApplicationForm::default();
    let mut resume: Option<ResumePart> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::debug!(error = %e, "unreadable multipart body");
        ApiError::new(e.status(), CREATE_FAILED)
    })? {
        let name = field.name().unwrap_or_default().to_string();
        if name == state.settings.resume_field {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content = field.bytes().await.map_err(|e| {
                tracing::debug!(error = %e, "unreadable resume part");
                ApiError::new(e.status(), CREATE_FAILED)
            })?;
            // Browsers send an empty part when no file was chosen.
            if file_name.is_empty() && content.is_empty() {
                continue;
            }
            resume = Some(ResumePart { file_name, content });
        } else {
            let value = field.text().await.map_err(|e| {
                tracing::debug!(error = %e, field = %name, "unreadable form field");
                ApiError::new(e.status(), CREATE_FAILED)
            })?;
            if !form.set(&name, value) {
                tracing::debug!(field = %name, "ignoring unknown form field");
            }
        }
    }

    let new = form
        .validate()
        .map_err(|e| ApiError::invalid(CREATE_FAILED, e))?;

    let stored = match resume {
        Some(part) => Some(store_resume(&state, part).await?),
        None => None,
    };
    let resume_url = stored.as_ref().map(|s| s.url.clone()).unwrap_or_default();

    let created = with_store(&state, owner, move |apps| apps.create(new, resume_url)).await;
    match created {
        Ok(record) => {
            tracing::info!(id = %record.id, with_resume = stored.is_some(), "application created");
            Ok((StatusCode::CREATED, Json(record)))
        }
        Err(e) => {
            tracing::error!(error = %e, "inserting application failed");
            if let Some(stored) = stored {
                discard_resume(&state, stored).await;
            }
            Err(ApiError::internal(CREATE_FAILED))
        }
    }
}

async fn store_resume(state: &AppState, part: ResumePart) -> Result<StoredResume, ApiError> {
    let storage = state.storage.clone();
    let result =
        tokio::task::spawn_blocking(move || storage.store(&part.file_name, &part.content)).await;

    match result {
        Ok(Ok(stored)) => Ok(stored),
        Ok(Err(StorageError::ExtensionNotAllowed(ext))) => {
            tracing::debug!(extension = %ext, "rejected resume extension");
            Err(ApiError::invalid(
                CREATE_FAILED,
                ValidationError::field(state.settings.resume_field.clone()),
            ))
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "writing resume failed");
            Err(ApiError::internal(CREATE_FAILED))
        }
        Err(e) => {
            tracing::error!(error = %e, "resume write task failed");
            Err(ApiError::internal(CREATE_FAILED))
        }
    }
}

async fn discard_resume(state: &AppState, stored: StoredResume) {
    let storage = state.storage.clone();
    let url = stored.url;
    match tokio::task::spawn_blocking(move || storage.remove_by_url(&url)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, file = %stored.filename, "could not remove orphaned resume"),
        Err(e) => tracing::warn!(error = %e, file = %stored.filename, "resume cleanup task failed"),
    }
}

/// A partial update body, JSON or urlencoded.
pub(crate) struct PatchBody(pub PatchPayload);

#[async_trait]
impl<S> FromRequest<S> for PatchBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| {
                ct.to_ascii_lowercase()
                    .starts_with("application/x-www-form-urlencoded")
            });

        let payload = if is_form {
            Form::<PatchPayload>::from_request(req, state)
                .await
                .map(|Form(payload)| payload)
                .map_err(|e| {
                    tracing::debug!(error = %e, "unreadable update form");
                    ApiError::bad_request(UPDATE_FAILED)
                })?
        } else {
            Json::<PatchPayload>::from_request(req, state)
                .await
                .map(|Json(payload)| payload)
                .map_err(|e| {
                    tracing::debug!(error = %e, "unreadable update body");
                    ApiError::bad_request(UPDATE_FAILED)
                })?
        };
        Ok(PatchBody(payload))
    }
}

pub(crate) async fn update_application(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    PatchBody(payload): PatchBody,
) -> Result<Json<ApplicationRecord>, ApiError> {
    let patch = payload
        .validate()
        .map_err(|e| ApiError::invalid(UPDATE_FAILED, e))?;

    let target = id.clone();
    let updated = with_store(&state, owner, move |apps| apps.update(&target, &patch)).await;

    match updated {
        Ok(Some(record)) => {
            tracing::info!(id = %record.id, "application updated");
            Ok(Json(record))
        }
        Ok(None) => Err(ApiError::application_not_found()),
        Err(e) => {
            tracing::error!(error = %e, id = %id, "updating application failed");
            Err(ApiError::bad_request(UPDATE_FAILED))
        }
    }
}

pub(crate) async fn delete_application(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let target = id.clone();
    let deleted = with_store(&state, owner, move |apps| apps.delete(&target)).await;

    let record = match deleted {
        Ok(Some(record)) => record,
        Ok(None) => return Err(ApiError::application_not_found()),
        Err(e) => {
            tracing::error!(error = %e, id = %id, "deleting application failed");
            return Err(ApiError::bad_request(DELETE_FAILED));
        }
    };
    tracing::info!(id = %record.id, "application deleted");

    if state.settings.remove_resume_on_delete && !record.resume_url.is_empty() {
        let storage = state.storage.clone();
        let url = record.resume_url;
        match tokio::task::spawn_blocking(move || storage.remove_by_url(&url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, id = %record.id, "could not remove resume"),
            Err(e) => tracing::warn!(error = %e, id = %record.id, "resume removal task failed"),
        }
    }

    Ok(Json(json!({ "message": "Application deleted successfully" })))
}

pub(crate) async fn application_stats(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<Json<DashboardStats>, ApiError> {
    let today = Utc::now().date_naive();
    let stats = with_store(&state, owner, move |apps| apps.stats(today))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "computing statistics failed");
            ApiError::internal(STATS_FAILED)
        })?;
    Ok(Json(stats))
}
