use axum::extract::State;
use axum::Json;

use super::{ApiError, AppState};
use crate::auth::{Owner, Profile};

pub(crate) async fn get_profile(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<Json<Profile>, ApiError> {
    state.identity.profile(&owner).await.map(Json).map_err(|e| {
        tracing::error!(error = %e, "profile lookup failed");
        ApiError::internal("Failed to fetch user data")
    })
}
