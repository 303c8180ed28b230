use std::borrow::Cow;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::ValidationError;

/// An error rendered as `{"message": ...}` with an HTTP status.
///
/// Messages are fixed per operation. Internal error text is logged where the
/// error is handled and never placed in the body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: Cow<'static, str>,
    fields: Vec<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [String]>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn unauthenticated() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthenticated")
    }

    /// Not found and not owned look the same to the caller.
    pub fn application_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Application not found")
    }

    pub fn internal(message: &'static str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// A 400 naming the offending fields.
    pub fn invalid(message: &'static str, err: ValidationError) -> Self {
        Self {
            fields: err.fields,
            ..Self::bad_request(message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: &self.message,
            fields: (!self.fields.is_empty()).then_some(self.fields.as_slice()),
        };
        (self.status, Json(body)).into_response()
    }
}
