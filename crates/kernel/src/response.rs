//! JSON response envelope.

use axum::Json;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::resources::Page;

/// Total matching parents, ignoring pagination.
pub static X_TOTAL_COUNT: HeaderName = HeaderName::from_static("x-total-count");

/// `{ "code": ..., "message": ..., "data": ... }`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            message: "success".to_string(),
            data,
        }
    }
}

impl Envelope<()> {
    /// Error envelope; `data` serializes as `null`.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            data: (),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// A page of aggregates: envelope body plus `X-Total-Count`.
pub struct Listing<T>(pub Page<T>);

impl<T: Serialize> IntoResponse for Listing<T> {
    fn into_response(self) -> Response {
        let Page { items, total } = self.0;
        let mut response = Envelope::ok(items).into_response();
        response
            .headers_mut()
            .insert(X_TOTAL_COUNT.clone(), HeaderValue::from(total));
        response
    }
}
