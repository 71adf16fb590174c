//! Route handlers.

use super::error::ApiError;
use super::AppState;
use crate::guard::key::KEY_SEPARATOR;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

/// Longest accepted user id.
pub const MAX_USER_ID_LEN: usize = 64;

/// Body returned by every guard operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardResponse {
    pub guard_id: String,
}

/// Body returned by the health check.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
}

/// `POST /guards`
pub async fn issue_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<GuardResponse>, ApiError> {
    let user_id = user_id(&headers, &state.user_id_header)?;
    let guard_id = state.manager.issue(&user_id).await?;
    Ok(Json(GuardResponse { guard_id }))
}

/// `PATCH /guards/:id`
pub async fn refresh_handler(
    State(state): State<AppState>,
    Path(guard_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<GuardResponse>, ApiError> {
    let user_id = user_id(&headers, &state.user_id_header)?;
    validate_guard_id(&guard_id)?;
    let guard_id = state.manager.refresh(&user_id, &guard_id).await?;
    Ok(Json(GuardResponse { guard_id }))
}

/// `DELETE /guards/:id`
pub async fn revoke_handler(
    State(state): State<AppState>,
    Path(guard_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<GuardResponse>, ApiError> {
    let user_id = user_id(&headers, &state.user_id_header)?;
    validate_guard_id(&guard_id)?;
    let guard_id = state.manager.revoke(&user_id, &guard_id).await?;
    Ok(Json(GuardResponse { guard_id }))
}

/// `GET /health`
///
/// Healthy iff the store answers a ping.
pub async fn health_handler(State(state): State<AppState>) -> Response {
    let store = state.manager.store();
    match store.ping().await {
        Ok(()) => Json(HealthResponse {
            status: "ok",
            store: store.backend_name(),
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                    store: store.backend_name(),
                }),
            )
                .into_response()
        }
    }
}

/// Extract and check the caller's user id.
///
/// The id becomes part of a store key, so it must not contain the key
/// separator; restricting it to ASCII letters, digits and `-` covers that.
pub fn user_id(headers: &HeaderMap, name: &HeaderName) -> Result<String, ApiError> {
    let value = headers.get(name).ok_or_else(|| ApiError::MissingHeader {
        header: name.as_str().to_string(),
    })?;

    let user_id = value.to_str().map_err(|_| ApiError::Unauthorized)?;
    if !is_valid_user_id(user_id) {
        return Err(ApiError::Unauthorized);
    }
    Ok(user_id.to_string())
}

/// Whether `user_id` is non-empty, short enough and drawn from `[A-Za-z0-9-]`.
pub fn is_valid_user_id(user_id: &str) -> bool {
    !user_id.is_empty()
        && user_id.len() <= MAX_USER_ID_LEN
        && user_id
            .chars()
            .all(|c| c != KEY_SEPARATOR && (c.is_ascii_alphanumeric() || c == '-'))
}

fn validate_guard_id(guard_id: &str) -> Result<(), ApiError> {
    Uuid::parse_str(guard_id)
        .map(|_| ())
        .map_err(|_| ApiError::Validation(format!("guardId must be a UUID, got {:?}", guard_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn header() -> HeaderName {
        HeaderName::from_static("x-user-id")
    }

    #[test]
    fn user_id_rules() {
        assert!(is_valid_user_id("1"));
        assert!(is_valid_user_id("user-42"));
        assert!(!is_valid_user_id(""));
        assert!(!is_valid_user_id("a_b"));
        assert!(!is_valid_user_id("a*"));
        assert!(!is_valid_user_id(&"x".repeat(MAX_USER_ID_LEN + 1)));
        assert!(is_valid_user_id(&"x".repeat(MAX_USER_ID_LEN)));
    }

    #[test]
    fn missing_header_is_reported_by_name() {
        let err = user_id(&HeaderMap::new(), &header()).unwrap_err();
        assert!(matches!(err, ApiError::MissingHeader { ref header } if header == "x-user-id"));
    }

    #[test]
    fn surrounding_whitespace_is_rejected() {
        for raw in [" 42", "42 ", " 42 ", "4 2"] {
            let mut headers = HeaderMap::new();
            headers.insert(header(), HeaderValue::from_static(raw));
            assert!(
                matches!(user_id(&headers, &header()), Err(ApiError::Unauthorized)),
                "{raw:?}"
            );
        }

        let mut headers = HeaderMap::new();
        headers.insert(header(), HeaderValue::from_static("42"));
        assert_eq!(user_id(&headers, &header()).unwrap(), "42");
    }

    #[test]
    fn guard_id_must_be_uuid() {
        assert!(validate_guard_id("9296522e-cbd1-45ec-bbc9-1e6c1134bd73").is_ok());
        assert!(matches!(
            validate_guard_id("not-a-uuid"),
            Err(ApiError::Validation(_))
        ));
    }
}
