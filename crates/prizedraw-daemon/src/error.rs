//! Error types for the HTTP layer.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use prizedraw_core::error::DrawError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Errors returned by HTTP handlers.
///
/// Domain rejections keep their kind so the UI can decide whether to
/// re-propose; storage and internal failures are reported generically.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A draw operation was rejected or failed.
    #[error(transparent)]
    Draw(#[from] DrawError),

    /// Internal error (should not occur in normal operation).
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    detail: String,
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    ///
    /// - Empty pool, exhausted prizes, unavailable override: 400 Bad Request
    /// - Duplicate winner, duplicate absence, lost tier race: 409 Conflict
    /// - Unknown participant: 404 Not Found
    /// - Storage and internal failures: 500 Internal Server Error
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Draw(
                DrawError::PoolExhausted
                | DrawError::NoEligibleParticipants { .. }
                | DrawError::OverrideParticipantUnavailable { .. },
            ) => StatusCode::BAD_REQUEST,
            Self::Draw(
                DrawError::DuplicateWinner { .. }
                | DrawError::AlreadyAbsent { .. }
                | DrawError::TierExhausted { .. }
                | DrawError::TierOutOfOrder { .. },
            ) => StatusCode::CONFLICT,
            Self::Draw(DrawError::UnknownParticipant { .. }) => StatusCode::NOT_FOUND,
            Self::Draw(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Draw(err) => err.kind(),
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Storage details stay in the log, never in the response.
        let detail = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "internal server error".to_string()
        } else {
            warn!(kind = self.kind(), error = %self, "Request rejected");
            self.to_string()
        };

        let body = ErrorBody {
            error: self.kind(),
            detail,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use prizedraw_core::store::StoreError;
    use prizedraw_core::tier::PrizeTier;

    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError::from(DrawError::PoolExhausted).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DrawError::NoEligibleParticipants { draw_index: 3 }).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DrawError::OverrideParticipantUnavailable {
                participant_id: 57,
                draw_index: 34
            })
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DrawError::DuplicateWinner { participant_id: 1 }).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(DrawError::TierExhausted {
                tier: PrizeTier::Big
            })
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(DrawError::UnknownParticipant { participant_id: 9 }).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DrawError::Storage(StoreError::LockPoisoned)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_errors_do_not_leak_details() {
        let err = ApiError::from(DrawError::Storage(StoreError::CorruptState(
            "secret table layout".into(),
        )));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
