use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::download::DownloadError;

/// Errors a handler can return before the response body starts.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Download(#[from] DownloadError),
    /// A remote listing call failed.
    #[error("upstream listing failed: {0:#}")]
    Upstream(anyhow::Error),
    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Download(DownloadError::EmptySelection) => StatusCode::BAD_REQUEST,
            AppError::Download(DownloadError::Listing { .. }) | AppError::Upstream(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(err = %self, "request failed");
        } else {
            warn!(err = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn maps_errors_to_status() {
        assert_eq!(
            AppError::from(DownloadError::EmptySelection).status(),
            StatusCode::BAD_REQUEST
        );
        let listing = DownloadError::Listing {
            course_id: "c1".into(),
            cause: anyhow!("403 Forbidden"),
        };
        assert_eq!(AppError::from(listing).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            AppError::Internal(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn listing_error_message_names_course() {
        let err = AppError::from(DownloadError::Listing {
            course_id: "c9".into(),
            cause: anyhow!("classroom error 404 Not Found"),
        });
        let msg = err.to_string();
        assert!(msg.contains("c9"));
        assert!(msg.contains("404"));
    }
}
