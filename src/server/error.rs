//! HTTP error responses.

use crate::error::HekwerkError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Hekwerk(#[from] HekwerkError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// An extractor rejection that already carries its own status.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Hekwerk(e) => status_for(e),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Rejected { status, .. } => *status,
        }
    }
}

fn status_for(err: &HekwerkError) -> StatusCode {
    use HekwerkError::*;
    match err {
        EmptyUpload { .. } | InvalidConfig(_) => StatusCode::BAD_REQUEST,
        DocumentNotFound { .. } | PageOutOfRange { .. } | FileNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        NothingToExport => StatusCode::CONFLICT,
        UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        UnsupportedFileType { .. } | NotAPdf { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ImageDecode { .. }
        | CorruptPdf { .. }
        | PasswordRequired { .. }
        | WrongPassword { .. }
        | EmptyDocument { .. }
        | InvalidScale(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RendererUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ReadFailed { .. }
        | RasterisationFailed { .. }
        | EncodeFailed { .. }
        | Csv(_)
        | OutputWriteFailed { .. }
        | Server { .. }
        | Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!("Request failed: {}", self);
            "Internal error".to_string()
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
            self.to_string()
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_library_errors_to_status() {
        let cases = [
            (
                HekwerkError::DocumentNotFound { id: "x".into() },
                StatusCode::NOT_FOUND,
            ),
            (HekwerkError::NothingToExport, StatusCode::CONFLICT),
            (
                HekwerkError::UploadTooLarge { size: 2, limit: 1 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                HekwerkError::UnsupportedFileType {
                    filename: "a.txt".into(),
                },
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                HekwerkError::InvalidScale("0".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                HekwerkError::RendererUnavailable("missing".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                HekwerkError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let resp = ApiError::from(HekwerkError::Internal("secret path".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
