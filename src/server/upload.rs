use super::error::ApiError;
use axum::extract::multipart::{Multipart, MultipartError};

/// An uploaded drawing with its data.
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Pull the `file` field out of a multipart upload.
///
/// Unknown fields are drained and ignored. Classification of the bytes is
/// left to the loading pipeline.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<UploadedFile, ApiError> {
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(rejected)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await.map_err(rejected)?.to_vec();
                file = Some(UploadedFile { filename, data });
            }
            _ => {
                let _ = field.bytes().await;
            }
        }
    }

    file.ok_or_else(|| ApiError::BadRequest("No file uploaded (expected form field 'file')".into()))
}

fn rejected(e: MultipartError) -> ApiError {
    ApiError::Rejected {
        status: e.status(),
        message: format!("Failed to read upload: {}", e.body_text()),
    }
}
