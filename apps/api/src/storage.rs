//! Object storage for uploaded resume files.
//!
//! Keys are namespaced by owner (`anonymous` for unauthenticated uploads)
//! plus an upload timestamp so concurrent uploads never collide.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tracing::info;
use uuid::Uuid;

use crate::document::FileType;
use crate::errors::AppError;

/// Builds the storage key for an uploaded resume:
/// `resumes/{user_id|anonymous}/{millis}_{filename}`.
pub fn resume_key(user_id: Option<Uuid>, filename: &str) -> String {
    let owner = user_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "anonymous".to_string());
    let millis = chrono::Utc::now().timestamp_millis();
    format!("resumes/{owner}/{millis}_{filename}")
}

/// Uploads resume bytes and returns the stored key.
pub async fn upload_resume(
    s3: &S3Client,
    bucket: &str,
    key: &str,
    bytes: Vec<u8>,
    file_type: FileType,
) -> Result<String, AppError> {
    let content_type = match file_type {
        FileType::Pdf => "application/pdf",
        FileType::Docx => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
    };

    s3.put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(bytes))
        .content_type(content_type)
        .send()
        .await
        .map_err(|e| AppError::S3(format!("upload of {key} failed: {e}")))?;

    info!("Uploaded resume to s3://{bucket}/{key}");
    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_key_namespaces_by_user() {
        let user = Uuid::new_v4();
        let key = resume_key(Some(user), "resume.pdf");
        assert!(key.starts_with(&format!("resumes/{user}/")));
        assert!(key.ends_with("_resume.pdf"));
    }

    #[test]
    fn test_resume_key_anonymous_namespace() {
        let key = resume_key(None, "cv.docx");
        assert!(key.starts_with("resumes/anonymous/"));
        assert!(key.ends_with("_cv.docx"));
    }

    #[test]
    fn test_resume_keys_do_not_collide_across_owners() {
        let a = resume_key(Some(Uuid::new_v4()), "resume.pdf");
        let b = resume_key(Some(Uuid::new_v4()), "resume.pdf");
        assert_ne!(a, b);
    }
}
