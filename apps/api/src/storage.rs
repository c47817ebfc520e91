use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use crate::errors::AppError;

/// Uploads an object to the configured bucket.
pub async fn put_object(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    body: impl Into<Bytes>,
    content_type: &str,
) -> Result<(), AppError> {
    s3.put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(body.into()))
        .content_type(content_type)
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("S3 upload of {key} failed: {e}")))?;

    info!("Uploaded s3://{bucket}/{key}");
    Ok(())
}

pub fn resume_key(user_id: uuid::Uuid, upload_id: uuid::Uuid) -> String {
    format!("resumes/{user_id}/{upload_id}.pdf")
}

pub fn export_key(user_id: uuid::Uuid, at: chrono::DateTime<chrono::Utc>) -> String {
    format!("exports/{}/{}.json", user_id, at.format("%Y%m%dT%H%M%SZ"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn test_export_key_format() {
        let user_id = Uuid::nil();
        let at = chrono::Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(
            export_key(user_id, at),
            "exports/00000000-0000-0000-0000-000000000000/20260304T050607Z.json"
        );
    }

    #[test]
    fn test_resume_key_is_scoped_to_user() {
        let user_id = Uuid::new_v4();
        let key = resume_key(user_id, Uuid::new_v4());
        assert!(key.starts_with(&format!("resumes/{user_id}/")));
        assert!(key.ends_with(".pdf"));
    }
}
