//! Image uploads to the backend's object storage.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use backend_sdk::ObjectStorage;
use bytes::Bytes;
use console_security::{ActivityType, SessionContext};
use marketplace_admin_sdk::AccessApi;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::UploadsConfig;
use crate::domain::access::AccessResolver;
use crate::domain::error::DomainError;

pub const PARTNER_IMAGES_BUCKET: &str = "partner-images";

/// What an uploaded image is attached to; selects the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    Activity(ActivityType),
    PartnerLogo,
}

impl UploadTarget {
    #[must_use]
    pub const fn bucket(self) -> &'static str {
        match self {
            Self::Activity(t) => t.image_bucket(),
            Self::PartnerLogo => PARTNER_IMAGES_BUCKET,
        }
    }
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activity(t) => fmt::Display::fmt(t, f),
            Self::PartnerLogo => f.write_str("partner"),
        }
    }
}

impl FromStr for UploadTarget {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "partner" || s == "partners" {
            return Ok(Self::PartnerLogo);
        }
        s.parse()
            .map(Self::Activity)
            .map_err(|e| DomainError::NotFound(e.to_string()))
    }
}

/// Image uploads, gated like the activity forms they belong to.
///
/// Partner logos are open to every admin, since a partner admin uploads one
/// before owning any partner.
pub struct ImageUploads {
    storage: Arc<dyn ObjectStorage>,
    access: Arc<AccessResolver>,
    config: UploadsConfig,
}

impl ImageUploads {
    #[must_use]
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        access: Arc<AccessResolver>,
        config: UploadsConfig,
    ) -> Self {
        Self {
            storage,
            access,
            config,
        }
    }

    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        self.config.max_upload_bytes
    }

    /// Store `body` under `<principal-id>/<uuid>.<ext>` in the target's
    /// bucket and return its public URL.
    ///
    /// # Errors
    /// `Forbidden` for an activity type the caller has no row of.
    /// `Validation` for an empty or oversized body and for content types
    /// outside the allow-list. Nothing is sent in either case.
    #[instrument(skip(self, ctx, body), fields(principal_id = %ctx.principal_id(), size = body.len()))]
    pub async fn upload(
        &self,
        ctx: &SessionContext,
        target: UploadTarget,
        file_name: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, DomainError> {
        if let UploadTarget::Activity(activity_type) = target
            && !self.access.has_access_to_activity_type(ctx, activity_type).await
        {
            return Err(DomainError::Forbidden(format!(
                "no {activity_type} is accessible"
            )));
        }

        let content_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !self
            .config
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&content_type))
        {
            return Err(DomainError::validation(
                "content_type",
                format!("{content_type:?} is not an accepted image type"),
            ));
        }
        if body.is_empty() {
            return Err(DomainError::validation("file", "is empty"));
        }
        if body.len() > self.config.max_upload_bytes {
            return Err(DomainError::validation(
                "file",
                format!("exceeds {} bytes", self.config.max_upload_bytes),
            ));
        }

        let path = format!(
            "{}/{}.{}",
            ctx.principal_id(),
            Uuid::new_v4(),
            extension(file_name, &content_type)
        );
        let url = self
            .storage
            .upload(
                target.bucket(),
                &path,
                &content_type,
                body,
                Some(ctx.access_token()),
            )
            .await
            .map_err(|e| DomainError::backend(format!("upload {target} image"), e))?;
        info!(bucket = target.bucket(), %path, "image uploaded");
        Ok(url)
    }
}

/// Extension of `file_name` when it has a short alphanumeric one, else
/// derived from the content type.
fn extension(file_name: &str, content_type: &str) -> String {
    if let Some((_, ext)) = file_name.rsplit_once('.')
        && (1..=5).contains(&ext.len())
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return ext.to_ascii_lowercase();
    }
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
    .to_owned()
}
