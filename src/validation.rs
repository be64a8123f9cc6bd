//! Inbound request validation
//!
//! Runs before any fetch or browser work; a rejected request never reaches
//! the pipeline.

use thiserror::Error;

use crate::analysis::AnalysisRequest;

pub const MIN_COPY_CHARS: usize = 50;
pub const MAX_COPY_CHARS: usize = 10_000;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Provide copy text, images or website URLs to analyze")]
    EmptyRequest,

    #[error("Copy must have at least {MIN_COPY_CHARS} characters. Current: {0}")]
    CopyTooShort(usize),

    #[error("Copy cannot exceed {MAX_COPY_CHARS} characters. Current: {0}")]
    CopyTooLong(usize),

    #[error("Image '{0}' is not an image type")]
    NotAnImage(String),

    #[error("Image '{name}' is {size} bytes, limit is {MAX_IMAGE_BYTES}")]
    ImageTooLarge { name: String, size: usize },

    #[error("Image '{0}' is not valid base64")]
    InvalidImageData(String),

    #[error("Invalid website URL: {0}")]
    InvalidUrl(String),
}

/// Check every inbound constraint, reporting the first violation.
///
/// The minimum length applies to the trimmed copy, the maximum to the raw
/// text, matching how the web form counted characters.
pub fn validate_request(request: &AnalysisRequest) -> Result<(), ValidationError> {
    let copy = request.copy();

    if copy.is_none() && request.user_images.is_empty() && request.website_requests.is_empty() {
        return Err(ValidationError::EmptyRequest);
    }

    if let Some(raw) = request.copy_text.as_deref() {
        let trimmed = raw.trim().chars().count();
        if trimmed > 0 && trimmed < MIN_COPY_CHARS {
            return Err(ValidationError::CopyTooShort(trimmed));
        }
        let total = raw.chars().count();
        if total > MAX_COPY_CHARS {
            return Err(ValidationError::CopyTooLong(total));
        }
    }

    for image in &request.user_images {
        let is_image = image
            .resolved_mime_type()
            .is_some_and(|mime| mime.starts_with("image/"));
        if !is_image {
            return Err(ValidationError::NotAnImage(image.name.clone()));
        }

        let size = image
            .decoded_len()
            .ok_or_else(|| ValidationError::InvalidImageData(image.name.clone()))?;
        if size > MAX_IMAGE_BYTES {
            return Err(ValidationError::ImageTooLarge {
                name: image.name.clone(),
                size,
            });
        }
    }

    for website in &request.website_requests {
        match url::Url::parse(&website.url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(ValidationError::InvalidUrl(website.url.clone())),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{UserImage, WebsiteRequest};

    fn copy_request(len: usize) -> AnalysisRequest {
        AnalysisRequest {
            copy_text: Some("a".repeat(len)),
            ..Default::default()
        }
    }

    #[test]
    fn empty_request_is_rejected() {
        assert_eq!(
            validate_request(&AnalysisRequest::default()),
            Err(ValidationError::EmptyRequest)
        );

        let blank = AnalysisRequest {
            copy_text: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(validate_request(&blank), Err(ValidationError::EmptyRequest));
    }

    #[test]
    fn copy_length_boundaries() {
        assert_eq!(
            validate_request(&copy_request(49)),
            Err(ValidationError::CopyTooShort(49))
        );
        assert_eq!(validate_request(&copy_request(50)), Ok(()));
        assert_eq!(validate_request(&copy_request(10_000)), Ok(()));
        assert_eq!(
            validate_request(&copy_request(10_001)),
            Err(ValidationError::CopyTooLong(10_001))
        );
    }

    #[test]
    fn minimum_counts_trimmed_characters() {
        let padded = AnalysisRequest {
            copy_text: Some(format!("   {}   ", "b".repeat(49))),
            ..Default::default()
        };
        assert_eq!(validate_request(&padded), Err(ValidationError::CopyTooShort(49)));
    }

    #[test]
    fn images_must_be_images_within_limit() {
        let pdf = AnalysisRequest {
            user_images: vec![UserImage {
                name: "doc.pdf".into(),
                data: "data:application/pdf;base64,aGVsbG8=".into(),
                mime_type: None,
            }],
            ..Default::default()
        };
        assert_eq!(
            validate_request(&pdf),
            Err(ValidationError::NotAnImage("doc.pdf".into()))
        );

        let ok = AnalysisRequest {
            user_images: vec![UserImage {
                name: "hero.png".into(),
                data: "data:image/png;base64,aGVsbG8=".into(),
                mime_type: None,
            }],
            ..Default::default()
        };
        assert_eq!(validate_request(&ok), Ok(()));

        let garbage = AnalysisRequest {
            user_images: vec![UserImage {
                name: "bad.png".into(),
                data: "data:image/png;base64,!!!".into(),
                mime_type: None,
            }],
            ..Default::default()
        };
        assert_eq!(
            validate_request(&garbage),
            Err(ValidationError::InvalidImageData("bad.png".into()))
        );
    }

    #[test]
    fn website_only_request_needs_http_url() {
        let ok = AnalysisRequest {
            website_requests: vec![WebsiteRequest::new("https://example.com")],
            ..Default::default()
        };
        assert_eq!(validate_request(&ok), Ok(()));

        let bad = AnalysisRequest {
            website_requests: vec![WebsiteRequest::new("ftp://example.com")],
            ..Default::default()
        };
        assert!(matches!(validate_request(&bad), Err(ValidationError::InvalidUrl(_))));
    }
}
