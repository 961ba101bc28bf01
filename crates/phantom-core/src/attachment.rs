//! Attachment codec: turns user-supplied image bytes into transport-ready base64.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use crate::error::{PhantomError, Result};
use crate::types::{Attachment, AttachmentKind};

impl Attachment {
    /// Encode raw image bytes.
    ///
    /// Rejects empty payloads and MIME types outside `image/*`.
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Result<Self> {
        if bytes.is_empty() {
            return Err(PhantomError::Attachment("image payload is empty".to_string()));
        }
        validate_mime(mime_type)?;
        Ok(Self {
            kind: AttachmentKind::Image,
            encoded_data: BASE64_STANDARD.encode(bytes),
            mime_type: mime_type.to_string(),
        })
    }

    /// Parse a `data:<mime>;base64,<payload>` URL. The payload must decode.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| PhantomError::Attachment("not a data URL".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| PhantomError::Attachment("data URL has no payload".to_string()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| PhantomError::Attachment("data URL is not base64".to_string()))?;
        validate_mime(mime_type)?;
        if payload.is_empty() {
            return Err(PhantomError::Attachment("image payload is empty".to_string()));
        }
        let attachment = Self {
            kind: AttachmentKind::Image,
            encoded_data: payload.to_string(),
            mime_type: mime_type.to_string(),
        };
        attachment.decode()?;
        Ok(attachment)
    }

    /// Read and encode an image file, inferring its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mime_type = mime_type_for_path(path).ok_or_else(|| {
            PhantomError::Attachment(format!("unsupported image type: {}", path.display()))
        })?;
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, mime_type)
    }

    /// The bare base64 payload with any `data:...,` prefix removed.
    pub fn payload(&self) -> &str {
        match self.encoded_data.split_once(',') {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => &self.encoded_data,
        }
    }

    /// Decode the payload back into bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        BASE64_STANDARD
            .decode(self.payload())
            .map_err(|e| PhantomError::Attachment(format!("invalid base64 payload: {}", e)))
    }
}

/// Infer an image MIME type from a file extension.
pub fn mime_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

fn validate_mime(mime_type: &str) -> Result<()> {
    match mime_type.strip_prefix("image/") {
        Some(subtype) if !subtype.is_empty() => Ok(()),
        _ => Err(PhantomError::Attachment(format!(
            "unsupported mime type: {}",
            mime_type
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_bytes_encodes_base64() {
        let att = Attachment::from_bytes(b"hello", "image/png").unwrap();
        assert_eq!(att.kind, AttachmentKind::Image);
        assert_eq!(att.encoded_data, "aGVsbG8=");
        assert_eq!(att.mime_type, "image/png");
    }

    #[test]
    fn test_from_bytes_rejects_empty() {
        let err = Attachment::from_bytes(&[], "image/png").unwrap_err();
        assert!(matches!(err, PhantomError::Attachment(_)));
    }

    #[test]
    fn test_from_bytes_rejects_non_image_mime() {
        assert!(Attachment::from_bytes(b"x", "application/pdf").is_err());
        assert!(Attachment::from_bytes(b"x", "image/").is_err());
    }

    #[test]
    fn test_from_data_url() {
        let att = Attachment::from_data_url("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(att.mime_type, "image/jpeg");
        assert_eq!(att.encoded_data, "aGVsbG8=");
    }

    #[test]
    fn test_from_data_url_rejects_malformed() {
        assert!(Attachment::from_data_url("image/png;base64,abc").is_err());
        assert!(Attachment::from_data_url("data:image/png;base64").is_err());
        assert!(Attachment::from_data_url("data:image/png,abc").is_err());
        assert!(Attachment::from_data_url("data:image/png;base64,").is_err());
    }

    #[test]
    fn test_from_data_url_rejects_undecodable_payload() {
        let err = Attachment::from_data_url("data:image/png;base64,@@not base64@@").unwrap_err();
        assert!(err.to_string().contains("invalid base64"));
    }

    #[test]
    fn test_payload_strips_data_url_prefix() {
        let att = Attachment {
            kind: AttachmentKind::Image,
            encoded_data: "data:image/png;base64,aGVsbG8=".to_string(),
            mime_type: "image/png".to_string(),
        };
        assert_eq!(att.payload(), "aGVsbG8=");
        assert_eq!(att.decode().unwrap(), b"hello");
    }

    #[test]
    fn test_payload_without_prefix_is_unchanged() {
        let att = Attachment::from_bytes(b"hello", "image/png").unwrap();
        assert_eq!(att.payload(), "aGVsbG8=");
    }

    #[test]
    fn test_mime_type_for_path() {
        assert_eq!(mime_type_for_path(Path::new("rx.PNG")), Some("image/png"));
        assert_eq!(mime_type_for_path(Path::new("a/b.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_type_for_path(Path::new("scan.jpg")), Some("image/jpeg"));
        assert_eq!(mime_type_for_path(Path::new("x.webp")), Some("image/webp"));
        assert_eq!(mime_type_for_path(Path::new("notes.txt")), None);
        assert_eq!(mime_type_for_path(Path::new("noext")), None);
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.png");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"\x89PNG").unwrap();

        let att = Attachment::from_path(&path).unwrap();
        assert_eq!(att.mime_type, "image/png");
        assert_eq!(att.decode().unwrap(), b"\x89PNG");
    }

    #[test]
    fn test_from_path_unsupported_extension() {
        let err = Attachment::from_path(Path::new("report.pdf")).unwrap_err();
        assert!(err.to_string().contains("unsupported image type"));
    }
}
