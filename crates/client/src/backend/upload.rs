use std::path::{Path, PathBuf};

use paper_core::chat::{UploadError, Uploaded};

/// The single accepted media type for document uploads.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

const GENERIC_FAILURE: &str = "Upload failed";

/// A locally selected file together with its declared media type and byte
/// size: the caller-visible handle for one upload.
#[derive(Clone, Debug)]
pub struct PdfFile {
    pub path: PathBuf,
    pub media_type: String,
    pub size: u64,
}

impl PdfFile {
    /// Build a handle from a path. The declared type comes from the file
    /// extension, the way a file picker reports it; the bytes themselves
    /// are not inspected.
    pub fn from_path<P: Into<PathBuf>>(path: P) -> std::io::Result<Self> {
        let path = path.into();
        let size = std::fs::metadata(&path)?.len();
        let media_type = media_type_for(&path).to_string();
        Ok(Self {
            path,
            media_type,
            size,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string())
    }
}

fn media_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => PDF_MEDIA_TYPE,
        Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
        Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") => {
            "image/jpeg"
        }
        Some(ext) if ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("md") => {
            "text/plain"
        }
        _ => "application/octet-stream",
    }
}

/// Reject anything that is not declared as a PDF. Runs before any I/O.
pub fn validate(file: &PdfFile) -> Result<(), UploadError> {
    if file.media_type != PDF_MEDIA_TYPE {
        return Err(UploadError::InvalidType(file.media_type.clone()));
    }
    Ok(())
}

pub(crate) fn parse_uploaded(body: &str) -> Result<Uploaded, UploadError> {
    serde_json::from_str::<Uploaded>(body)
        .map_err(|e| UploadError::Server(format!("unexpected response: {}", e)))
}

/// Failure message for a non-2xx upload response: the service's `{error}`
/// field when present, a generic message otherwise.
pub(crate) fn server_message(body: &str) -> String {
    crate::backend::client::server_error_message(body)
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_maps_to_the_pdf_media_type() {
        assert_eq!(media_type_for(Path::new("policy.pdf")), PDF_MEDIA_TYPE);
        assert_eq!(media_type_for(Path::new("POLICY.PDF")), PDF_MEDIA_TYPE);
        assert_eq!(media_type_for(Path::new("shot.png")), "image/png");
        assert_eq!(
            media_type_for(Path::new("noext")),
            "application/octet-stream"
        );
    }

    #[test]
    fn validation_rejects_non_pdf_declared_types() {
        let file = PdfFile {
            path: "shot.png".into(),
            media_type: "image/png".into(),
            size: 1,
        };
        assert!(matches!(
            validate(&file),
            Err(UploadError::InvalidType(t)) if t == "image/png"
        ));
    }

    #[test]
    fn validation_accepts_a_declared_pdf() {
        let file = PdfFile {
            path: "policy.pdf".into(),
            media_type: PDF_MEDIA_TYPE.into(),
            size: 1,
        };
        assert!(validate(&file).is_ok());
    }

    #[test]
    fn uploaded_response_requires_a_filename() {
        let up = parse_uploaded("{\"filename\":\"policy.pdf\",\"chunks\":12}").unwrap();
        assert_eq!(up.filename, "policy.pdf");
        assert!(parse_uploaded("{}").is_err());
    }

    #[test]
    fn server_message_prefers_the_error_field() {
        assert_eq!(server_message("{\"error\":\"file too large\"}"), "file too large");
        assert_eq!(server_message("{\"status\":\"bad\"}"), GENERIC_FAILURE);
        assert_eq!(server_message(""), GENERIC_FAILURE);
    }
}
