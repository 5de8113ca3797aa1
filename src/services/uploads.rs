// src/services/uploads.rs

use crate::common::error::AppError;

const MB: usize = 1024 * 1024;

const IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Onde o arquivo vai parar; cada destino tem seu limite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Anexo do chamado
    Attachment,
    /// Imagem colada no chat do chamado
    CommentImage,
}

impl UploadKind {
    pub fn max_bytes(self) -> usize {
        match self {
            UploadKind::Attachment => 10 * MB,
            UploadKind::CommentImage => 5 * MB,
        }
    }
}

/// Valida tamanho e tipo antes de qualquer acesso ao banco.
/// O tipo vem do cliente; parâmetros como `; charset=...` são ignorados.
pub fn validate_upload(kind: UploadKind, content_type: &str, size: usize) -> Result<(), AppError> {
    if size == 0 {
        return Err(AppError::EmptyFile);
    }
    if size > kind.max_bytes() {
        return Err(AppError::FileTooLarge { max_bytes: kind.max_bytes() });
    }

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if !IMAGE_TYPES.contains(&essence.as_str()) {
        return Err(AppError::UnsupportedFileType(essence));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_images_within_limit() {
        assert!(validate_upload(UploadKind::Attachment, "image/png", 1024).is_ok());
        assert!(validate_upload(UploadKind::CommentImage, "IMAGE/JPEG; q=1", 5 * MB).is_ok());
    }

    #[test]
    fn test_rejects_empty_file() {
        assert!(matches!(
            validate_upload(UploadKind::Attachment, "image/png", 0),
            Err(AppError::EmptyFile)
        ));
    }

    #[test]
    fn test_limits_differ_per_kind() {
        let size = 6 * MB;
        assert!(validate_upload(UploadKind::Attachment, "image/webp", size).is_ok());
        match validate_upload(UploadKind::CommentImage, "image/webp", size) {
            Err(AppError::FileTooLarge { max_bytes }) => assert_eq!(max_bytes, 5 * MB),
            other => panic!("esperava FileTooLarge, veio {:?}", other),
        }
        assert!(matches!(
            validate_upload(UploadKind::Attachment, "image/png", 10 * MB + 1),
            Err(AppError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_rejects_non_images() {
        match validate_upload(UploadKind::Attachment, "application/pdf", 10) {
            Err(AppError::UnsupportedFileType(t)) => assert_eq!(t, "application/pdf"),
            other => panic!("esperava UnsupportedFileType, veio {:?}", other),
        }
        assert!(validate_upload(UploadKind::Attachment, "image/svg+xml", 10).is_err());
    }
}
