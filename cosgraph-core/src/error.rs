use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("External file error ({}): {source}", path.display())]
    ExternalFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Structural violation: {0}")]
    StructuralViolation(String),

    #[error("Object {number} cannot be reused: generation {generation} is exhausted")]
    UnreusableSlot { number: u32, generation: u16 },

    #[error("Invalid object reference: {0} {1} R")]
    InvalidReference(u32, u16),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Unsupported stream filter: {0}")]
    UnsupportedFilter(String),

    #[error("Parse error at position {position}: {message}")]
    ParseError { position: usize, message: String },

    #[error("Invalid xref: {0}")]
    InvalidXRef(String),
}

impl PdfError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        PdfError::ParseError {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn structural(message: impl Into<String>) -> Self {
        PdfError::StructuralViolation(message.into())
    }

    pub(crate) fn external(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PdfError::ExternalFile {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_pdf_error_display() {
        let error = PdfError::StructuralViolation("cannot clone ObjStm".to_string());
        assert_eq!(error.to_string(), "Structural violation: cannot clone ObjStm");
    }

    #[test]
    fn test_pdf_error_from_io_error() {
        let io_error = IoError::new(ErrorKind::NotFound, "file not found");
        let pdf_error = PdfError::from(io_error);

        match pdf_error {
            PdfError::Io(ref err) => assert_eq!(err.kind(), ErrorKind::NotFound),
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_external_file_error_keeps_path_and_source() {
        let error = PdfError::external(
            "/tmp/body.bin",
            IoError::new(ErrorKind::PermissionDenied, "denied"),
        );

        let msg = error.to_string();
        assert!(msg.contains("/tmp/body.bin"));
        assert!(msg.contains("denied"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_error_chain_display() {
        let errors = [
            (
                "Object 7 cannot be reused: generation 65535 is exhausted",
                PdfError::UnreusableSlot {
                    number: 7,
                    generation: 65535,
                },
            ),
            (
                "Invalid object reference: 999 0 R",
                PdfError::InvalidReference(999, 0),
            ),
            (
                "Type mismatch: expected Integer, found Name",
                PdfError::TypeMismatch {
                    expected: "Integer",
                    found: "Name",
                },
            ),
            (
                "Index 4 out of range for array of length 2",
                PdfError::IndexOutOfRange { index: 4, len: 2 },
            ),
            (
                "Unsupported stream filter: FlateDecode",
                PdfError::UnsupportedFilter("FlateDecode".to_string()),
            ),
            (
                "Parse error at position 12: unexpected token",
                PdfError::parse(12, "unexpected token"),
            ),
        ];

        for (expected, error) in errors {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PdfError>();
    }
}
