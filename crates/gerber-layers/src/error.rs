use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayerError {
    #[error("unsupported archive: {0}")]
    UnsupportedArchive(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("render error: {0}")]
    Render(String),
}
