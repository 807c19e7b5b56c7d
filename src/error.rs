use thiserror::Error;

/// Failures while loading a face. Once a face exists, queries never fail.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to parse font file: {0}")]
    Parse(#[from] ttf_parser::FaceParsingError),

    #[error("face index {index} is out of range for a collection of {count} faces")]
    InvalidFaceIndex { index: u32, count: u32 },

    #[error("failed to parse AFM data: {0}")]
    Afm(String),

    #[error("invalid bitmap face description: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<pom::Error> for Error {
    fn from(error: pom::Error) -> Self {
        Error::Afm(error.to_string())
    }
}
