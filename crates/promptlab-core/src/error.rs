use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("No pairs found in {}. Run `promptlab export` first.", path.display())]
    NoPairs { path: PathBuf },

    #[error("No assistant messages with token data found under {}", path.display())]
    NoUsage { path: PathBuf },

    #[error("invalid chunk limits: max_pairs must be at least 1")]
    InvalidLimits,
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
