use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("encoding state: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("backend rejected write: {0}")]
    Rejected(String),
    #[error("persisting {key}: {source}")]
    Persist {
        key: String,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    pub(crate) fn persist(key: &str, source: StoreError) -> Self {
        StoreError::Persist {
            key: key.to_string(),
            source: Box::new(source),
        }
    }
}
