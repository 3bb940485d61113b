use thiserror::Error;

/// Errors returned by index construction and writer operations.
///
/// Every variant is raised before the failing operation publishes anything,
/// so the graph is left exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HnswError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Document {0} is already present in the graph")]
    DocumentAlreadyPresent(u32),

    #[error("Document {0} is not present in the graph")]
    DocumentNotPresent(u32),

    #[error("No vector available for document {0}")]
    MissingVector(u32),
}

pub type Result<T> = std::result::Result<T, HnswError>;
