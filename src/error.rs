use std::fmt;

/// Failures at the edges of the editor: browser APIs, payload decoding and
/// the submission transport. Editing itself never fails.
#[derive(Debug)]
pub enum EditorError {
    /// Session storage could not be reached or refused a write.
    StorageUnavailable(String),
    /// The table payload handed over by the page did not decode.
    InvalidTable(String),
    /// A DOM element the editor relies on is missing.
    MissingElement(String),
    /// Building or encoding the submission payload failed.
    Payload(String),
    /// The request never produced a response.
    Transport(String),
    /// The service answered with a non-success status.
    Rejected { status: u16 },
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorError::StorageUnavailable(msg) => write!(f, "Session storage unavailable: {}", msg),
            EditorError::InvalidTable(msg) => write!(f, "Invalid line table: {}", msg),
            EditorError::MissingElement(id) => write!(f, "Element '{}' not found", id),
            EditorError::Payload(msg) => write!(f, "Could not build submission payload: {}", msg),
            EditorError::Transport(msg) => write!(f, "Submission failed: {}", msg),
            EditorError::Rejected { status } => {
                write!(f, "Submission rejected by server (HTTP {})", status)
            }
        }
    }
}

impl std::error::Error for EditorError {}

impl From<serde_json::Error> for EditorError {
    fn from(e: serde_json::Error) -> Self {
        EditorError::Payload(e.to_string())
    }
}
