use thiserror::Error;

use crate::document::BlockId;

#[derive(Debug, Error)]
pub enum RefMenuError {
    /// The session's anchor block was deleted or its offset no longer fits.
    /// Forces cancellation; never shown to the user as an error.
    #[error("anchor invalid in block {0}")]
    InvalidAnchor(BlockId),

    /// An async completion arrived for a generation that is no longer
    /// current. Discarded; logged at debug level only.
    #[error("stale completion for generation {got} (current {current})")]
    StaleCommit { got: u64, current: u64 },

    /// The document store rejected the replace-and-insert. Recoverable: the
    /// typed text is preserved and the session resets.
    #[error("document mutation rejected: {0}")]
    MutationFailure(String),

    /// New-page creation failed. The session stays armed so the user can
    /// retry; no reference was inserted.
    #[error("block creation failed: {0}")]
    CreateBlockFailure(String),

    #[error("unknown block {0}")]
    BlockNotFound(BlockId),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RefMenuError>;
