//! refmenu: the `[[` reference-menu engine for block-based editors.
//!
//! Embeds into a host editor as a state machine: feed it keystrokes and
//! selection state, drain its [`session::SessionMessage`] channel through
//! your event loop, and render the [`session::PopupState`] snapshot however
//! you like. The engine handles trigger detection, incremental search,
//! create-then-insert, and the generation-token bookkeeping that keeps late
//! async completions from stomping a session the user already left.

pub mod config;
pub mod document;
pub mod error;
pub mod session;
pub mod store;
pub mod surface;

pub use config::{ArrowKeyPolicy, EngineConfig};
pub use document::{
    Block, BlockDescriptor, BlockId, BlockType, Inline, RefKind, Reference, RichText, Span,
    REF_CHAR,
};
pub use error::{RefMenuError, Result};
pub use session::{
    Anchor, PopupState, QueryEngine, ResultId, SearchResult, SessionEngine, SessionMessage,
    SessionPhase, StoreQuery,
};
pub use store::{DocumentStore, MemoryStore};
pub use surface::{CaretRect, Selection, SelectionKind, TextSurface};
