use crate::document::{Block, BlockDescriptor, Reference};
use crate::surface::CaretRect;

use super::anchor::Anchor;
use super::query::SearchResult;

/// One open trigger-search session. Exactly one exists per engine; arming a
/// new one supersedes the old by minting a fresh generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Monotonic token disambiguating async completions from sessions the
    /// user has since cancelled or replaced.
    pub generation: u64,
    pub anchor: Anchor,
    pub query_text: String,
    pub visible: bool,
    /// Caret rect captured once at arm time; the popup's anchor point.
    pub anchor_rect: CaretRect,
    pub results: Vec<SearchResult>,
    /// Bumped per issued query so a newer query supersedes an older one
    /// within the same generation.
    pub query_seq: u64,
    pub pending_create: Option<PendingCreate>,
}

impl Session {
    pub fn new(generation: u64, anchor: Anchor, anchor_rect: CaretRect) -> Self {
        Self {
            generation,
            anchor,
            query_text: String::new(),
            visible: true,
            anchor_rect,
            results: Vec::new(),
            query_seq: 0,
            pending_create: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateKind {
    Page,
    SubPage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingCreate {
    pub kind: CreateKind,
    pub title: String,
}

/// Session lifecycle. `Cancelled` from the lifecycle diagram is transient
/// and collapses straight into `Idle` here.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    /// Session open, user editing the query.
    Armed(Session),
    /// Insertion (optionally preceded by block creation) in flight.
    Committing(Session),
}

impl SessionPhase {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionPhase::Idle => None,
            SessionPhase::Armed(s) | SessionPhase::Committing(s) => Some(s),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionPhase::Idle)
    }
}

/// Async completions funneled back to the engine through the host's message
/// loop. Every variant carries the generation it was spawned under.
#[derive(Debug)]
pub enum SessionMessage {
    QueryResolved {
        generation: u64,
        seq: u64,
        results: Vec<BlockDescriptor>,
    },
    CreateResolved {
        generation: u64,
        outcome: std::result::Result<Block, String>,
    },
    CommitResolved {
        generation: u64,
        outcome: std::result::Result<Reference, String>,
    },
}

/// Snapshot handed to the presentation coordinator. Rendering is external;
/// this is everything it needs to position and fill the popup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PopupState {
    pub visible: bool,
    pub anchor_rect: CaretRect,
    pub query_text: String,
    pub results: Vec<SearchResult>,
}
