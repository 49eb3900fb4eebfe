//! Trigger-search-insert sessions: detect `[[` in the edit stream, track the
//! query the user types behind it, and atomically replace the whole span
//! with a block reference on selection.

use std::mem;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::{ArrowKeyPolicy, EngineConfig};
use crate::document::{Block, BlockId, Reference};
use crate::error::{RefMenuError, Result};
use crate::store::DocumentStore;
use crate::surface::TextSurface;

mod anchor;
mod commit;
mod query;
mod state;
mod tasks;
mod trigger;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use anchor::Anchor;
pub use commit::{Attachment, CommitPlan};
pub use query::{prepare_results, QueryEngine, ResultId, SearchResult, StoreQuery};
pub use state::{CreateKind, PendingCreate, PopupState, Session, SessionMessage, SessionPhase};
pub use trigger::{TRIGGER, TRIGGER_LEN};

/// The session state machine. Owns at most one live session; everything
/// asynchronous (queries, block creation, the commit itself) is spawned off
/// and folded back in through [`SessionEngine::handle_message`], gated on
/// the generation token it was spawned under.
pub struct SessionEngine<S, Q, V> {
    store: S,
    query_engine: Q,
    surface: V,
    config: EngineConfig,
    workspace: BlockId,
    phase: SessionPhase,
    next_generation: u64,
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl<S, Q, V> SessionEngine<S, Q, V>
where
    S: DocumentStore + Clone + Send + 'static,
    Q: QueryEngine + Clone + Send + 'static,
    V: TextSurface,
{
    pub fn new(
        store: S,
        query_engine: Q,
        surface: V,
        config: EngineConfig,
        tx: mpsc::UnboundedSender<SessionMessage>,
    ) -> Self {
        let workspace = BlockId::new(config.workspace.id.clone());
        Self {
            store,
            query_engine,
            surface,
            config,
            workspace,
            phase: SessionPhase::Idle,
            next_generation: 0,
            tx,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Snapshot for the presentation layer. The popup is only shown while a
    /// session is armed; a committing session has already hidden it.
    pub fn popup(&self) -> PopupState {
        match &self.phase {
            SessionPhase::Armed(session) => PopupState {
                visible: session.visible,
                anchor_rect: session.anchor_rect,
                query_text: session.query_text.clone(),
                results: session.results.clone(),
            },
            _ => PopupState::default(),
        }
    }

    /// Feed every keystroke through here, after the host editor has applied
    /// it to the document and moved the caret.
    pub fn handle_key(&mut self, key: &KeyEvent) {
        if key.code == KeyCode::Esc {
            self.cancel_session();
            return;
        }

        let Some(selection) = self.surface.current_selection() else {
            return;
        };
        if !selection.is_collapsed() {
            // A range selection means the user is no longer editing the
            // query; an in-flight commit is left to finish on its own.
            if matches!(self.phase, SessionPhase::Armed(_)) {
                self.cancel_session();
            }
            return;
        }
        let block_id = selection.block_id.clone();
        let caret = match selection.caret_offset() {
            Some(offset) => offset,
            None => return,
        };

        if trigger::is_arrow_key(key) {
            if matches!(self.phase, SessionPhase::Armed(_))
                && self.config.arrow_key_policy() == ArrowKeyPolicy::Cancel
            {
                self.cancel_session();
            }
            return;
        }
        if !trigger::is_content_key(key) {
            return;
        }

        let Some(text_before) = self.store.text_before(&block_id, caret) else {
            // The anchored block is gone (or the caret is out of range)
            if matches!(self.phase, SessionPhase::Armed(_)) {
                self.cancel_session();
            }
            return;
        };

        if matches!(self.phase, SessionPhase::Committing(_)) {
            // Input is not reentrant during a commit; only a fresh trigger
            // supersedes it with a new session.
            if key.code != KeyCode::Backspace && trigger::ends_with_trigger(&text_before) {
                self.arm(block_id, caret);
            }
            return;
        }

        let armed_anchor = match &self.phase {
            SessionPhase::Armed(session) if session.anchor.block_id == block_id => {
                Some(session.anchor.clone())
            }
            _ => None,
        };

        if let Some(anchor) = armed_anchor {
            if key.code == KeyCode::Backspace && caret < anchor.offset + TRIGGER_LEN {
                // Deleted into the trigger itself
                self.cancel_session();
                return;
            }
            match trigger::query_between(&text_before, anchor.offset) {
                Some(query_text) => self.refine(query_text),
                None => self.cancel_session(),
            }
            return;
        }

        // Armed in a different block means the caret has left the session
        if matches!(self.phase, SessionPhase::Armed(_)) {
            self.cancel_session();
        }

        // Typing is the only way in: a deletion that happens to leave `[[`
        // before the caret does not reopen the menu.
        if key.code != KeyCode::Backspace && trigger::ends_with_trigger(&text_before) {
            self.arm(block_id, caret);
        }
    }

    /// The presentation layer reports a popup entry was chosen. Ignored
    /// unless a session is armed.
    pub fn select(&mut self, id: &ResultId) {
        if !matches!(self.phase, SessionPhase::Armed(_)) {
            return;
        }
        let SessionPhase::Armed(mut session) = mem::take(&mut self.phase) else {
            unreachable!()
        };

        let query_len = session.query_text.chars().count();
        let Some(span) = session.anchor.replace_span(&self.store, query_len) else {
            // Anchor died under us: close silently, insert nothing
            debug!(
                error = %RefMenuError::InvalidAnchor(session.anchor.block_id),
                "closing session"
            );
            self.surface.unlock_viewport();
            return;
        };

        session.visible = false;
        match id {
            ResultId::Block(target) => {
                let plan = CommitPlan::link(session.anchor.block_id.clone(), span, target.clone());
                tasks::spawn_commit(&self.store, plan, session.generation, &self.tx);
            }
            ResultId::NewPage | ResultId::NewSubPage => {
                let kind = if *id == ResultId::NewPage {
                    CreateKind::Page
                } else {
                    CreateKind::SubPage
                };
                session.pending_create = Some(PendingCreate {
                    kind,
                    title: session.query_text.clone(),
                });
                tasks::spawn_create(
                    &self.store,
                    self.workspace.clone(),
                    session.query_text.clone(),
                    session.generation,
                    &self.tx,
                );
            }
        }
        self.phase = SessionPhase::Committing(session);
    }

    /// Click-away, focus loss, or any other host-side "close this" signal.
    pub fn close_requested(&mut self) {
        self.cancel_session();
    }

    /// Folds an async completion back into the state machine. `Ok(Some(_))`
    /// is a landed reference the host may want to react to (e.g. focus the
    /// caret after it).
    pub fn handle_message(&mut self, msg: SessionMessage) -> Result<Option<Reference>> {
        match msg {
            SessionMessage::QueryResolved {
                generation,
                seq,
                results,
            } => {
                let limit = self.config.search.result_limit;
                match &mut self.phase {
                    SessionPhase::Armed(session)
                        if session.generation == generation && session.query_seq == seq =>
                    {
                        session.results =
                            query::prepare_results(results, &session.query_text, limit);
                    }
                    _ => debug!(generation, seq, "discarding superseded query results"),
                }
                Ok(None)
            }
            SessionMessage::CreateResolved {
                generation,
                outcome,
            } => self.on_create_resolved(generation, outcome),
            SessionMessage::CommitResolved {
                generation,
                outcome,
            } => self.on_commit_resolved(generation, outcome),
        }
    }

    fn on_create_resolved(
        &mut self,
        generation: u64,
        outcome: std::result::Result<Block, String>,
    ) -> Result<Option<Reference>> {
        let live = matches!(&self.phase, SessionPhase::Committing(s) if s.generation == generation);
        if !live {
            match outcome {
                // The block exists but will never be referenced; surface it
                // for diagnosis instead of deleting user-visible data.
                Ok(block) => warn!(
                    block = %block.id,
                    generation,
                    "created block orphaned by superseded session"
                ),
                Err(error) => {
                    debug!(%error, generation, "discarding failed create for superseded session")
                }
            }
            return Ok(None);
        }
        let SessionPhase::Committing(mut session) = mem::take(&mut self.phase) else {
            unreachable!()
        };

        let block = match outcome {
            Ok(block) => block,
            Err(error) => {
                // Recoverable: reopen the popup so the user can retry
                session.visible = true;
                session.pending_create = None;
                self.phase = SessionPhase::Armed(session);
                return Err(RefMenuError::CreateBlockFailure(error));
            }
        };

        let query_len = session.query_text.chars().count();
        let Some(span) = session.anchor.replace_span(&self.store, query_len) else {
            warn!(block = %block.id, "created block orphaned by invalid anchor");
            self.surface.unlock_viewport();
            return Ok(None);
        };

        let mut plan = CommitPlan::link(session.anchor.block_id.clone(), span, block.id.clone());
        let sub_page = session
            .pending_create
            .as_ref()
            .is_some_and(|p| p.kind == CreateKind::SubPage);
        if sub_page {
            if let Some(page) = self.store.containing_page(&session.anchor.block_id) {
                plan = plan.with_attachment(page);
            }
        }
        tasks::spawn_commit(&self.store, plan, session.generation, &self.tx);
        self.phase = SessionPhase::Committing(session);
        Ok(None)
    }

    fn on_commit_resolved(
        &mut self,
        generation: u64,
        outcome: std::result::Result<Reference, String>,
    ) -> Result<Option<Reference>> {
        let live = matches!(&self.phase, SessionPhase::Committing(s) if s.generation == generation);
        if !live {
            // The session moved on while the mutation was in flight; the
            // document mutation (if it landed) stands.
            let current = self
                .phase
                .session()
                .map(|s| s.generation)
                .unwrap_or(self.next_generation);
            let stale = RefMenuError::StaleCommit {
                got: generation,
                current,
            };
            match &outcome {
                Ok(reference) => debug!(%stale, target = %reference.target, "commit discarded"),
                Err(error) => debug!(%stale, %error, "failed commit discarded"),
            }
            return Ok(None);
        }

        self.phase = SessionPhase::Idle;
        self.surface.unlock_viewport();
        match outcome {
            Ok(reference) => Ok(Some(reference)),
            Err(error) => Err(RefMenuError::MutationFailure(error)),
        }
    }

    /// Open a session at the trigger the caret just completed. Supersedes
    /// any live session, in-flight commit included.
    fn arm(&mut self, block_id: BlockId, caret: usize) {
        self.cancel_session();
        self.next_generation += 1;
        let generation = self.next_generation;

        let offset = trigger::trigger_start(caret);
        let anchor = Anchor::new(block_id.clone(), offset);
        // Captured once; the popup stays put for the life of the session
        let anchor_rect = self.surface.caret_rect(&block_id, offset).unwrap_or_default();
        self.surface.lock_viewport();

        let mut session = Session::new(generation, anchor, anchor_rect);
        session.query_seq = 1;
        tasks::spawn_query(
            &self.query_engine,
            String::new(),
            generation,
            session.query_seq,
            self.debounce(),
            &self.tx,
        );
        self.phase = SessionPhase::Armed(session);
    }

    fn refine(&mut self, query_text: String) {
        let debounce = self.debounce();
        if let SessionPhase::Armed(session) = &mut self.phase {
            session.query_text = query_text.clone();
            session.query_seq += 1;
            tasks::spawn_query(
                &self.query_engine,
                query_text,
                session.generation,
                session.query_seq,
                debounce,
                &self.tx,
            );
        }
    }

    /// The single teardown path: whatever phase we were in, the viewport
    /// lock is released exactly once and the phase goes idle.
    fn cancel_session(&mut self) {
        if !self.phase.is_idle() {
            self.phase = SessionPhase::Idle;
            self.surface.unlock_viewport();
        }
    }

    fn debounce(&self) -> Duration {
        Duration::from_millis(self.config.search.debounce_ms)
    }
}
