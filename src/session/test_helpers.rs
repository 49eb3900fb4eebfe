use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crate::config::{EngineConfig, KeysConfig, SearchConfig, WorkspaceConfig};
use crate::document::{BlockId, Span};
use crate::store::MemoryStore;
use crate::surface::{CaretRect, Selection, SelectionKind, TextSurface};

use super::query::StoreQuery;
use super::state::SessionMessage;
use super::SessionEngine;

/// Scripted [`TextSurface`]: tests move the caret by hand and assert on the
/// viewport lock balance.
#[derive(Clone, Default)]
pub struct FakeSurface {
    selection: Arc<Mutex<Option<Selection>>>,
    locks: Arc<AtomicUsize>,
    unlocks: Arc<AtomicUsize>,
}

impl FakeSurface {
    pub fn set_caret(&self, block: &BlockId, offset: usize) {
        *self.selection.lock().unwrap() = Some(Selection::caret(block.clone(), offset));
    }

    pub fn set_range(&self, block: &BlockId, start: usize, end: usize) {
        *self.selection.lock().unwrap() = Some(Selection {
            block_id: block.clone(),
            kind: SelectionKind::Range { start, end },
        });
    }

    pub fn caret_offset(&self) -> usize {
        self.selection
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|s| s.caret_offset())
            .unwrap_or(0)
    }

    /// Locks taken minus locks released; 0 means every session cleaned up.
    pub fn lock_balance(&self) -> isize {
        self.locks.load(Ordering::SeqCst) as isize - self.unlocks.load(Ordering::SeqCst) as isize
    }
}

impl TextSurface for FakeSurface {
    fn current_selection(&self) -> Option<Selection> {
        self.selection.lock().unwrap().clone()
    }

    fn caret_rect(&self, _block: &BlockId, offset: usize) -> Option<CaretRect> {
        Some(CaretRect {
            left: offset as f64 * 8.0,
            top: 10.0,
            height: 16.0,
        })
    }

    fn lock_viewport(&self) {
        self.locks.fetch_add(1, Ordering::SeqCst);
    }

    fn unlock_viewport(&self) {
        self.unlocks.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        workspace: WorkspaceConfig {
            id: "ws-root".into(),
        },
        search: SearchConfig {
            debounce_ms: 0,
            result_limit: 20,
        },
        keys: KeysConfig::default(),
    }
}

pub struct Harness {
    pub engine: SessionEngine<MemoryStore, StoreQuery, FakeSurface>,
    pub rx: mpsc::UnboundedReceiver<SessionMessage>,
    pub store: MemoryStore,
    pub surface: FakeSurface,
    pub page: BlockId,
    /// The block the simulated user is typing into (starts empty).
    pub block: BlockId,
    /// An existing block matching the query "foo".
    pub target: BlockId,
}

pub fn harness() -> Harness {
    harness_with(test_config())
}

pub fn harness_with(config: EngineConfig) -> Harness {
    let store = MemoryStore::new();
    let page = store.insert_page("Notes");
    let target = store.insert_block(&page, "foo ideas");
    store.insert_block(&page, "unrelated");
    let block = store.insert_block(&page, "");

    let surface = FakeSurface::default();
    surface.set_caret(&block, 0);

    let (tx, rx) = mpsc::unbounded_channel();
    let engine = SessionEngine::new(
        store.clone(),
        StoreQuery::new(store.clone(), 20),
        surface.clone(),
        config,
        tx,
    );

    Harness {
        engine,
        rx,
        store,
        surface,
        page,
        block,
        target,
    }
}

pub fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

/// Simulates the host editor: each char is written into the store, the caret
/// advances, then the engine sees the key event.
pub fn type_str(h: &mut Harness, text: &str) {
    for ch in text.chars() {
        let caret = h.surface.caret_offset();
        assert!(h.store.insert_text(&h.block, caret, &ch.to_string()));
        h.surface.set_caret(&h.block, caret + 1);
        h.engine.handle_key(&key(KeyCode::Char(ch)));
    }
}

/// Simulates a single backspace: delete the char before the caret, move the
/// caret back, then deliver the key event.
pub fn backspace(h: &mut Harness) {
    let caret = h.surface.caret_offset();
    assert!(caret > 0, "backspace at start of block");
    assert!(h.store.delete_range(&h.block, Span::new(caret - 1, caret)));
    h.surface.set_caret(&h.block, caret - 1);
    h.engine.handle_key(&key(KeyCode::Backspace));
}
