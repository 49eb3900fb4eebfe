use crate::document::BlockId;

/// Bounding rectangle of the caret at arm time, in host coordinates. Read
/// once when a session opens and handed to the presentation layer as the
/// popup anchor point; never re-read per keystroke (avoids popup jitter).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CaretRect {
    pub left: f64,
    pub top: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionKind {
    Caret { offset: usize },
    Range { start: usize, end: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub block_id: BlockId,
    pub kind: SelectionKind,
}

impl Selection {
    pub fn caret(block_id: impl Into<BlockId>, offset: usize) -> Self {
        Self {
            block_id: block_id.into(),
            kind: SelectionKind::Caret { offset },
        }
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self.kind, SelectionKind::Caret { .. })
    }

    pub fn caret_offset(&self) -> Option<usize> {
        match self.kind {
            SelectionKind::Caret { offset } => Some(offset),
            SelectionKind::Range { .. } => None,
        }
    }
}

/// Capability interface over the host text surface. Keeps the session core
/// independent of any concrete text-rendering implementation.
pub trait TextSurface {
    /// The current selection, `None` when the surface has no focus.
    fn current_selection(&self) -> Option<Selection>;

    /// Bounding rect of the caret at a logical offset within a block.
    fn caret_rect(&self, block_id: &BlockId, offset: usize) -> Option<CaretRect>;

    /// Pins the viewport while a session is open so the popup cannot scroll
    /// out of sync with its anchor.
    fn lock_viewport(&self);

    fn unlock_viewport(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caret_selection_is_collapsed() {
        let sel = Selection::caret("b1", 4);
        assert!(sel.is_collapsed());
        assert_eq!(sel.caret_offset(), Some(4));
    }

    #[test]
    fn range_selection_is_not_collapsed() {
        let sel = Selection {
            block_id: BlockId::from("b1"),
            kind: SelectionKind::Range { start: 1, end: 4 },
        };
        assert!(!sel.is_collapsed());
        assert_eq!(sel.caret_offset(), None);
    }
}
