use crate::document::{BlockId, Span};
use crate::store::DocumentStore;

use super::trigger::TRIGGER_LEN;

/// Durable logical position fixing where a session began: the block and the
/// char offset of the trigger's first character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub block_id: BlockId,
    pub offset: usize,
}

impl Anchor {
    pub fn new(block_id: BlockId, offset: usize) -> Self {
        Self { block_id, offset }
    }

    /// The exact char range to replace on commit (trigger plus query), or
    /// `None` when the anchor is no longer valid: the block is gone, or the
    /// span no longer fits the block's current text.
    pub fn replace_span<S: DocumentStore>(&self, store: &S, query_len: usize) -> Option<Span> {
        let len = store.char_len(&self.block_id)?;
        let end = self.offset + TRIGGER_LEN + query_len;
        (end <= len).then_some(Span::new(self.offset, end))
    }

    pub fn is_valid<S: DocumentStore>(&self, store: &S, query_len: usize) -> bool {
        self.replace_span(store, query_len).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store_with_block(text: &str) -> (MemoryStore, BlockId) {
        let store = MemoryStore::new();
        let page = store.insert_page("Notes");
        let block = store.insert_block(&page, text);
        (store, block)
    }

    #[test]
    fn span_covers_trigger_and_query() {
        let (store, block) = store_with_block("hi [[foo");
        let anchor = Anchor::new(block, 3);
        assert_eq!(anchor.replace_span(&store, 3), Some(Span::new(3, 8)));
    }

    #[test]
    fn span_with_empty_query_covers_trigger_only() {
        let (store, block) = store_with_block("hi [[");
        let anchor = Anchor::new(block, 3);
        assert_eq!(anchor.replace_span(&store, 0), Some(Span::new(3, 5)));
    }

    #[test]
    fn invalid_when_block_deleted() {
        let (store, block) = store_with_block("hi [[");
        store.remove_block(&block);
        let anchor = Anchor::new(block, 3);
        assert!(!anchor.is_valid(&store, 0));
    }

    #[test]
    fn invalid_when_span_exceeds_text() {
        let (store, block) = store_with_block("hi [[");
        let anchor = Anchor::new(block.clone(), 3);
        // Query of length 1 would need 6 chars of text; block has 5
        assert!(!anchor.is_valid(&store, 1));
        // Shrinking the block under the anchor also invalidates it
        store.delete_range(&block, Span::new(0, 3));
        assert!(!anchor.is_valid(&store, 0));
    }
}
