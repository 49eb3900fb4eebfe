use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use crate::document::{Block, BlockDescriptor, BlockId, BlockType, Reference, RichText, Span};
use crate::error::{RefMenuError, Result};

/// Consumed interface of the document/block store.
///
/// Reads are synchronous (the session core inspects text on every keystroke);
/// mutations are asynchronous and may fail. `replace_with_reference` is the
/// joint delete-range + insert-reference operation and must be indivisible
/// from the store's perspective: a partial application corrupts the visible
/// document.
pub trait DocumentStore: Send + Sync {
    fn block_exists(&self, id: &BlockId) -> bool;

    /// Current logical text length of the block, `None` if it is gone.
    fn char_len(&self, id: &BlockId) -> Option<usize>;

    /// Text strictly before `offset` in the block, `None` if the block is
    /// gone or `offset` is out of range.
    fn text_before(&self, id: &BlockId, offset: usize) -> Option<String>;

    /// The page block this block lives under, if any.
    fn containing_page(&self, id: &BlockId) -> Option<BlockId>;

    /// Atomically deletes `span` and inserts `reference` at `span.start`.
    fn replace_with_reference(
        &self,
        id: &BlockId,
        span: Span,
        reference: Reference,
    ) -> BoxFuture<'static, Result<()>>;

    fn create_block(
        &self,
        workspace: &BlockId,
        block_type: BlockType,
        title: &str,
    ) -> BoxFuture<'static, Result<Block>>;

    fn add_child_block(
        &self,
        parent: &BlockId,
        child: &BlockId,
    ) -> BoxFuture<'static, Result<()>>;
}

#[derive(Default)]
struct StoreInner {
    blocks: HashMap<BlockId, Block>,
    parents: HashMap<BlockId, BlockId>,
    order: Vec<BlockId>,
    next_uid: u64,
    fail_writes: bool,
    fail_creates: bool,
}

impl StoreInner {
    fn mint_uid(&mut self) -> BlockId {
        self.next_uid += 1;
        BlockId::new(format!("blk-{}", self.next_uid))
    }
}

/// In-memory [`DocumentStore`] for embedding and tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_page(&self, title: &str) -> BlockId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.mint_uid();
        inner.order.push(id.clone());
        inner.blocks.insert(
            id.clone(),
            Block {
                id: id.clone(),
                block_type: BlockType::Page,
                title: title.to_string(),
                children: vec![],
                content: RichText::default(),
            },
        );
        id
    }

    pub fn insert_block(&self, parent: &BlockId, text: &str) -> BlockId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.mint_uid();
        inner.order.push(id.clone());
        inner.blocks.insert(
            id.clone(),
            Block {
                id: id.clone(),
                block_type: BlockType::Paragraph,
                title: String::new(),
                children: vec![],
                content: RichText::from_text(text),
            },
        );
        if let Some(p) = inner.blocks.get_mut(parent) {
            p.children.push(id.clone());
        }
        inner.parents.insert(id.clone(), parent.clone());
        id
    }

    pub fn block(&self, id: &BlockId) -> Option<Block> {
        self.inner.lock().unwrap().blocks.get(id).cloned()
    }

    pub fn remove_block(&self, id: &BlockId) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let removed = inner.blocks.remove(id).is_some();
        if removed {
            inner.order.retain(|b| b != id);
            inner.parents.remove(id);
            for block in inner.blocks.values_mut() {
                block.children.retain(|c| c != id);
            }
        }
        removed
    }

    /// Host-side typing shim, see [`RichText::insert_text`].
    pub fn insert_text(&self, id: &BlockId, offset: usize, text: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner
            .blocks
            .get_mut(id)
            .is_some_and(|b| b.content.insert_text(offset, text))
    }

    /// Host-side deletion shim, see [`RichText::delete_range`].
    pub fn delete_range(&self, id: &BlockId, span: Span) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner
            .blocks
            .get_mut(id)
            .is_some_and(|b| b.content.delete_range(span))
    }

    /// Case-insensitive substring search over non-empty blocks and page
    /// titles, in insertion order, capped at `limit`.
    pub fn search(&self, query: &str, limit: usize) -> Vec<BlockDescriptor> {
        let query_lower = query.to_lowercase();
        let inner = self.inner.lock().unwrap();
        let mut results = Vec::new();
        for id in &inner.order {
            if results.len() >= limit {
                break;
            }
            let Some(block) = inner.blocks.get(id) else {
                continue;
            };
            let haystack = if block.block_type == BlockType::Page {
                block.title.clone()
            } else {
                block.content.to_plain()
            };
            if haystack.is_empty() {
                continue;
            }
            if query_lower.is_empty() || haystack.to_lowercase().contains(&query_lower) {
                results.push(BlockDescriptor {
                    id: block.id.clone(),
                    block_type: block.block_type,
                    preview: haystack,
                });
            }
        }
        results
    }

    /// Makes subsequent replace/attach mutations fail (store-rejected).
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_writes = fail;
    }

    /// Makes subsequent block creations fail.
    pub fn set_fail_creates(&self, fail: bool) {
        self.inner.lock().unwrap().fail_creates = fail;
    }
}

impl DocumentStore for MemoryStore {
    fn block_exists(&self, id: &BlockId) -> bool {
        self.inner.lock().unwrap().blocks.contains_key(id)
    }

    fn char_len(&self, id: &BlockId) -> Option<usize> {
        let inner = self.inner.lock().unwrap();
        inner.blocks.get(id).map(|b| b.content.char_len())
    }

    fn text_before(&self, id: &BlockId, offset: usize) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        let block = inner.blocks.get(id)?;
        if offset > block.content.char_len() {
            return None;
        }
        Some(block.content.text_before(offset))
    }

    fn containing_page(&self, id: &BlockId) -> Option<BlockId> {
        let inner = self.inner.lock().unwrap();
        let mut current = id.clone();
        loop {
            if inner.blocks.get(&current)?.block_type == BlockType::Page {
                return Some(current);
            }
            current = inner.parents.get(&current)?.clone();
        }
    }

    fn replace_with_reference(
        &self,
        id: &BlockId,
        span: Span,
        reference: Reference,
    ) -> BoxFuture<'static, Result<()>> {
        let store = self.clone();
        let id = id.clone();
        Box::pin(async move {
            let mut inner = store.inner.lock().unwrap();
            if inner.fail_writes {
                return Err(RefMenuError::MutationFailure("store rejected write".into()));
            }
            let block = inner
                .blocks
                .get_mut(&id)
                .ok_or_else(|| RefMenuError::BlockNotFound(id.clone()))?;
            if !block.content.splice_reference(span, reference) {
                return Err(RefMenuError::MutationFailure(format!(
                    "span {}..{} out of range in block {}",
                    span.start, span.end, id
                )));
            }
            Ok(())
        })
    }

    fn create_block(
        &self,
        _workspace: &BlockId,
        block_type: BlockType,
        title: &str,
    ) -> BoxFuture<'static, Result<Block>> {
        let store = self.clone();
        let title = title.to_string();
        Box::pin(async move {
            let mut inner = store.inner.lock().unwrap();
            if inner.fail_creates {
                return Err(RefMenuError::CreateBlockFailure(
                    "store rejected create".into(),
                ));
            }
            let id = inner.mint_uid();
            let block = Block {
                id: id.clone(),
                block_type,
                title,
                children: vec![],
                content: RichText::default(),
            };
            inner.order.push(id.clone());
            inner.blocks.insert(id, block.clone());
            Ok(block)
        })
    }

    fn add_child_block(&self, parent: &BlockId, child: &BlockId) -> BoxFuture<'static, Result<()>> {
        let store = self.clone();
        let parent = parent.clone();
        let child = child.clone();
        Box::pin(async move {
            let mut inner = store.inner.lock().unwrap();
            if inner.fail_writes {
                return Err(RefMenuError::MutationFailure(
                    "store rejected attach".into(),
                ));
            }
            if !inner.blocks.contains_key(&child) {
                return Err(RefMenuError::BlockNotFound(child));
            }
            let block = inner
                .blocks
                .get_mut(&parent)
                .ok_or_else(|| RefMenuError::BlockNotFound(parent.clone()))?;
            block.children.push(child.clone());
            inner.parents.insert(child, parent);
            Ok(())
        })
    }
}
