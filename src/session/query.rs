use std::collections::HashSet;

use futures::future::BoxFuture;

use crate::document::{BlockDescriptor, BlockId};
use crate::error::Result;
use crate::store::MemoryStore;

/// Consumed interface of the block query collaborator: ranked descriptors
/// for a partial text, possibly asynchronous.
pub trait QueryEngine: Send + Sync {
    fn query(&self, text: &str) -> BoxFuture<'static, Result<Vec<BlockDescriptor>>>;
}

/// One popup entry: an existing block, or a synthetic create-then-insert
/// action carrying the would-be title.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    Existing(BlockDescriptor),
    CreatePage { title: String },
    CreateSubPage { title: String },
}

impl SearchResult {
    pub fn id(&self) -> ResultId {
        match self {
            SearchResult::Existing(d) => ResultId::Block(d.id.clone()),
            SearchResult::CreatePage { .. } => ResultId::NewPage,
            SearchResult::CreateSubPage { .. } => ResultId::NewSubPage,
        }
    }
}

/// Stable handle the presentation layer passes back on selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultId {
    Block(BlockId),
    NewPage,
    NewSubPage,
}

/// Shapes raw engine output for the popup: deduplicates by block id
/// preserving rank order, caps at `limit`, then appends the synthetic
/// create entries titled after the current query.
pub fn prepare_results(
    raw: Vec<BlockDescriptor>,
    query: &str,
    limit: usize,
) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for descriptor in raw {
        if out.len() >= limit {
            break;
        }
        if seen.insert(descriptor.id.clone()) {
            out.push(SearchResult::Existing(descriptor));
        }
    }
    out.push(SearchResult::CreatePage {
        title: query.to_string(),
    });
    out.push(SearchResult::CreateSubPage {
        title: query.to_string(),
    });
    out
}

/// [`QueryEngine`] over a [`MemoryStore`]: case-insensitive substring match.
#[derive(Clone)]
pub struct StoreQuery {
    store: MemoryStore,
    limit: usize,
}

impl StoreQuery {
    pub fn new(store: MemoryStore, limit: usize) -> Self {
        Self { store, limit }
    }
}

impl QueryEngine for StoreQuery {
    fn query(&self, text: &str) -> BoxFuture<'static, Result<Vec<BlockDescriptor>>> {
        let store = self.store.clone();
        let text = text.to_string();
        let limit = self.limit;
        Box::pin(async move { Ok(store.search(&text, limit)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::BlockType;

    fn descriptor(id: &str, preview: &str) -> BlockDescriptor {
        BlockDescriptor {
            id: BlockId::from(id),
            block_type: BlockType::Paragraph,
            preview: preview.into(),
        }
    }

    #[test]
    fn prepare_appends_synthetic_entries() {
        let results = prepare_results(vec![descriptor("b1", "one")], "foo", 10);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id(), ResultId::Block(BlockId::from("b1")));
        assert_eq!(
            results[1],
            SearchResult::CreatePage {
                title: "foo".into()
            }
        );
        assert_eq!(
            results[2],
            SearchResult::CreateSubPage {
                title: "foo".into()
            }
        );
    }

    #[test]
    fn prepare_with_empty_query_still_offers_create() {
        let results = prepare_results(vec![], "", 10);
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], SearchResult::CreatePage { .. }));
    }

    #[test]
    fn prepare_dedups_by_id_keeping_rank_order() {
        let results = prepare_results(
            vec![
                descriptor("b1", "first"),
                descriptor("b2", "second"),
                descriptor("b1", "dup"),
            ],
            "q",
            10,
        );
        let existing: Vec<_> = results
            .iter()
            .filter_map(|r| match r {
                SearchResult::Existing(d) => Some(d.preview.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(existing, vec!["first", "second"]);
    }

    #[test]
    fn prepare_caps_existing_entries_at_limit() {
        let raw = (0..5)
            .map(|i| descriptor(&format!("b{}", i), "x"))
            .collect();
        let results = prepare_results(raw, "q", 2);
        // 2 existing + 2 synthetic
        assert_eq!(results.len(), 4);
    }

    #[tokio::test]
    async fn store_query_filters_blocks() {
        let store = MemoryStore::new();
        let page = store.insert_page("Notes");
        let b1 = store.insert_block(&page, "alpha");
        store.insert_block(&page, "beta");

        let engine = StoreQuery::new(store, 10);
        let hits = engine.query("alp").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, b1);
    }
}
