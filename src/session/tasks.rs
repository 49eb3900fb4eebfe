use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::document::{BlockId, BlockType};
use crate::store::DocumentStore;

use super::commit::{self, CommitPlan};
use super::query::QueryEngine;
use super::state::SessionMessage;

/// Debounced block query. The `(generation, seq)` pair rides along so the
/// engine can discard a response that resolves after the session moved on.
pub(super) fn spawn_query<Q>(
    engine: &Q,
    text: String,
    generation: u64,
    seq: u64,
    debounce: Duration,
    tx: &mpsc::UnboundedSender<SessionMessage>,
) where
    Q: QueryEngine + Clone + Send + 'static,
{
    let engine = engine.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        if !debounce.is_zero() {
            tokio::time::sleep(debounce).await;
        }
        match engine.query(&text).await {
            Ok(results) => {
                let _ = tx.send(SessionMessage::QueryResolved {
                    generation,
                    seq,
                    results,
                });
            }
            Err(e) => {
                // A failed query just leaves the current results standing
                debug!(error = %e, generation, "block query failed");
            }
        }
    });
}

pub(super) fn spawn_create<S>(
    store: &S,
    workspace: BlockId,
    title: String,
    generation: u64,
    tx: &mpsc::UnboundedSender<SessionMessage>,
) where
    S: DocumentStore + Clone + Send + 'static,
{
    let store = store.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = store
            .create_block(&workspace, BlockType::Page, &title)
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send(SessionMessage::CreateResolved {
            generation,
            outcome,
        });
    });
}

pub(super) fn spawn_commit<S>(
    store: &S,
    plan: CommitPlan,
    generation: u64,
    tx: &mpsc::UnboundedSender<SessionMessage>,
) where
    S: DocumentStore + Clone + Send + 'static,
{
    let store = store.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = commit::apply(&store, plan).await.map_err(|e| e.to_string());
        let _ = tx.send(SessionMessage::CommitResolved {
            generation,
            outcome,
        });
    });
}
