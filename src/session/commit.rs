use crate::document::{BlockId, RefKind, Reference, Span};
use crate::error::Result;
use crate::store::DocumentStore;

/// Everything a commit needs, captured synchronously at selection time so
/// the in-flight task never re-reads mutable session state.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitPlan {
    /// Block holding the trigger text.
    pub block_id: BlockId,
    /// Trigger-plus-query char range to replace.
    pub span: Span,
    pub reference: Reference,
    /// For sub-page creation: attach the target under this parent first.
    pub attach: Option<Attachment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub parent: BlockId,
    pub child: BlockId,
}

impl CommitPlan {
    pub fn link(block_id: BlockId, span: Span, target: BlockId) -> Self {
        Self {
            block_id,
            span,
            reference: Reference {
                kind: RefKind::Link,
                target,
            },
            attach: None,
        }
    }

    pub fn with_attachment(mut self, parent: BlockId) -> Self {
        self.attach = Some(Attachment {
            parent,
            child: self.reference.target.clone(),
        });
        self
    }
}

/// Runs the plan against the store. The replace-and-insert itself is a
/// single store mutation; the optional child attachment precedes it so a
/// reference never points at a block the page tree does not know.
pub async fn apply<S: DocumentStore>(store: &S, plan: CommitPlan) -> Result<Reference> {
    if let Some(attach) = &plan.attach {
        store.add_child_block(&attach.parent, &attach.child).await?;
    }
    store
        .replace_with_reference(&plan.block_id, plan.span, plan.reference.clone())
        .await?;
    Ok(plan.reference)
}
