use async_trait::async_trait;

use opal_types::LedgerAnchor;

use crate::error::AnchorResult;

/// External publication of a computed anchor.
///
/// `record_anchor` may fail transiently; the worker persists the checkpoint
/// only after this call succeeds, so a failed publication is retried with a
/// recomputed (identical) anchor on a later cycle.
#[async_trait]
pub trait AnchorRecorder: Send + Sync {
    /// Whether the recorder is currently able to accept an anchor.
    async fn can_record_anchor(&self) -> bool;

    /// Publish an anchor externally.
    async fn record_anchor(&self, anchor: &LedgerAnchor) -> AnchorResult<()>;
}

/// Recorder that only writes the anchor to the process log. Useful for
/// deployments that want the rolling hash without external publication.
pub struct LoggingAnchorRecorder;

#[async_trait]
impl AnchorRecorder for LoggingAnchorRecorder {
    async fn can_record_anchor(&self) -> bool {
        true
    }

    async fn record_anchor(&self, anchor: &LedgerAnchor) -> AnchorResult<()> {
        tracing::info!(
            position = %anchor.position.to_hex(),
            full_store_hash = %anchor.full_store_hash.to_hex(),
            transaction_count = anchor.transaction_count,
            "anchor recorded"
        );
        Ok(())
    }
}
