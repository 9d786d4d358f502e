use tracing::{info, warn};

use crate::chain::{BatchMode, Call};
use crate::execution::{Sender, SubmissionReport};

/// Groups payout calls into fixed-size batch wrappers
#[derive(Debug, Clone, Copy)]
pub struct PayoutBatchBuilder {
    batch_size: usize,
    mode: BatchMode,
}

impl PayoutBatchBuilder {
    pub fn new(batch_size: usize, mode: BatchMode) -> Self {
        Self {
            batch_size: batch_size.max(1),
            mode,
        }
    }

    /// Chunk `calls` in order; only the last batch may be short
    pub fn build(&self, calls: impl IntoIterator<Item = Call>) -> Vec<Call> {
        let calls: Vec<Call> = calls.into_iter().collect();
        calls
            .chunks(self.batch_size)
            .map(|chunk| Call::batch(self.mode, chunk.to_vec()))
            .collect()
    }

    /// Submit batches strictly one after another.
    ///
    /// A failed batch is recorded and the next batch still goes out.
    pub async fn submit(&self, sender: &Sender, batches: &[Call]) -> SubmissionReport {
        let mut report = SubmissionReport::default();
        let total = batches.len();

        for (index, batch) in batches.iter().enumerate() {
            info!("📦 Submitting batch {}/{} ({} calls)", index + 1, total, batch.leaf_count());
            let outcome = sender.send(batch).await;
            if let Err(e) = &outcome {
                warn!("⚠️ Batch {}/{} failed: {}", index + 1, total, e);
            }
            report.record(&outcome);
        }

        report
    }
}
