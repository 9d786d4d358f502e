use std::sync::Arc;
use std::time::Duration;

use futures::stream::{BoxStream, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::chain::Call;
use crate::error::{DropReason, SubmitError};
use crate::execution::signer::Signer;
use crate::execution::transport::{ChainEvent, Transport, TxStatus};

/// Finalized inclusion of a submitted call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub block_hash: String,
}

/// Tally of a sequence of submissions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    pub submitted: usize,
    pub finalized: usize,
    pub failed: usize,
    /// Batches that reported per-item failures; also counted in `failed`
    pub partial: usize,
}

impl SubmissionReport {
    pub fn record(&mut self, outcome: &Result<TxReceipt, SubmitError>) {
        self.submitted += 1;
        match outcome {
            Ok(_) => self.finalized += 1,
            Err(e) => {
                self.failed += 1;
                if e.is_batch_partial_failure() {
                    self.partial += 1;
                }
            }
        }
    }

    pub fn merge(&mut self, other: &SubmissionReport) {
        self.submitted += other.submitted;
        self.finalized += other.finalized;
        self.failed += other.failed;
        self.partial += other.partial;
    }
}

/// Submits calls for one signer and waits for one terminal outcome per call
#[derive(Clone)]
pub struct Sender {
    transport: Arc<dyn Transport>,
    signer: Arc<Signer>,
    finality_timeout: Duration,
}

impl Sender {
    pub fn new(transport: Arc<dyn Transport>, signer: Arc<Signer>, finality_timeout: Duration) -> Self {
        Self {
            transport,
            signer,
            finality_timeout,
        }
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Publish `call` and wait until it is finalized, fails in a block, or leaves the pool.
    ///
    /// The status subscription is dropped on every exit path. Failures are never retried.
    #[instrument(skip(self, call), fields(method = call.method(), leaves = call.leaf_count()))]
    pub async fn send(&self, call: &Call) -> Result<TxReceipt, SubmitError> {
        info!("📤 Submitting {}", call);

        let mut updates = self.transport.submit_and_watch(call, &self.signer).await?;

        let outcome = match tokio::time::timeout(
            self.finality_timeout,
            Self::await_terminal(&mut updates),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(SubmitError::Timeout(self.finality_timeout.as_secs())),
        };
        drop(updates);

        match &outcome {
            Ok(receipt) => info!("✓ Transaction finalized at blockHash {}", receipt.block_hash),
            Err(e) if e.is_batch_partial_failure() => warn!("⚠️ {}", e),
            Err(e) => error!("❌ {}", e),
        }

        outcome
    }

    /// Submit calls one after another; each waits for the previous terminal outcome
    pub async fn send_all(&self, calls: &[Call]) -> SubmissionReport {
        let mut report = SubmissionReport::default();
        for call in calls {
            let outcome = self.send(call).await;
            report.record(&outcome);
        }
        report
    }

    async fn await_terminal(
        updates: &mut BoxStream<'static, TxStatus>,
    ) -> Result<TxReceipt, SubmitError> {
        while let Some(status) = updates.next().await {
            match status {
                TxStatus::InBlock { block_hash, events } => {
                    info!("Transaction included at blockHash {}", block_hash);
                    if let Some(failure) = failure_in(&block_hash, &events) {
                        return Err(failure);
                    }
                }
                TxStatus::Finalized { block_hash, events } => {
                    if let Some(failure) = failure_in(&block_hash, &events) {
                        return Err(failure);
                    }
                    return Ok(TxReceipt { block_hash });
                }
                TxStatus::Dropped => return Err(SubmitError::NotIncluded(DropReason::Dropped)),
                TxStatus::Invalid => return Err(SubmitError::NotIncluded(DropReason::Invalid)),
                TxStatus::Usurped => return Err(SubmitError::NotIncluded(DropReason::Usurped)),
                TxStatus::Retracted => return Err(SubmitError::NotIncluded(DropReason::Retracted)),
                TxStatus::FinalityTimeout => {
                    return Err(SubmitError::NotIncluded(DropReason::FinalityTimeout))
                }
                other => debug!("Waiting for status update... current status is {:?}", other),
            }
        }

        Err(SubmitError::NotIncluded(DropReason::StreamClosed))
    }
}

/// First failure reported by the extrinsic's events, if any
fn failure_in(block_hash: &str, events: &[ChainEvent]) -> Option<SubmitError> {
    events.iter().find_map(|event| match event {
        ChainEvent::ExtrinsicFailed(failure) | ChainEvent::ProxyExecuted { error: Some(failure) } => {
            Some(SubmitError::Dispatch {
                block_hash: block_hash.to_string(),
                failure: failure.clone(),
            })
        }
        ChainEvent::BatchInterrupted { index, error } => Some(SubmitError::BatchInterrupted {
            block_hash: block_hash.to_string(),
            index: *index,
            failure: error.clone(),
        }),
        ChainEvent::BatchCompletedWithErrors => Some(SubmitError::BatchCompletedWithErrors {
            block_hash: block_hash.to_string(),
        }),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchFailure;
    use crate::execution::transport::DryRunTransport;
    use async_trait::async_trait;

    fn sender_with(transport: Arc<dyn Transport>) -> Sender {
        Sender::new(
            transport,
            Arc::new(Signer::from_secret("payouts", "//Alice")),
            Duration::from_secs(5),
        )
    }

    fn already_claimed() -> DispatchFailure {
        DispatchFailure::Module {
            section: "staking".to_string(),
            method: "AlreadyClaimed".to_string(),
            docs: "Rewards for this era have already been claimed for this validator.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_finalized_outcome() {
        let transport = Arc::new(DryRunTransport::new());
        let sender = sender_with(transport.clone());

        let receipt = sender.send(&Call::BumpSalary).await.unwrap();
        assert!(receipt.block_hash.starts_with("0x"));
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_terminal_at_inclusion() {
        let transport = Arc::new(DryRunTransport::new());
        transport.script(vec![
            TxStatus::Ready,
            TxStatus::InBlock {
                block_hash: "0xaa".to_string(),
                events: vec![ChainEvent::ExtrinsicFailed(already_claimed())],
            },
            TxStatus::Finalized {
                block_hash: "0xaa".to_string(),
                events: vec![],
            },
        ]);
        let sender = sender_with(transport);

        let err = sender.send(&Call::BumpSalary).await.unwrap_err();
        assert_eq!(
            err,
            SubmitError::Dispatch {
                block_hash: "0xaa".to_string(),
                failure: already_claimed(),
            }
        );
        assert!(err.to_string().contains("staking.AlreadyClaimed"));
    }

    #[tokio::test]
    async fn test_batch_interrupted_is_partial_failure() {
        let transport = Arc::new(DryRunTransport::new());
        transport.script(vec![TxStatus::InBlock {
            block_hash: "0xbb".to_string(),
            events: vec![ChainEvent::BatchInterrupted {
                index: 1,
                error: already_claimed(),
            }],
        }]);
        let sender = sender_with(transport);

        let calls = vec![Call::BumpSalary];
        let report = sender.send_all(&calls).await;
        assert_eq!(
            report,
            SubmissionReport {
                submitted: 1,
                finalized: 0,
                failed: 1,
                partial: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_inner_proxy_failure_is_a_dispatch_failure() {
        let transport = Arc::new(DryRunTransport::new());
        transport.script(vec![TxStatus::Finalized {
            block_hash: "0xcc".to_string(),
            events: vec![
                ChainEvent::ProxyExecuted {
                    error: Some(DispatchFailure::Other("BadOrigin".to_string())),
                },
                ChainEvent::ExtrinsicSuccess,
            ],
        }]);
        let sender = sender_with(transport);

        let err = sender.send(&Call::BumpSalary).await.unwrap_err();
        assert!(matches!(err, SubmitError::Dispatch { .. }));
    }

    #[tokio::test]
    async fn test_transport_level_non_inclusion() {
        let transport = Arc::new(DryRunTransport::new());
        transport.script(vec![TxStatus::Ready, TxStatus::Usurped]);
        transport.script(vec![TxStatus::Ready]);
        let sender = sender_with(transport);

        assert_eq!(
            sender.send(&Call::BumpSalary).await.unwrap_err(),
            SubmitError::NotIncluded(DropReason::Usurped)
        );
        assert_eq!(
            sender.send(&Call::BumpSalary).await.unwrap_err(),
            SubmitError::NotIncluded(DropReason::StreamClosed)
        );
    }

    struct StalledTransport;

    #[async_trait]
    impl Transport for StalledTransport {
        async fn submit_and_watch(
            &self,
            _call: &Call,
            _signer: &Signer,
        ) -> Result<BoxStream<'static, TxStatus>, SubmitError> {
            Ok(futures::stream::pending().boxed())
        }
    }

    #[tokio::test]
    async fn test_finality_timeout() {
        let sender = Sender::new(
            Arc::new(StalledTransport),
            Arc::new(Signer::from_secret("payouts", "//Alice")),
            Duration::from_millis(50),
        );

        assert_eq!(
            sender.send(&Call::BumpSalary).await.unwrap_err(),
            SubmitError::Timeout(0)
        );
    }
}
