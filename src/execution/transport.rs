use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use crate::chain::Call;
use crate::error::{DispatchFailure, SubmitError};
use crate::execution::signer::Signer;

/// Events emitted by an included extrinsic, as far as outcome decisions go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChainEvent {
    ExtrinsicSuccess,
    ExtrinsicFailed(DispatchFailure),
    BatchInterrupted { index: u32, error: DispatchFailure },
    BatchCompletedWithErrors,
    /// Result of the call dispatched through `proxy.proxy`
    ProxyExecuted {
        #[serde(default)]
        error: Option<DispatchFailure>,
    },
}

/// Transaction pool / block status updates for one submitted extrinsic
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TxStatus {
    Future,
    Ready,
    Broadcast,
    InBlock {
        block_hash: String,
        events: Vec<ChainEvent>,
    },
    Retracted,
    FinalityTimeout,
    Finalized {
        block_hash: String,
        events: Vec<ChainEvent>,
    },
    Usurped,
    Dropped,
    Invalid,
}

/// Sign, publish and watch a pre-built call.
///
/// Dropping the returned stream unsubscribes from status updates.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn submit_and_watch(
        &self,
        call: &Call,
        signer: &Signer,
    ) -> Result<BoxStream<'static, TxStatus>, SubmitError>;
}

/// Transport that signs nothing and publishes nothing.
///
/// Every call is recorded and answered with a scripted status sequence, or with
/// `Ready -> InBlock -> Finalized` when no script is queued.
#[derive(Default)]
pub struct DryRunTransport {
    submitted: Mutex<Vec<Call>>,
    scripts: Mutex<VecDeque<Vec<TxStatus>>>,
}

impl DryRunTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the status sequence for the next submission
    pub fn script(&self, statuses: Vec<TxStatus>) {
        self.scripts.lock().push_back(statuses);
    }

    /// Calls submitted so far, in submission order
    pub fn submitted(&self) -> Vec<Call> {
        self.submitted.lock().clone()
    }

    fn pseudo_block_hash(call: &Call, nonce: usize) -> Result<String, SubmitError> {
        let encoded = serde_json::to_vec(call)
            .map_err(|e| SubmitError::Transport(format!("Failed to encode call: {}", e)))?;
        let mut hasher = Sha256::new();
        hasher.update(&encoded);
        hasher.update(nonce.to_le_bytes());
        Ok(format!("0x{}", hex::encode(hasher.finalize())))
    }
}

#[async_trait]
impl Transport for DryRunTransport {
    async fn submit_and_watch(
        &self,
        call: &Call,
        signer: &Signer,
    ) -> Result<BoxStream<'static, TxStatus>, SubmitError> {
        let nonce = {
            let mut submitted = self.submitted.lock();
            submitted.push(call.clone());
            submitted.len() - 1
        };
        info!("🧪 [dry-run] {} signs {}", signer.label(), call);

        let statuses = match self.scripts.lock().pop_front() {
            Some(script) => script,
            None => {
                let block_hash = Self::pseudo_block_hash(call, nonce)?;
                vec![
                    TxStatus::Ready,
                    TxStatus::InBlock {
                        block_hash: block_hash.clone(),
                        events: vec![ChainEvent::ExtrinsicSuccess],
                    },
                    TxStatus::Finalized {
                        block_hash,
                        events: vec![ChainEvent::ExtrinsicSuccess],
                    },
                ]
            }
        };

        let (tx, rx) = mpsc::channel(statuses.len().max(1));
        for status in statuses {
            if tx.send(status).await.is_err() {
                break;
            }
        }
        drop(tx);

        Ok(ReceiverStream::new(rx).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_script_finalizes() {
        let transport = DryRunTransport::new();
        let signer = Signer::from_secret("payouts", "//Alice");
        let call = Call::BumpSalary;

        let statuses: Vec<_> = transport
            .submit_and_watch(&call, &signer)
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(statuses.len(), 3);
        assert!(matches!(statuses[2], TxStatus::Finalized { .. }));
        assert_eq!(transport.submitted(), vec![Call::BumpSalary]);
    }

    #[test]
    fn test_status_sequence_from_json() {
        let statuses: Vec<TxStatus> = serde_json::from_str(
            r#"[
                "ready",
                { "inBlock": {
                    "blockHash": "0x01",
                    "events": [{ "batchInterrupted": {
                        "index": 2,
                        "error": { "module": { "section": "staking", "method": "AlreadyClaimed", "docs": "" } }
                    } }]
                } },
                "usurped"
            ]"#,
        )
        .unwrap();

        assert_eq!(statuses[0], TxStatus::Ready);
        assert!(matches!(
            &statuses[1],
            TxStatus::InBlock { events, .. }
                if matches!(events[0], ChainEvent::BatchInterrupted { index: 2, .. })
        ));
        assert_eq!(statuses[2], TxStatus::Usurped);
    }

    #[test]
    fn test_pseudo_block_hash_differs_per_submission() {
        let call = Call::BumpSalary;
        let first = DryRunTransport::pseudo_block_hash(&call, 0).unwrap();
        let second = DryRunTransport::pseudo_block_hash(&call, 1).unwrap();
        assert!(first.starts_with("0x"));
        assert_eq!(first.len(), 66);
        assert_ne!(first, second);
    }
}
