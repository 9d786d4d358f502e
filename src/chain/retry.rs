use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::{error, warn};

use crate::chain::reader::ChainStateReader;
use crate::chain::types::Page;
use crate::error::{ReadError, ReadResult};

/// Storage page size used for map enumerations
pub const PAGE_SIZE: u32 = 256;

/// Fixed-delay retry policy for chain reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(rename = "delay_ms", with = "millis")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Run `read` until it succeeds, fails permanently, or the attempt budget runs out.
///
/// The reader is asked to reconnect between attempts.
pub async fn retry_read<T, F, Fut>(
    reader: &dyn ChainStateReader,
    policy: RetryPolicy,
    key: &str,
    mut read: F,
) -> ReadResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ReadResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match read().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempt >= max_attempts {
                    error!("Read of {} failed after {} attempts: {}", key, attempt, e);
                    return Err(ReadError::RetriesExhausted {
                        key: key.to_string(),
                        attempts: attempt,
                        last: e.to_string(),
                    });
                }

                warn!(
                    "Attempt {}/{} to read {} failed: {}. Retrying in {}ms...",
                    attempt,
                    max_attempts,
                    key,
                    e,
                    policy.delay.as_millis()
                );

                if let Err(reconnect_err) = reader.reconnect().await {
                    warn!("Reconnect before retrying {} failed: {}", key, reconnect_err);
                }
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

/// Walk every page of a map enumeration, retrying each page independently
pub async fn collect_pages<T, F, Fut>(
    reader: &dyn ChainStateReader,
    policy: RetryPolicy,
    key: &str,
    mut fetch: F,
) -> ReadResult<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = ReadResult<Page<T>>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = retry_read(reader, policy, key, || fetch(cursor.clone())).await?;
        items.extend(page.items);

        match page.next {
            Some(next) => cursor = Some(next),
            None => return Ok(items),
        }
    }
}
