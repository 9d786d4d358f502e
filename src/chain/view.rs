use std::future::Future;

use crate::chain::reader::ChainStateReader;
use crate::chain::retry::{collect_pages, retry_read, RetryPolicy, PAGE_SIZE};
use crate::chain::types::Page;
use crate::error::ReadResult;

/// A reader paired with the retry policy every read goes through
#[derive(Clone, Copy)]
pub struct ChainView<'a> {
    reader: &'a dyn ChainStateReader,
    retry: RetryPolicy,
}

impl<'a> ChainView<'a> {
    pub fn new(reader: &'a dyn ChainStateReader, retry: RetryPolicy) -> Self {
        Self { reader, retry }
    }

    pub async fn read<T, F, Fut>(&self, key: &str, mut read: F) -> ReadResult<T>
    where
        F: FnMut(&'a dyn ChainStateReader) -> Fut,
        Fut: Future<Output = ReadResult<T>>,
    {
        let reader = self.reader;
        retry_read(reader, self.retry, key, || read(reader)).await
    }

    /// Enumerate a whole storage map page by page
    pub async fn entries<T, F, Fut>(&self, key: &str, mut fetch: F) -> ReadResult<Vec<T>>
    where
        F: FnMut(&'a dyn ChainStateReader, Option<String>, u32) -> Fut,
        Fut: Future<Output = ReadResult<Page<T>>>,
    {
        let reader = self.reader;
        collect_pages(reader, self.retry, key, |cursor| fetch(reader, cursor, PAGE_SIZE)).await
    }
}
