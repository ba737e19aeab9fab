// Single-fetch memoization shared by all extractors
//
// unfetched -> fetched | failed, never back. Concurrent callers wait for the
// one in-flight fetch instead of issuing their own.

use std::future::Future;
use tokio::sync::OnceCell;

use super::errors::{ExtractionError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Unfetched,
    Fetched,
    Failed,
}

/// Holds the fetched document (or the failure) for the lifetime of an extractor
#[derive(Debug)]
pub struct FetchCell<T> {
    cell: OnceCell<Result<T>>,
}

impl<T> FetchCell<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Run `fetch` on first call only; every call returns the same outcome
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<&T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.cell
            .get_or_init(fetch)
            .await
            .as_ref()
            .map_err(Clone::clone)
    }

    /// The fetched document, the recorded failure, or `NotReady`
    pub fn get(&self) -> Result<&T> {
        match self.cell.get() {
            None => Err(ExtractionError::NotReady(
                "fetch() has not been called".to_string(),
            )),
            Some(Ok(doc)) => Ok(doc),
            Some(Err(e)) => Err(e.clone()),
        }
    }

    pub fn state(&self) -> FetchState {
        match self.cell.get() {
            None => FetchState::Unfetched,
            Some(Ok(_)) => FetchState::Fetched,
            Some(Err(_)) => FetchState::Failed,
        }
    }
}

impl<T> Default for FetchCell<T> {
    fn default() -> Self {
        Self::new()
    }
}
