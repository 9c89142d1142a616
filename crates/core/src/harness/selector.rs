//! Picking one usable resource out of a remote listing.
//!
//! An explicit id is trusted as-is and resolved with a single fetch. Without
//! one, the selector samples the listing at random until a candidate passes
//! the readiness predicate or the retry limit is spent. Sampling is not an
//! exhaustive scan: callers that must find a sparse match in a small set
//! should filter the candidates first.

use async_trait::async_trait;
use log::debug;
use rand::Rng;
use std::collections::HashSet;
use thiserror::Error;

use crate::utils::random::with_shared_rng;

/// Default number of random draws before giving up.
pub const DEFAULT_PICK_RETRY_LIMIT: usize = 10;

/// Errors returned by [`ResourceSelector`].
#[derive(Debug, Error)]
pub enum SelectError<E>
where
    E: std::error::Error + 'static,
{
    /// The explicitly requested resource could not be fetched.
    #[error("resource {0} not found")]
    NotFound(String),

    /// The listing had nothing to choose from.
    #[error("no candidates to choose from")]
    EmptyCandidateSet,

    /// Every random draw missed the predicate.
    #[error("no matching candidate after {attempts} attempts")]
    NoMatchFound { attempts: usize },

    /// The listing call itself failed.
    #[error("listing candidates failed: {0}")]
    Transport(#[source] E),
}

/// A remote collection that can be listed or looked up by id.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    type Item: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch one resource by id; `Ok(None)` when it does not exist.
    async fn fetch(&self, id: &str) -> Result<Option<Self::Item>, Self::Error>;

    /// List all candidates in the order the remote returns them.
    async fn list(&self) -> Result<Vec<Self::Item>, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSelector {
    retry_limit: usize,
}

impl Default for ResourceSelector {
    fn default() -> Self {
        Self::new(DEFAULT_PICK_RETRY_LIMIT)
    }
}

impl ResourceSelector {
    pub fn new(retry_limit: usize) -> Self {
        Self { retry_limit }
    }

    pub fn retry_limit(&self) -> usize {
        self.retry_limit
    }

    /// Resolve `explicit_id` if given, otherwise sample the source's listing.
    pub async fn select<S, P>(
        &self,
        explicit_id: Option<&str>,
        source: &S,
        predicate: P,
    ) -> Result<S::Item, SelectError<S::Error>>
    where
        S: CandidateSource,
        P: Fn(&S::Item) -> bool,
    {
        if let Some(id) = explicit_id.filter(|id| !id.is_empty()) {
            return match source.fetch(id).await {
                Ok(Some(item)) => Ok(item),
                Ok(None) => Err(SelectError::NotFound(id.to_string())),
                Err(err) => {
                    debug!("Fetching explicit resource {} failed: {}", id, err);
                    Err(SelectError::NotFound(id.to_string()))
                }
            };
        }

        let mut candidates = source.list().await.map_err(SelectError::Transport)?;
        let index = self.sample_index(&candidates, predicate)?;
        Ok(candidates.swap_remove(index))
    }

    /// [`select`](Self::select) with the predicate "name is not excluded".
    ///
    /// An explicit id bypasses the exclusion list.
    pub async fn select_excluding<S, N>(
        &self,
        explicit_id: Option<&str>,
        source: &S,
        name_of: N,
        exclude: &HashSet<String>,
    ) -> Result<S::Item, SelectError<S::Error>>
    where
        S: CandidateSource,
        N: Fn(&S::Item) -> &str,
    {
        self.select(explicit_id, source, |item| !exclude.contains(name_of(item)))
            .await
    }

    /// Sample `candidates` using the process-wide generator.
    pub fn sample<'a, T, P, E>(
        &self,
        candidates: &'a [T],
        predicate: P,
    ) -> Result<&'a T, SelectError<E>>
    where
        P: Fn(&T) -> bool,
        E: std::error::Error + 'static,
    {
        let index = self.sample_index(candidates, predicate)?;
        Ok(&candidates[index])
    }

    /// Sample `candidates` with a caller-supplied generator.
    pub fn sample_with<'a, T, P, R, E>(
        &self,
        rng: &mut R,
        candidates: &'a [T],
        predicate: P,
    ) -> Result<&'a T, SelectError<E>>
    where
        P: Fn(&T) -> bool,
        R: Rng + ?Sized,
        E: std::error::Error + 'static,
    {
        let index = self.sample_index_with(rng, candidates, predicate)?;
        Ok(&candidates[index])
    }

    fn sample_index<T, P, E>(&self, candidates: &[T], predicate: P) -> Result<usize, SelectError<E>>
    where
        P: Fn(&T) -> bool,
        E: std::error::Error + 'static,
    {
        // The lock covers a single draw, never the predicate.
        self.draw_until(
            candidates,
            predicate,
            |len| with_shared_rng(|rng| rng.gen_range(0..len)),
        )
    }

    fn sample_index_with<T, P, R, E>(
        &self,
        rng: &mut R,
        candidates: &[T],
        predicate: P,
    ) -> Result<usize, SelectError<E>>
    where
        P: Fn(&T) -> bool,
        R: Rng + ?Sized,
        E: std::error::Error + 'static,
    {
        self.draw_until(candidates, predicate, |len| rng.gen_range(0..len))
    }

    fn draw_until<T, P, D, E>(
        &self,
        candidates: &[T],
        predicate: P,
        mut draw: D,
    ) -> Result<usize, SelectError<E>>
    where
        P: Fn(&T) -> bool,
        D: FnMut(usize) -> usize,
        E: std::error::Error + 'static,
    {
        if candidates.is_empty() {
            return Err(SelectError::EmptyCandidateSet);
        }

        let mut attempts = 0;
        while attempts < self.retry_limit {
            let index = draw(candidates.len());
            attempts += 1;
            if predicate(&candidates[index]) {
                debug!("Picked candidate {} after {} attempt(s)", index, attempts);
                return Ok(index);
            }
        }

        Err(SelectError::NoMatchFound { attempts })
    }
}
