//! Waiting for a series of periodically created jobs, one index at a time.
//!
//! A scheduler task listens to a [`TickSource`]. On each tick it tries to take
//! one pending index from a bounded queue without blocking; when nothing is
//! pending the tick is dropped. A dequeued index is handled on its own task
//! and its result resolves a oneshot that the driver awaits before it queues
//! the next index. Index `i` is therefore always finished before `i + 1` is
//! armed, no matter how ticks are spaced.

use log::{debug, info};
use std::future::Future;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, watch};

use super::ticks::TickSource;

/// Default number of repeated jobs to observe.
pub const DEFAULT_REPEAT_CHECK_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    /// Index queued, waiting for a tick to pick it up.
    Armed(usize),
    /// A tick claimed the index and the matching job was located.
    Observing { index: usize, job: String },
    Done(usize),
    Finished,
}

#[derive(Debug, Error)]
pub enum CoordinatorError<E>
where
    E: std::error::Error + 'static,
{
    #[error("handling index {index} failed: {source}")]
    Handler {
        index: usize,
        #[source]
        source: E,
    },

    #[error("handler for index {index} stopped before reporting a result")]
    HandlerAborted { index: usize },

    #[error("tick source ended before index {index} was handled")]
    TicksExhausted { index: usize },
}

/// Current state plus every transition taken so far.
#[derive(Debug)]
struct StateCell {
    current: watch::Sender<CoordinatorState>,
    history: Mutex<Vec<CoordinatorState>>,
}

impl StateCell {
    fn new() -> Self {
        let (current, _) = watch::channel(CoordinatorState::Idle);
        Self {
            current,
            history: Mutex::new(Vec::new()),
        }
    }

    fn set(&self, state: CoordinatorState) {
        match self.history.lock() {
            Ok(mut history) => history.push(state.clone()),
            Err(poisoned) => poisoned.into_inner().push(state.clone()),
        }
        self.current.send_replace(state);
    }

    fn history(&self) -> Vec<CoordinatorState> {
        match self.history.lock() {
            Ok(history) => history.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Passed to the handler for each claimed index.
#[derive(Debug, Clone)]
pub struct TickContext {
    index: usize,
    state: Arc<StateCell>,
}

impl TickContext {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Report the job instance this index resolved to.
    pub fn observing(&self, job: impl Into<String>) {
        let job = job.into();
        debug!("Index {} observing job {}", self.index, job);
        self.state.set(CoordinatorState::Observing {
            index: self.index,
            job,
        });
    }
}

struct PendingIndex<T, E> {
    index: usize,
    done: oneshot::Sender<Result<T, E>>,
}

pub struct RepeatedJobCoordinator {
    count: usize,
    state: Arc<StateCell>,
}

impl RepeatedJobCoordinator {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            state: Arc::new(StateCell::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Watch the current state live.
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state.current.subscribe()
    }

    /// Every transition since creation, oldest first. `Idle` is implied.
    pub fn transitions(&self) -> Vec<CoordinatorState> {
        self.state.history()
    }

    /// Drive indices `0..count` through `handler`, returning outputs in index order.
    pub async fn run<S, H, Fut, T, E>(
        &self,
        ticks: S,
        handler: H,
    ) -> Result<Vec<T>, CoordinatorError<E>>
    where
        S: TickSource + 'static,
        H: Fn(TickContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: std::error::Error + Send + 'static,
    {
        let capacity = self.count.max(1);
        let (queue, pending) = mpsc::channel::<PendingIndex<T, E>>(capacity);
        let scheduler = tokio::spawn(scheduler_loop(ticks, pending, handler, Arc::clone(&self.state)));

        let result = self.dispatch(&queue).await;

        drop(queue);
        scheduler.abort();
        if result.is_ok() {
            self.state.set(CoordinatorState::Finished);
            info!("All {} repeated job(s) completed", self.count);
        }
        result
    }

    async fn dispatch<T, E>(
        &self,
        queue: &mpsc::Sender<PendingIndex<T, E>>,
    ) -> Result<Vec<T>, CoordinatorError<E>>
    where
        E: std::error::Error + 'static,
    {
        let mut outputs = Vec::with_capacity(self.count);

        for index in 0..self.count {
            let (done, finished) = oneshot::channel();
            self.state.set(CoordinatorState::Armed(index));
            if queue.send(PendingIndex { index, done }).await.is_err() {
                return Err(CoordinatorError::TicksExhausted { index });
            }

            match finished.await {
                Ok(Ok(output)) => {
                    self.state.set(CoordinatorState::Done(index));
                    info!("Repeated job index {} done", index);
                    outputs.push(output);
                }
                Ok(Err(source)) => return Err(CoordinatorError::Handler { index, source }),
                // The sender went away without a result: either the handler
                // task died or the scheduler exited while the index was queued.
                Err(_) => {
                    return Err(if queue.is_closed() {
                        CoordinatorError::TicksExhausted { index }
                    } else {
                        CoordinatorError::HandlerAborted { index }
                    })
                }
            }
        }

        Ok(outputs)
    }
}

async fn scheduler_loop<S, H, Fut, T, E>(
    mut ticks: S,
    mut pending: mpsc::Receiver<PendingIndex<T, E>>,
    handler: H,
    state: Arc<StateCell>,
) where
    S: TickSource,
    H: Fn(TickContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let mut tick_count = 0u64;
    while ticks.next_tick().await.is_some() {
        tick_count += 1;
        let PendingIndex { index, done } = match pending.try_recv() {
            Ok(next) => next,
            Err(TryRecvError::Empty) => {
                debug!("Tick {} dropped: no index pending", tick_count);
                continue;
            }
            Err(TryRecvError::Disconnected) => break,
        };

        debug!("Tick {} claimed index {}", tick_count, index);
        let context = TickContext {
            index,
            state: Arc::clone(&state),
        };
        let work = handler(context);
        tokio::spawn(async move {
            let _ = done.send(work.await);
        });
    }
    debug!("Scheduler stopped after {} tick(s)", tick_count);
}
