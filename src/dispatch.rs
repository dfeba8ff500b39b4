//! Delivery of completions on a designated thread
//!
//! A [`MainQueue`] is bound to the thread that created it. Work finishing on
//! any other thread is handed to that thread through a channel, and the
//! thread drains the channel by driving its [`MainLoop`].
//!
//! [`MainThreadDecorator`] wraps any single-shot asynchronous operation so its
//! completion is always observed on the designated thread.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::trace;

use crate::data::{FeedItem, FeedLoader, FetchError};
use crate::image::{DecodedImage, ImageError, ImageMapper};

type Job = Box<dyn FnOnce() + Send>;

/// Handle for scheduling work on the designated thread
#[derive(Debug, Clone)]
pub struct MainQueue {
    thread: ThreadId,
    jobs: mpsc::UnboundedSender<Job>,
}

/// Runs jobs handed to a [`MainQueue`]
///
/// Not `Send`: it can only be driven on the thread the queue is bound to.
pub struct MainLoop {
    jobs: mpsc::UnboundedReceiver<Job>,
    _not_send: PhantomData<*const ()>,
}

impl MainQueue {
    /// Makes the calling thread the designated thread
    pub fn for_current_thread() -> (MainQueue, MainLoop) {
        let (jobs, queued) = mpsc::unbounded_channel();
        let queue = MainQueue {
            thread: thread::current().id(),
            jobs,
        };
        let main_loop = MainLoop {
            jobs: queued,
            _not_send: PhantomData,
        };
        (queue, main_loop)
    }

    /// Returns true when called on the designated thread
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }

    /// Runs `action` on the designated thread
    ///
    /// Runs inline when already there. Otherwise queues a job that performs
    /// the same check again once the main loop picks it up. Actions queued
    /// after the [`MainLoop`] is gone are dropped.
    pub fn perform<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_current() {
            action();
            return;
        }

        let queue = self.clone();
        if self
            .jobs
            .send(Box::new(move || queue.perform(action)))
            .is_err()
        {
            trace!("Main loop gone, dropping job");
        }
    }
}

impl MainLoop {
    /// Runs every job queued so far without waiting
    ///
    /// Returns the number of jobs run.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.jobs.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Waits for the next job and runs it
    ///
    /// Returns false once every [`MainQueue`] handle has been dropped.
    pub async fn run_next(&mut self) -> bool {
        match self.jobs.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }
}

/// Delivers the completions of a wrapped operation on the designated thread
///
/// The decorator owns its in-flight work. Dropping it aborts that work, and
/// completions already handed to the main loop are discarded, so nothing is
/// observed after teardown. Must be used from within a tokio runtime.
pub struct MainThreadDecorator<T> {
    decoratee: Arc<T>,
    queue: MainQueue,
    in_flight: Mutex<JoinSet<()>>,
    alive: Arc<()>,
}

impl<T: Send + Sync + 'static> MainThreadDecorator<T> {
    pub fn new(decoratee: T, queue: MainQueue) -> Self {
        Self {
            decoratee: Arc::new(decoratee),
            queue,
            in_flight: Mutex::new(JoinSet::new()),
            alive: Arc::new(()),
        }
    }

    /// Starts `operation` and hands its result to `completion` on the designated thread
    ///
    /// `completion` is invoked at most once, and never after the decorator is dropped.
    pub fn run<Op, Fut, R, F>(&self, operation: Op, completion: F)
    where
        Op: FnOnce(Arc<T>) -> Fut,
        Fut: Future<Output = R> + Send + 'static,
        R: Send + 'static,
        F: FnOnce(R) + Send + 'static,
    {
        let work = operation(Arc::clone(&self.decoratee));
        let queue = self.queue.clone();
        let alive = Arc::downgrade(&self.alive);

        let mut in_flight = self.in_flight.lock();
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(async move {
            let result = work.await;
            queue.perform(move || {
                if alive.upgrade().is_some() {
                    completion(result);
                } else {
                    trace!("Decorator torn down, dropping completion");
                }
            });
        });
    }
}

impl<T: FeedLoader + 'static> MainThreadDecorator<T> {
    /// Loads the feed and delivers the result on the designated thread
    pub fn load<F>(&self, completion: F)
    where
        F: FnOnce(Result<Vec<FeedItem>, FetchError>) + Send + 'static,
    {
        self.run(|loader| async move { loader.load().await }, completion);
    }
}

impl<M: ImageMapper + 'static> MainThreadDecorator<M> {
    /// Maps image bytes and delivers the result on the designated thread
    pub fn map<F>(&self, data: Bytes, completion: F)
    where
        F: FnOnce(Result<DecodedImage, ImageError>) + Send + 'static,
    {
        self.run(|mapper| async move { mapper.map(data).await }, completion);
    }
}
