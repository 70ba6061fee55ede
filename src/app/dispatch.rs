use crate::app::AppEvent;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Thread-safe handle for injecting events into the reducer's inbox.
///
/// Background work never touches UI state; it only holds one of these.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    tx: UnboundedSender<AppEvent>,
    runtime: Handle,
}

impl Dispatcher {
    pub fn channel(runtime: Handle) -> (Self, Inbox) {
        let (tx, rx) = unbounded_channel();
        (
            Self {
                tx,
                runtime: runtime.clone(),
            },
            Inbox { rx, runtime },
        )
    }

    /// Enqueues `event`. Returns `false` once the inbox has been dropped.
    pub fn dispatch(&self, event: AppEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        drop(self.runtime.spawn(task));
    }

    pub fn spawn_blocking<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        drop(self.runtime.spawn_blocking(job));
    }

    /// Dispatches `make_event()` every `period` until the returned ticker is dropped.
    pub fn every<F>(&self, period: Duration, make_event: F) -> Ticker
    where
        F: Fn() -> AppEvent + Send + 'static,
    {
        let tx = self.tx.clone();
        let task = self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(make_event()).is_err() {
                    break;
                }
            }
        });
        Ticker { task }
    }
}

/// The reducer's single inbox.
#[derive(Debug)]
pub struct Inbox {
    rx: UnboundedReceiver<AppEvent>,
    #[cfg_attr(not(test), allow(dead_code))]
    runtime: Handle,
}

impl Inbox {
    /// Blocks until the next event; `None` once every dispatcher is gone.
    pub fn recv(&mut self) -> Option<AppEvent> {
        self.rx.blocking_recv()
    }

    #[cfg(test)]
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<AppEvent> {
        let rx = &mut self.rx;
        self.runtime
            .block_on(async { tokio::time::timeout(timeout, rx.recv()).await.ok().flatten() })
    }

    /// Collects everything that arrives within `window`.
    #[cfg(test)]
    pub fn collect_for(&mut self, window: Duration) -> Vec<AppEvent> {
        let deadline = std::time::Instant::now() + window;
        let mut events = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return events;
            }
            match self.recv_timeout(remaining) {
                Some(event) => events.push(event),
                None => return events,
            }
        }
    }
}

/// A recurring timer owned by whoever needs the ticks. Dropping it stops the ticks.
#[derive(Debug)]
pub struct Ticker {
    task: JoinHandle<()>,
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
pub(crate) fn test_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .build()
        .expect("runtime")
}
