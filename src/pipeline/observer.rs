//! Progress and log sinks handed to every pass.

use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

/// Receives progress and log messages from the pipeline.
///
/// `progress` is called once per processed item with a 1-based `current`
/// and a `total` that stays fixed for the pass. The default `log` writes to
/// stdout so messages are never lost when no sink is supplied.
pub trait TransferObserver: Send + Sync {
    fn progress(&self, _current: usize, _total: usize) {}

    fn log(&self, message: &str) {
        println!("{}", message);
    }
}

/// Observer that only prints log lines
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutObserver;

impl TransferObserver for StdoutObserver {}

type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;
type LogFn = Box<dyn Fn(&str) + Send + Sync>;

/// Observer assembled from optional closures
#[derive(Default)]
pub struct CallbackObserver {
    on_progress: Option<ProgressFn>,
    on_log: Option<LogFn>,
}

impl CallbackObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, f: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn on_log(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_log = Some(Box::new(f));
        self
    }
}

impl TransferObserver for CallbackObserver {
    fn progress(&self, current: usize, total: usize) {
        if let Some(f) = &self.on_progress {
            f(current, total);
        }
    }

    fn log(&self, message: &str) {
        match &self.on_log {
            Some(f) => f(message),
            None => println!("{}", message),
        }
    }
}

/// Event forwarded from the worker thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Progress { current: usize, total: usize },
    Log(String),
}

/// Observer that marshals events onto a channel, for callers running the
/// pipeline on a worker thread.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: UnboundedSender<TransferEvent>,
}

impl ChannelObserver {
    pub fn new(tx: UnboundedSender<TransferEvent>) -> Self {
        Self { tx }
    }
}

impl TransferObserver for ChannelObserver {
    fn progress(&self, current: usize, total: usize) {
        let _ = self.tx.send(TransferEvent::Progress { current, total });
    }

    fn log(&self, message: &str) {
        if self.tx.send(TransferEvent::Log(message.to_string())).is_err() {
            // receiver gone, fall back to stdout
            println!("{}", message);
        }
    }
}

/// Milestone message: traced at info and handed to the observer
pub(crate) fn notify(observer: &dyn TransferObserver, message: &str) {
    info!("{}", message);
    observer.log(message);
}

/// Failure message: traced at warn and handed to the observer
pub(crate) fn notify_failure(observer: &dyn TransferObserver, message: &str) {
    warn!("{}", message);
    observer.log(message);
}
