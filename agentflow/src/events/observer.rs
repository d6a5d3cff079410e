//! Observer trait and implementations.

use crate::core::{RunStatus, StageName, StageResult, Task};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn, Level};

macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            Level::TRACE => trace!($($arg)+),
            Level::DEBUG => debug!($($arg)+),
            Level::INFO => info!($($arg)+),
            Level::WARN => warn!($($arg)+),
            _ => error!($($arg)+),
        }
    };
}

/// Receives run status transitions from the driver.
///
/// Called synchronously on the driver's task, so implementations must not
/// block. A UI that needs to do real work should forward events through a
/// [`ChannelObserver`].
pub trait RunObserver: Send + Sync {
    /// Called once when a run starts, before the first transition.
    fn on_run_started(&self, _task: &Task) {}

    /// Called after every status transition. `stage` is the stage the
    /// transition concerns.
    fn on_status(&self, stage: StageName, status: &RunStatus);

    /// Called when a stage produces a result, successful or not.
    fn on_stage_result(&self, _result: &StageResult) {}
}

/// An observer that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RunObserver for NoOpObserver {
    fn on_status(&self, _stage: StageName, _status: &RunStatus) {}
}

/// An observer that logs transitions using the tracing framework.
///
/// Transitions and successful results are logged at the configured level.
/// Failures are logged at WARN, or at ERROR when that is the configured level.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    level: Level,
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingObserver {
    /// Creates a logging observer with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging observer.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// The level transitions are logged at.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    fn failure_level(&self) -> Level {
        if self.level == Level::ERROR {
            Level::ERROR
        } else {
            Level::WARN
        }
    }
}

impl RunObserver for LoggingObserver {
    fn on_status(&self, stage: StageName, status: &RunStatus) {
        if let RunStatus::Failed { kind, message, .. } = status {
            log_at!(
                self.failure_level(),
                stage = %stage,
                kind = %kind,
                error = %message,
                "Run failed"
            );
            return;
        }
        log_at!(
            self.level,
            stage = %stage,
            status = status.as_str(),
            "Run status changed"
        );
    }

    fn on_stage_result(&self, result: &StageResult) {
        let level = if result.is_success() {
            self.level
        } else {
            self.failure_level()
        };
        log_at!(
            level,
            stage = %result.stage,
            status = %result.status,
            duration_ms = result.duration_ms(),
            words = result.word_count(),
            "Stage result"
        );
    }
}

/// An observer that records everything it sees, for tests and inspection.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    statuses: RwLock<Vec<(StageName, RunStatus)>>,
    results: RwLock<Vec<StageResult>>,
}

impl CollectingObserver {
    /// Creates a new collecting observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every `(stage, status)` pair received, in order.
    #[must_use]
    pub fn statuses(&self) -> Vec<(StageName, RunStatus)> {
        self.statuses.read().clone()
    }

    /// Returns only the status short names, in order.
    #[must_use]
    pub fn status_names(&self) -> Vec<&'static str> {
        self.statuses.read().iter().map(|(_, s)| s.as_str()).collect()
    }

    /// Returns every stage result received, in order.
    #[must_use]
    pub fn results(&self) -> Vec<StageResult> {
        self.results.read().clone()
    }

    /// Returns the last status received.
    #[must_use]
    pub fn last_status(&self) -> Option<RunStatus> {
        self.statuses.read().last().map(|(_, s)| s.clone())
    }

    /// Clears everything recorded.
    pub fn clear(&self) {
        self.statuses.write().clear();
        self.results.write().clear();
    }
}

impl RunObserver for CollectingObserver {
    fn on_status(&self, stage: StageName, status: &RunStatus) {
        self.statuses.write().push((stage, status.clone()));
    }

    fn on_stage_result(&self, result: &StageResult) {
        self.results.write().push(result.clone());
    }
}

/// An observer that forwards every callback to several observers, in the
/// order they were added.
#[derive(Default)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn RunObserver>>,
}

impl FanoutObserver {
    /// Creates an empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer.
    #[must_use]
    pub fn with(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Returns the number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns true if no observers were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for FanoutObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutObserver")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl RunObserver for FanoutObserver {
    fn on_run_started(&self, task: &Task) {
        for observer in &self.observers {
            observer.on_run_started(task);
        }
    }

    fn on_status(&self, stage: StageName, status: &RunStatus) {
        for observer in &self.observers {
            observer.on_status(stage, status);
        }
    }

    fn on_stage_result(&self, result: &StageResult) {
        for observer in &self.observers {
            observer.on_stage_result(result);
        }
    }
}

/// An event forwarded by a [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    /// A status transition.
    Status {
        /// The stage the transition concerns.
        stage: StageName,
        /// The new status.
        status: RunStatus,
    },
    /// A stage result.
    StageResult(Box<StageResult>),
}

/// An observer that forwards events over an unbounded tokio channel, so a
/// separate task can render them.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<ObserverEvent>,
}

impl ChannelObserver {
    /// Creates an observer and the receiving end of its channel.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ObserverEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: ObserverEvent) {
        if self.sender.send(event).is_err() {
            debug!("Observer channel closed, dropping event");
        }
    }
}

impl RunObserver for ChannelObserver {
    fn on_status(&self, stage: StageName, status: &RunStatus) {
        self.send(ObserverEvent::Status {
            stage,
            status: status.clone(),
        });
    }

    fn on_stage_result(&self, result: &StageResult) {
        self.send(ObserverEvent::StageResult(Box::new(result.clone())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::io;

    #[derive(Clone, Default)]
    struct Captured(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn log_lines(emit: impl FnOnce()) -> Vec<String> {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, emit);

        let bytes = captured.0.lock().clone();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }

    #[test]
    fn test_collecting_observer_records_in_order() {
        let observer = CollectingObserver::new();
        observer.on_status(StageName::Research, &RunStatus::Researching);
        observer.on_status(StageName::Writer, &RunStatus::Writing);

        assert_eq!(observer.status_names(), vec!["researching", "writing"]);
        assert_eq!(observer.last_status(), Some(RunStatus::Writing));

        observer.clear();
        assert!(observer.statuses().is_empty());
    }

    #[test]
    fn test_collecting_observer_results() {
        let observer = CollectingObserver::new();
        observer.on_stage_result(&StageResult::completed(StageName::Research, Utc::now(), "BRIEF"));

        let results = observer.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "BRIEF");
    }

    #[test]
    fn test_logging_observer_does_not_panic() {
        let observer = LoggingObserver::debug();
        observer.on_status(StageName::Research, &RunStatus::Researching);
        observer.on_status(
            StageName::Research,
            &RunStatus::Failed {
                stage: StageName::Research,
                kind: ErrorKind::Config,
                message: "depth".into(),
            },
        );
        NoOpObserver.on_status(StageName::Writer, &RunStatus::Writing);
    }

    #[test]
    fn test_logging_observer_uses_configured_level() {
        for (level, prefix) in [
            (Level::TRACE, "TRACE"),
            (Level::DEBUG, "DEBUG"),
            (Level::INFO, "INFO"),
            (Level::WARN, "WARN"),
            (Level::ERROR, "ERROR"),
        ] {
            let observer = LoggingObserver::new(level);
            let lines = log_lines(|| {
                observer.on_status(StageName::Research, &RunStatus::Researching);
                observer.on_stage_result(&StageResult::completed(
                    StageName::Research,
                    Utc::now(),
                    "BRIEF",
                ));
            });

            assert_eq!(lines.len(), 2, "{lines:?}");
            for line in &lines {
                assert!(line.starts_with(prefix), "{level}: {line}");
            }
        }
    }

    #[test]
    fn test_logging_observer_failures_at_warn_or_error() {
        let failed = RunStatus::Failed {
            stage: StageName::Writer,
            kind: ErrorKind::Generation,
            message: "boom".into(),
        };

        let lines = log_lines(|| {
            LoggingObserver::new(Level::TRACE).on_status(StageName::Writer, &failed);
        });
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("WARN"), "{}", lines[0]);
        assert!(lines[0].contains("boom"));

        let lines = log_lines(|| {
            LoggingObserver::new(Level::ERROR).on_status(StageName::Writer, &failed);
        });
        assert!(lines[0].starts_with("ERROR"), "{}", lines[0]);
    }

    #[test]
    fn test_fanout_observer_reaches_every_observer() {
        let first = Arc::new(CollectingObserver::new());
        let second = Arc::new(CollectingObserver::new());
        let fanout = FanoutObserver::new()
            .with(first.clone())
            .with(second.clone())
            .with(Arc::new(NoOpObserver));
        assert_eq!(fanout.len(), 3);

        fanout.on_run_started(&Task::new("Solar energy"));
        fanout.on_status(StageName::Research, &RunStatus::Researching);
        fanout.on_stage_result(&StageResult::completed(StageName::Research, Utc::now(), "BRIEF"));

        for observer in [&first, &second] {
            assert_eq!(observer.status_names(), vec!["researching"]);
            assert_eq!(observer.results().len(), 1);
        }
        assert!(FanoutObserver::new().is_empty());
    }

    #[tokio::test]
    async fn test_channel_observer_forwards_events() {
        let (observer, mut rx) = ChannelObserver::channel();
        observer.on_status(StageName::Reviewer, &RunStatus::Reviewing);
        observer.on_stage_result(&StageResult::completed(StageName::Reviewer, Utc::now(), "ok"));

        assert_eq!(
            rx.recv().await,
            Some(ObserverEvent::Status {
                stage: StageName::Reviewer,
                status: RunStatus::Reviewing,
            })
        );
        assert!(matches!(rx.recv().await, Some(ObserverEvent::StageResult(r)) if r.content == "ok"));
    }

    #[test]
    fn test_channel_observer_tolerates_closed_receiver() {
        let (observer, rx) = ChannelObserver::channel();
        drop(rx);
        observer.on_status(StageName::Research, &RunStatus::Researching);
    }
}
