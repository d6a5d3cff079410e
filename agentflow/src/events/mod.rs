//! Run observers.
//!
//! The driver reports the start of every run, every status transition and
//! every stage result to a [`RunObserver`]. Observers are purely for display
//! and inspection; they never influence the run.

mod observer;
mod stats;

pub use observer::{
    ChannelObserver, CollectingObserver, FanoutObserver, LoggingObserver, NoOpObserver,
    ObserverEvent, RunObserver,
};
pub use stats::{
    ResearchSession, ResearchStatistics, ReviewStatistics, RunStatistics, StatsObserver,
    WritingStatistics, RECENT_RESEARCH,
};
