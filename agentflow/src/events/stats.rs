//! Activity history and statistics across runs.

use super::RunObserver;
use crate::core::{RunStatus, StageName, StageResult, Task};
use crate::stages::ReviewAssessment;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of research sessions kept in [`ResearchStatistics::recent`].
pub const RECENT_RESEARCH: usize = 3;

const UNKNOWN: &str = "unknown";

/// A completed research stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchSession {
    /// Description of the task that was researched.
    pub topic: String,
    /// Configured research depth, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u64>,
    /// Configured focus areas.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub focus_areas: Vec<String>,
    /// When the stage finished.
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct WritingRecord {
    style: String,
    words: u64,
    at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ReviewRecord {
    criteria: String,
    strictness: Option<u64>,
    score: Option<f32>,
    at: DateTime<Utc>,
}

/// Research activity summary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResearchStatistics {
    /// Completed research stages.
    pub total_sessions: usize,
    /// Mean configured depth, rounded to one decimal.
    pub average_depth: f64,
    /// The most recent sessions, oldest first.
    pub recent: Vec<ResearchSession>,
    /// When the last session finished.
    pub last_activity: Option<DateTime<Utc>>,
}

/// Writing activity summary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WritingStatistics {
    /// Completed drafts.
    pub total_pieces: usize,
    /// Words across all drafts.
    pub total_words: u64,
    /// Whole words per draft.
    pub average_words: u64,
    /// Drafts per writing style.
    pub style_breakdown: BTreeMap<String, usize>,
    /// When the last draft finished.
    pub last_activity: Option<DateTime<Utc>>,
}

/// Review activity summary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReviewStatistics {
    /// Completed reviews.
    pub total_reviews: usize,
    /// Mean configured strictness, rounded to one decimal.
    pub average_strictness: f64,
    /// Reviews per criteria.
    pub criteria_breakdown: BTreeMap<String, usize>,
    /// Mean parsed score over reviews that reported one.
    pub average_score: Option<f64>,
    /// Reviews finished on the current UTC day.
    pub reviews_today: usize,
    /// When the last review finished.
    pub last_review: Option<DateTime<Utc>>,
}

/// Aggregated activity of every run a [`StatsObserver`] has seen.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Runs started.
    pub runs_started: usize,
    /// Runs that reached `complete`.
    pub runs_completed: usize,
    /// Runs that reached `failed`.
    pub runs_failed: usize,
    /// Research stage activity.
    pub research: ResearchStatistics,
    /// Writer stage activity.
    pub writing: WritingStatistics,
    /// Reviewer stage activity.
    pub review: ReviewStatistics,
}

#[derive(Debug, Default)]
struct History {
    runs_started: usize,
    runs_completed: usize,
    runs_failed: usize,
    topic: Option<String>,
    research: Vec<ResearchSession>,
    writing: Vec<WritingRecord>,
    reviews: Vec<ReviewRecord>,
}

/// An observer that keeps a history of successful stages and summarizes it.
///
/// Only completed stage results are recorded. Research sessions are
/// attributed to the most recently started run, so one observer should not
/// be shared by concurrent runs if topics matter.
#[derive(Debug, Default)]
pub struct StatsObserver {
    history: RwLock<History>,
}

impl StatsObserver {
    /// Creates an observer with an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Summarizes everything seen so far.
    #[must_use]
    pub fn statistics(&self) -> RunStatistics {
        let history = self.history.read();
        RunStatistics {
            runs_started: history.runs_started,
            runs_completed: history.runs_completed,
            runs_failed: history.runs_failed,
            research: research_statistics(&history.research),
            writing: writing_statistics(&history.writing),
            review: review_statistics(&history.reviews, Utc::now()),
        }
    }

    /// Forgets every recorded run.
    pub fn clear(&self) {
        *self.history.write() = History::default();
    }
}

impl RunObserver for StatsObserver {
    fn on_run_started(&self, task: &Task) {
        let mut history = self.history.write();
        history.runs_started += 1;
        history.topic = Some(task.description.clone());
    }

    fn on_status(&self, _stage: StageName, status: &RunStatus) {
        let mut history = self.history.write();
        match status {
            RunStatus::Complete => history.runs_completed += 1,
            RunStatus::Failed { .. } => history.runs_failed += 1,
            _ => {}
        }
    }

    fn on_stage_result(&self, result: &StageResult) {
        if !result.is_success() {
            return;
        }
        let mut history = self.history.write();
        match result.stage {
            StageName::Research => {
                let session = ResearchSession {
                    topic: history.topic.clone().unwrap_or_default(),
                    depth: result.metadata_value("depth").and_then(|v| v.as_u64()),
                    focus_areas: result
                        .metadata_value("focus_areas")
                        .and_then(|v| serde_json::from_value(v.clone()).ok())
                        .unwrap_or_default(),
                    completed_at: result.ended_at,
                };
                history.research.push(session);
            }
            StageName::Writer => history.writing.push(WritingRecord {
                style: metadata_label(result, "style"),
                words: result
                    .metadata_value("word_count")
                    .and_then(|v| v.as_u64())
                    .unwrap_or_else(|| result.word_count() as u64),
                at: result.ended_at,
            }),
            StageName::Reviewer => history.reviews.push(ReviewRecord {
                criteria: metadata_label(result, "criteria"),
                strictness: result.metadata_value("strictness").and_then(|v| v.as_u64()),
                score: result
                    .metadata_value("assessment")
                    .and_then(|v| serde_json::from_value::<ReviewAssessment>(v.clone()).ok())
                    .and_then(|a| a.score),
                at: result.ended_at,
            }),
        }
    }
}

fn metadata_label(result: &StageResult, key: &str) -> String {
    result
        .metadata_value(key)
        .and_then(|v| v.as_str())
        .unwrap_or(UNKNOWN)
        .to_string()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

fn research_statistics(sessions: &[ResearchSession]) -> ResearchStatistics {
    let recent_from = sessions.len().saturating_sub(RECENT_RESEARCH);
    ResearchStatistics {
        total_sessions: sessions.len(),
        average_depth: mean(sessions.iter().filter_map(|s| s.depth).map(|d| d as f64))
            .map_or(0.0, round1),
        recent: sessions[recent_from..].to_vec(),
        last_activity: sessions.last().map(|s| s.completed_at),
    }
}

fn writing_statistics(records: &[WritingRecord]) -> WritingStatistics {
    let total_words: u64 = records.iter().map(|r| r.words).sum();
    let mut style_breakdown = BTreeMap::new();
    for record in records {
        *style_breakdown.entry(record.style.clone()).or_insert(0) += 1;
    }
    WritingStatistics {
        total_pieces: records.len(),
        total_words,
        average_words: total_words.checked_div(records.len() as u64).unwrap_or(0),
        style_breakdown,
        last_activity: records.last().map(|r| r.at),
    }
}

fn review_statistics(records: &[ReviewRecord], now: DateTime<Utc>) -> ReviewStatistics {
    let mut criteria_breakdown = BTreeMap::new();
    for record in records {
        *criteria_breakdown.entry(record.criteria.clone()).or_insert(0) += 1;
    }
    let today = now.date_naive();
    ReviewStatistics {
        total_reviews: records.len(),
        average_strictness: mean(
            records
                .iter()
                .filter_map(|r| r.strictness)
                .map(|s| s as f64),
        )
        .map_or(0.0, round1),
        criteria_breakdown,
        average_score: mean(records.iter().filter_map(|r| r.score).map(f64::from)).map(round1),
        reviews_today: records.iter().filter(|r| r.at.date_naive() == today).count(),
        last_review: records.last().map(|r| r.at),
    }
}
