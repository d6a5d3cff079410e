//! Structured view of a review.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static SCORE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)score[^0-9\n]{0,20}(\d{1,2}(?:\.\d+)?)\s*/\s*10").ok()
});

/// The reviewer's publication verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The content can be published as is.
    ReadyToPublish,
    /// Small fixes are needed.
    NeedsMinorRevisions,
    /// Substantial rework is needed.
    NeedsMajorRevisions,
    /// No verdict could be recognised.
    #[default]
    Unknown,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadyToPublish => write!(f, "ready to publish"),
            Self::NeedsMinorRevisions => write!(f, "needs minor revisions"),
            Self::NeedsMajorRevisions => write!(f, "needs major revisions"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Score, verdict and improved version extracted from review text.
///
/// Parsing is best effort: the review content itself is always kept
/// verbatim on the stage result, this is only an index into it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReviewAssessment {
    /// Overall score out of 10, if one was found.
    pub score: Option<f32>,
    /// Publication verdict.
    pub verdict: Verdict,
    /// The improved version of the content, if the review included one.
    pub improved_version: Option<String>,
}

impl ReviewAssessment {
    /// Parses a review.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self {
            score: parse_score(text),
            verdict: parse_verdict(text),
            improved_version: parse_improved_version(text),
        }
    }

    /// Returns true if the review recommends publishing as is.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.verdict == Verdict::ReadyToPublish
    }
}

fn parse_score(text: &str) -> Option<f32> {
    let re = SCORE_RE.as_ref()?;
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<f32>().ok())
        .next()
        .map(|score| score.clamp(0.0, 10.0))
}

fn parse_verdict(text: &str) -> Verdict {
    let lower = text.to_lowercase();
    // Prefer the verdict section when there is one.
    let scope = lower
        .find("final verdict")
        .map_or(lower.as_str(), |idx| &lower[idx..]);

    if scope.contains("major revision") {
        Verdict::NeedsMajorRevisions
    } else if scope.contains("minor revision") || scope.contains("needs revision") {
        Verdict::NeedsMinorRevisions
    } else if ["ready for publication", "ready to publish", "ready for publishing", "publish-ready"]
        .iter()
        .any(|phrase| scope.contains(phrase))
    {
        Verdict::ReadyToPublish
    } else {
        Verdict::Unknown
    }
}

/// Heading depth of a markdown heading line, or `None` for other lines.
fn heading_level(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    (level > 0 && trimmed[level..].starts_with(' ')).then_some(level)
}

fn parse_improved_version(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.iter().position(|line| {
        let lower = line.to_lowercase();
        lower.contains("improved version") && (heading_level(line).is_some() || lower.contains("**"))
    })?;
    let level = heading_level(lines[start]);

    let body: Vec<&str> = lines[start + 1..]
        .iter()
        .take_while(|line| match (level, heading_level(line)) {
            (Some(own), Some(next)) => next != own,
            _ => true,
        })
        .copied()
        .collect();

    let improved = body.join("\n").trim().to_string();
    (!improved.is_empty()).then_some(improved)
}
