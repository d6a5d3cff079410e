//! Per-stage configuration carried by a task.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Valid research depth levels.
pub const DEPTH_RANGE: RangeInclusive<u8> = 1..=10;

/// Valid reviewer strictness levels.
pub const STRICTNESS_RANGE: RangeInclusive<u8> = 1..=10;

fn check_range(field: &'static str, value: u8, range: &RangeInclusive<u8>) -> Result<(), ConfigError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::out_of_range(
            field,
            value,
            i64::from(*range.start()),
            i64::from(*range.end()),
        ))
    }
}

/// Configuration for the research stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// How deep the research should go, 1 to 10.
    #[serde(default = "default_depth")]
    pub depth: u8,
    /// Aspects the brief should pay particular attention to.
    #[serde(default)]
    pub focus_areas: BTreeSet<String>,
}

fn default_depth() -> u8 {
    5
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            focus_areas: BTreeSet::new(),
        }
    }
}

impl ResearchConfig {
    /// Creates a research configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the depth level.
    #[must_use]
    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    /// Adds a focus area. Blank entries are ignored.
    #[must_use]
    pub fn with_focus_area(mut self, area: impl Into<String>) -> Self {
        let area = area.into();
        let trimmed = area.trim();
        if !trimmed.is_empty() {
            self.focus_areas.insert(trimmed.to_string());
        }
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("depth", self.depth, &DEPTH_RANGE)
    }
}

/// Writing style for the writer stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritingStyle {
    /// Formal business register.
    #[default]
    Professional,
    /// Conversational register.
    Casual,
    /// Scholarly register.
    Academic,
    /// Narrative register.
    Creative,
}

impl WritingStyle {
    /// Style specific writing instructions included in the writer prompt.
    #[must_use]
    pub fn guide(self) -> &'static str {
        match self {
            Self::Professional => {
                "- Use a formal tone and business language\n\
                 - Lead with facts, data and actionable insights\n\
                 - Open with a clear executive summary and key points\n\
                 - Support claims with relevant statistics and evidence\n\
                 - Write for business stakeholders and decision-makers"
            }
            Self::Casual => {
                "- Use a conversational, friendly tone\n\
                 - Include relatable examples and analogies\n\
                 - Break complex concepts down simply\n\
                 - Let some personality come through\n\
                 - Write as if explaining the topic to a friend"
            }
            Self::Academic => {
                "- Use a scholarly tone and reference the research findings\n\
                 - Build evidence-based arguments and state the methodology\n\
                 - Structure as abstract, introduction, analysis and conclusion\n\
                 - Be precise with terminology\n\
                 - Write for an audience with domain expertise"
            }
            Self::Creative => {
                "- Use storytelling to carry the reader through the topic\n\
                 - Include metaphors and vivid examples\n\
                 - Keep a strong narrative flow and emotional connection\n\
                 - Vary sentence structure and use descriptive language\n\
                 - Aim to inspire as well as inform"
            }
        }
    }
}

impl fmt::Display for WritingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Professional => write!(f, "Professional"),
            Self::Casual => write!(f, "Casual"),
            Self::Academic => write!(f, "Academic"),
            Self::Creative => write!(f, "Creative"),
        }
    }
}

impl FromStr for WritingStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "professional" => Ok(Self::Professional),
            "casual" => Ok(Self::Casual),
            "academic" => Ok(Self::Academic),
            "creative" => Ok(Self::Creative),
            other => Err(ConfigError::invalid(
                "style",
                format!("unknown style '{other}', expected professional, casual, academic or creative"),
            )),
        }
    }
}

/// Configuration for the writer stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Writing style.
    #[serde(default)]
    pub style: WritingStyle,
    /// Approximate length of the content in words.
    #[serde(default = "default_target_words")]
    pub target_words: u32,
}

fn default_target_words() -> u32 {
    800
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            style: WritingStyle::default(),
            target_words: default_target_words(),
        }
    }
}

impl WriterConfig {
    /// Creates a writer configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the style.
    #[must_use]
    pub fn with_style(mut self, style: WritingStyle) -> Self {
        self.style = style;
        self
    }

    /// Sets the target length in words.
    #[must_use]
    pub fn with_target_words(mut self, words: u32) -> Self {
        self.target_words = words;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_words == 0 {
            return Err(ConfigError::invalid("target_words", "must be a positive word count"));
        }
        Ok(())
    }
}

/// What the reviewer should focus on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewCriteria {
    /// Every aspect of the content.
    #[default]
    Comprehensive,
    /// Factual accuracy.
    Accuracy,
    /// Clarity and readability.
    Readability,
    /// Professional standards.
    Professional,
}

impl ReviewCriteria {
    /// Criteria specific review instructions included in the reviewer prompt.
    #[must_use]
    pub fn guide(self) -> &'static str {
        match self {
            Self::Comprehensive => {
                "Review every aspect of the content:\n\
                 - Factual accuracy and quality of evidence\n\
                 - Writing quality and readability\n\
                 - Structure and logical flow\n\
                 - Fit for the intended audience\n\
                 - Completeness and depth"
            }
            Self::Accuracy => {
                "Focus on factual accuracy:\n\
                 - Verify claims and statistics\n\
                 - Look for logical inconsistencies\n\
                 - Assess the quality of the evidence\n\
                 - Flag potential inaccuracies"
            }
            Self::Readability => {
                "Focus on clarity and readability:\n\
                 - Sentence structure and flow\n\
                 - Word choice and terminology\n\
                 - Paragraph organization\n\
                 - Overall ease of comprehension"
            }
            Self::Professional => {
                "Focus on professional standards:\n\
                 - Business writing conventions\n\
                 - Formal tone and language\n\
                 - Presentation quality\n\
                 - Appropriateness for the industry"
            }
        }
    }
}

impl fmt::Display for ReviewCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comprehensive => write!(f, "comprehensive"),
            Self::Accuracy => write!(f, "accuracy"),
            Self::Readability => write!(f, "readability"),
            Self::Professional => write!(f, "professional"),
        }
    }
}

impl FromStr for ReviewCriteria {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "comprehensive" => Ok(Self::Comprehensive),
            "accuracy" => Ok(Self::Accuracy),
            "readability" => Ok(Self::Readability),
            "professional" => Ok(Self::Professional),
            other => Err(ConfigError::invalid(
                "criteria",
                format!(
                    "unknown criteria '{other}', expected comprehensive, accuracy, readability or professional"
                ),
            )),
        }
    }
}

/// Configuration for the reviewer stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerConfig {
    /// How demanding the review is, 1 to 10.
    #[serde(default = "default_strictness")]
    pub strictness: u8,
    /// What the review focuses on.
    #[serde(default)]
    pub criteria: ReviewCriteria,
}

fn default_strictness() -> u8 {
    7
}

impl Default for ReviewerConfig {
    fn default() -> Self {
        Self {
            strictness: default_strictness(),
            criteria: ReviewCriteria::default(),
        }
    }
}

impl ReviewerConfig {
    /// Creates a reviewer configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the strictness level.
    #[must_use]
    pub fn with_strictness(mut self, strictness: u8) -> Self {
        self.strictness = strictness;
        self
    }

    /// Sets the criteria.
    #[must_use]
    pub fn with_criteria(mut self, criteria: ReviewCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Instruction matching the strictness band.
    #[must_use]
    pub fn strictness_guidance(&self) -> &'static str {
        match self.strictness {
            0..=3 => "Be lenient and focus on major issues only.",
            4..=6 => "Apply moderate standards with balanced feedback.",
            7..=8 => "Apply high standards with detailed analysis.",
            _ => "Be extremely thorough and identify even minor issues.",
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("strictness", self.strictness, &STRICTNESS_RANGE)
    }
}
