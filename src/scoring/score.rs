use serde::{Deserialize, Serialize};

use crate::scoring::config::ScoringConfig;
use crate::session::SessionStats;

/// Individual score terms, each in `[0, 1]` under normal accumulation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub focus_ratio: f64,
    pub distraction_penalty: f64,
    pub phone_usage_penalty: f64,
    pub break_quality: f64,
    pub score: u32,
}

/// Compute the composite focus score with its terms. Pure; an empty session scores 0.
pub fn score_breakdown(stats: &SessionStats, config: &ScoringConfig) -> ScoreBreakdown {
    if stats.total_s == 0 {
        return ScoreBreakdown {
            focus_ratio: 0.0,
            distraction_penalty: 0.0,
            phone_usage_penalty: 0.0,
            break_quality: 0.0,
            score: 0,
        };
    }

    let total = stats.total_s as f64;
    let focus_ratio = stats.focus_s as f64 / total;
    let distraction_penalty =
        (1.0 - stats.distraction_count as f64 / config.distraction_tolerance).max(0.0);
    let phone_usage_ratio = stats.phone_use_s as f64 / total;
    let phone_usage_penalty = (1.0 - phone_usage_ratio * config.phone_usage_multiplier).max(0.0);
    let break_quality = config.break_quality;

    let raw = focus_ratio * config.weight_focus
        + distraction_penalty * config.weight_distraction
        + phone_usage_penalty * config.weight_phone
        + break_quality * config.weight_break;

    ScoreBreakdown {
        focus_ratio,
        distraction_penalty,
        phone_usage_penalty,
        break_quality,
        score: raw.round().clamp(0.0, 100.0) as u32,
    }
}

pub fn focus_score(stats: &SessionStats, config: &ScoringConfig) -> u32 {
    score_breakdown(stats, config).score
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScoreBand {
    Excellent,
    Good,
    Moderate,
    Poor,
}

impl ScoreBand {
    pub fn from_score(score: u32) -> Self {
        if score > 80 {
            ScoreBand::Excellent
        } else if score > 65 {
            ScoreBand::Good
        } else if score > 50 {
            ScoreBand::Moderate
        } else {
            ScoreBand::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Great focus!",
            ScoreBand::Good => "Good day",
            ScoreBand::Moderate => "Moderate",
            ScoreBand::Poor => "Easily distracted",
        }
    }
}
