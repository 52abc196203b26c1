pub mod config;
pub mod score;

pub use config::ScoringConfig;
pub use score::{focus_score, score_breakdown, ScoreBand, ScoreBreakdown};
