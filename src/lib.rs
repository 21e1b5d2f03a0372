pub mod config;
pub mod correlation;
pub mod error;
pub mod ev;
pub mod kelly;
pub mod ledger;
pub mod params;
pub mod pick;
pub mod picks_csv;
pub mod sigma;
pub mod slip;
pub mod win_prob;

pub use error::{GpicksError, Result};
pub use ev::{EvScorer, PickScore, ScoredPick};
pub use params::ScoringParams;
pub use pick::{Direction, GameScript, Pick, Position, RoleArchetype, RoleTag, StatType};
pub use slip::{Grade, SlipEvaluator, SlipMetrics};
