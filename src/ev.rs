use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GpicksError, Result};
use crate::params::ScoringParams;
use crate::pick::{Direction, Pick, RoleArchetype, RoleTag, StatType};
use crate::sigma::sigma;
use crate::win_prob::win_probability;

pub const EV_CAP: f64 = 60.0;
const LINE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickScore {
    pub sigma: f64,
    pub direction: Direction,
    pub win_probability: f64,
    pub ev_percent: f64,
    pub role_tag: RoleTag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPick {
    pub pick: Pick,
    pub score: PickScore,
}

impl ScoredPick {
    pub fn id(&self) -> &str {
        &self.pick.id
    }
}

/// Relative edge of projection over line, in percent, capped at ±60.
pub fn ev_percent(line: f64, projection: f64) -> f64 {
    let denom = line.abs().max(LINE_EPSILON);
    clamp((projection - line) / denom * 100.0, -EV_CAP, EV_CAP)
}

pub struct EvScorer {
    params: Arc<ScoringParams>,
}

impl EvScorer {
    pub fn new(params: Arc<ScoringParams>) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ScoringParams {
        &self.params
    }

    pub fn evaluate(&self, pick: &Pick) -> PickScore {
        let sigma = sigma(&self.params, &pick.stat_type, pick.line, &pick.role_archetype);
        let direction = pick.direction();
        let win_probability = win_probability(pick.line, pick.projection, sigma, direction);
        let ev_percent = ev_percent(pick.line, pick.projection);
        let role_tag = self.classify_role(ev_percent, win_probability, &pick.stat_type, &pick.role_archetype);
        PickScore {
            sigma,
            direction,
            win_probability,
            ev_percent,
            role_tag,
        }
    }

    /// Anchor wins over Low-Variance when both qualify.
    pub fn classify_role(
        &self,
        ev_percent: f64,
        win_probability: f64,
        stat: &StatType,
        role: &RoleArchetype,
    ) -> RoleTag {
        let t = &self.params.role_thresholds;
        if ev_percent >= t.anchor_min_ev && win_probability >= t.anchor_min_prob {
            return RoleTag::Anchor;
        }
        if stat.is_low_variance_stat()
            && role.is_low_variance_role()
            && win_probability >= t.low_variance_min_prob
        {
            return RoleTag::LowVariance;
        }
        RoleTag::Correlation
    }

    pub fn score(&self, pick: Pick) -> ScoredPick {
        let score = self.evaluate(&pick);
        ScoredPick { pick, score }
    }

    /// Scores a batch, keeping input order. Ids must be unique.
    pub fn score_all(&self, picks: Vec<Pick>) -> Result<Vec<ScoredPick>> {
        let mut seen = HashSet::new();
        for pick in &picks {
            if !seen.insert(pick.id.as_str()) {
                return Err(GpicksError::DuplicatePick(pick.id.clone()));
            }
        }
        let scored = picks.into_iter().map(|p| self.score(p)).collect::<Vec<_>>();
        debug!(count = scored.len(), "scored picks");
        Ok(scored)
    }
}

impl Default for EvScorer {
    fn default() -> Self {
        Self::new(Arc::new(ScoringParams::default()))
    }
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}
