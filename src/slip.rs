use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::correlation::{CorrelationModel, ScriptContext, StatPairPriors};
use crate::error::{GpicksError, Result};
use crate::ev::ScoredPick;
use crate::ledger::Action;
use crate::params::{GradeThresholds, ScoringParams};
use crate::pick::{Direction, RoleTag};

pub const DEFAULT_MAX_POOL: usize = 25;
pub const DEFAULT_SLIP_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlipMetrics {
    pub pick_ids: Vec<String>,
    pub players: Vec<String>,
    pub anchor_count: usize,
    pub low_variance_count: usize,
    pub correlation_count: usize,
    pub role_coverage: usize,
    pub correlation_sum: f64,
    pub avg_ev: f64,
    pub avg_win_prob: f64,
    pub overall_score: f64,
    pub grade: Grade,
}

impl SlipMetrics {
    pub fn ids_label(&self) -> String {
        self.pick_ids.join(",")
    }

    pub fn players_label(&self) -> String {
        self.players.join(" | ")
    }
}

/// `0.4 * (p * 100) + 0.3 * (ev + 100) + 0.3 * (corr * 100 / 3)`.
pub fn overall_score(avg_win_prob: f64, avg_ev: f64, correlation_sum: f64) -> f64 {
    0.4 * (avg_win_prob * 100.0) + 0.3 * (avg_ev + 100.0) + 0.3 * (correlation_sum * 100.0 / 3.0)
}

/// First matching rule wins: A, then B, else C.
pub fn grade(
    thresholds: &GradeThresholds,
    role_coverage: usize,
    correlation_sum: f64,
    avg_win_prob: f64,
) -> Grade {
    let passes = |rule: &crate::params::GradeRule| {
        role_coverage >= rule.min_coverage
            && correlation_sum >= rule.min_corr_sum
            && avg_win_prob >= rule.min_avg_prob
    };
    if passes(&thresholds.a) {
        Grade::A
    } else if passes(&thresholds.b) {
        Grade::B
    } else {
        Grade::C
    }
}

/// Grades and scores fixed-size combinations of scored picks.
pub struct SlipEvaluator {
    params: Arc<ScoringParams>,
    model: Box<dyn CorrelationModel>,
    max_pool: usize,
}

impl SlipEvaluator {
    pub fn new(params: Arc<ScoringParams>, model: Box<dyn CorrelationModel>) -> Self {
        Self {
            params,
            model,
            max_pool: DEFAULT_MAX_POOL,
        }
    }

    /// Stat-pair priors, the production correlation source.
    pub fn with_priors(params: Arc<ScoringParams>) -> Self {
        let model = Box::new(StatPairPriors::new(params.clone()));
        Self::new(params, model)
    }

    pub fn with_max_pool(mut self, max_pool: usize) -> Self {
        self.max_pool = max_pool;
        self
    }

    pub fn model(&self) -> &dyn CorrelationModel {
        self.model.as_ref()
    }

    pub fn evaluate_slip(&self, picks: &[&ScoredPick], ctx: &ScriptContext) -> Result<SlipMetrics> {
        if picks.len() < 2 {
            return Err(GpicksError::SlipSize {
                expected: 2,
                got: picks.len(),
            });
        }
        let mut seen = HashSet::new();
        for p in picks {
            if !seen.insert(p.id()) {
                return Err(GpicksError::DuplicatePick(p.id().to_string()));
            }
        }
        Ok(self.metrics(picks, ctx))
    }

    /// Resolves caller ids against the scored pool, in the order given.
    pub fn evaluate_ids(
        &self,
        scored: &[ScoredPick],
        ids: &[&str],
        ctx: &ScriptContext,
        expected_k: usize,
    ) -> Result<SlipMetrics> {
        if ids.len() != expected_k {
            return Err(GpicksError::SlipSize {
                expected: expected_k,
                got: ids.len(),
            });
        }
        let picks = ids
            .iter()
            .map(|id| {
                scored
                    .iter()
                    .find(|p| p.id() == *id)
                    .ok_or_else(|| GpicksError::UnknownPick(id.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        self.evaluate_slip(&picks, ctx)
    }

    /// Exhaustive C(n, k) ranking: grade first, then overall score descending.
    /// Equal keys keep enumeration order. Only the best `top_k` rows are held
    /// at any time, so memory does not grow with C(n, k).
    pub fn rank_combinations(
        &self,
        scored: &[ScoredPick],
        k: usize,
        ctx: &ScriptContext,
        top_k: usize,
    ) -> Result<Vec<SlipMetrics>> {
        if k < 2 || k > scored.len() {
            return Err(GpicksError::SlipSize {
                expected: k,
                got: scored.len(),
            });
        }
        if scored.len() > self.max_pool {
            return Err(GpicksError::PoolTooLarge {
                got: scored.len(),
                limit: self.max_pool,
            });
        }
        let mut seen = HashSet::new();
        for p in scored {
            if !seen.insert(p.id()) {
                return Err(GpicksError::DuplicatePick(p.id().to_string()));
            }
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        // Per-thread buffers are pruned back to top_k once they reach this size.
        let spill = top_k.saturating_mul(2).max(64);
        let mut kept = Combinations::new(scored.len(), k)
            .enumerate()
            .par_bridge()
            .fold(Vec::new, |mut acc, (ordinal, idx)| {
                let picks = idx.iter().map(|&i| &scored[i]).collect::<Vec<_>>();
                let t = self.tally(&picks, ctx);
                acc.push(RankedRow {
                    grade: t.grade,
                    score: t.overall_score,
                    ordinal,
                    idx,
                });
                if acc.len() >= spill {
                    prune(&mut acc, top_k);
                }
                acc
            })
            .reduce(Vec::new, |mut a, b| {
                a.extend(b);
                prune(&mut a, top_k);
                a
            });
        prune(&mut kept, top_k);
        debug!(
            pool = scored.len(),
            k,
            kept = kept.len(),
            script = %ctx.name,
            "ranked slip combinations"
        );

        Ok(kept
            .iter()
            .map(|row| {
                let picks = row.idx.iter().map(|&i| &scored[i]).collect::<Vec<_>>();
                self.metrics(&picks, ctx)
            })
            .collect())
    }

    fn tally(&self, picks: &[&ScoredPick], ctx: &ScriptContext) -> Tally {
        let count = |tag: RoleTag| picks.iter().filter(|p| p.score.role_tag == tag).count();
        let anchor_count = count(RoleTag::Anchor);
        let low_variance_count = count(RoleTag::LowVariance);
        let correlation_count = count(RoleTag::Correlation);
        let role_coverage = [anchor_count, low_variance_count, correlation_count]
            .iter()
            .filter(|c| **c > 0)
            .count();

        let mut correlation_sum = 0.0;
        for i in 0..picks.len() {
            for j in (i + 1)..picks.len() {
                correlation_sum += self.model.pair_correlation(&picks[i].pick, &picks[j].pick, ctx);
            }
        }

        let n = picks.len() as f64;
        let avg_ev = picks.iter().map(|p| p.score.ev_percent).sum::<f64>() / n;
        let avg_win_prob = picks.iter().map(|p| p.score.win_probability).sum::<f64>() / n;

        Tally {
            anchor_count,
            low_variance_count,
            correlation_count,
            role_coverage,
            correlation_sum,
            avg_ev,
            avg_win_prob,
            overall_score: overall_score(avg_win_prob, avg_ev, correlation_sum),
            grade: grade(&self.params.grade_thresholds, role_coverage, correlation_sum, avg_win_prob),
        }
    }

    fn metrics(&self, picks: &[&ScoredPick], ctx: &ScriptContext) -> SlipMetrics {
        let t = self.tally(picks, ctx);
        SlipMetrics {
            pick_ids: picks.iter().map(|p| p.pick.id.clone()).collect(),
            players: picks.iter().map(|p| p.pick.player.clone()).collect(),
            anchor_count: t.anchor_count,
            low_variance_count: t.low_variance_count,
            correlation_count: t.correlation_count,
            role_coverage: t.role_coverage,
            correlation_sum: t.correlation_sum,
            avg_ev: t.avg_ev,
            avg_win_prob: t.avg_win_prob,
            overall_score: t.overall_score,
            grade: t.grade,
        }
    }
}

/// Slip aggregates without the per-pick labels.
struct Tally {
    anchor_count: usize,
    low_variance_count: usize,
    correlation_count: usize,
    role_coverage: usize,
    correlation_sum: f64,
    avg_ev: f64,
    avg_win_prob: f64,
    overall_score: f64,
    grade: Grade,
}

struct RankedRow {
    grade: Grade,
    score: f64,
    ordinal: usize,
    idx: Vec<usize>,
}

fn compare_rows(a: &RankedRow, b: &RankedRow) -> Ordering {
    a.grade
        .cmp(&b.grade)
        .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
        .then_with(|| a.ordinal.cmp(&b.ordinal))
}

fn prune(rows: &mut Vec<RankedRow>, top_k: usize) {
    rows.sort_by(compare_rows);
    rows.truncate(top_k);
}

/// Best `n` picks by EV%, then win probability. Ties keep input order.
pub fn top_picks(scored: &[ScoredPick], n: usize) -> Vec<ScoredPick> {
    let mut out = scored.to_vec();
    out.sort_by(|a, b| {
        b.score
            .ev_percent
            .partial_cmp(&a.score.ev_percent)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.score
                    .win_probability
                    .partial_cmp(&a.score.win_probability)
                    .unwrap_or(Ordering::Equal)
            })
    });
    out.truncate(n);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegOutcome {
    Win,
    Loss,
    Push,
    Pending,
}

impl LegOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegOutcome::Win => "win",
            LegOutcome::Loss => "loss",
            LegOutcome::Push => "push",
            LegOutcome::Pending => "pending",
        }
    }
}

impl fmt::Display for LegOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One leg of a placed slip and, once known, the stat it actually hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettleLeg {
    pub line: f64,
    pub direction: Direction,
    pub actual: Option<f64>,
}

impl SettleLeg {
    pub fn outcome(&self) -> LegOutcome {
        let Some(actual) = self.actual else {
            return LegOutcome::Pending;
        };
        if actual == self.line {
            return LegOutcome::Push;
        }
        let over = actual > self.line;
        match (self.direction, over) {
            (Direction::Over, true) | (Direction::Under, false) => LegOutcome::Win,
            _ => LegOutcome::Loss,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub legs: Vec<LegOutcome>,
    pub outcome: LegOutcome,
    /// Gross amount returned: stake * odds on a win, the stake on a push.
    pub payout: f64,
}

impl Settlement {
    /// Ledger result for a settled slip; `None` while any leg is pending.
    pub fn action(&self) -> Option<Action> {
        match self.outcome {
            LegOutcome::Win => Some(Action::Win),
            LegOutcome::Loss => Some(Action::Loss),
            LegOutcome::Push => Some(Action::Push),
            LegOutcome::Pending => None,
        }
    }
}

/// Settles a parlay. Any pending leg leaves the slip pending, any loss loses
/// it, and a push on an otherwise unbeaten slip returns the stake.
pub fn settle(legs: &[SettleLeg], stake: f64, total_odds: f64) -> Result<Settlement> {
    if legs.is_empty() {
        return Err(GpicksError::SlipSize { expected: 1, got: 0 });
    }
    if !stake.is_finite() || stake <= 0.0 {
        return Err(GpicksError::InvalidAmount { field: "stake", value: stake });
    }
    if !total_odds.is_finite() || total_odds <= 0.0 {
        return Err(GpicksError::InvalidAmount {
            field: "odds",
            value: total_odds,
        });
    }

    let outcomes = legs.iter().map(SettleLeg::outcome).collect::<Vec<_>>();
    let has = |o: LegOutcome| outcomes.contains(&o);
    let outcome = if has(LegOutcome::Pending) {
        LegOutcome::Pending
    } else if has(LegOutcome::Loss) {
        LegOutcome::Loss
    } else if has(LegOutcome::Push) {
        LegOutcome::Push
    } else {
        LegOutcome::Win
    };
    let payout = match outcome {
        LegOutcome::Win => stake * total_odds,
        LegOutcome::Push => stake,
        LegOutcome::Loss | LegOutcome::Pending => 0.0,
    };
    Ok(Settlement {
        legs: outcomes,
        outcome,
        payout,
    })
}

/// Lexicographic k-subsets of `0..n` as index vectors.
pub struct Combinations {
    n: usize,
    idx: Vec<usize>,
    done: bool,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            idx: (0..k).collect(),
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let out = self.idx.clone();
        let k = self.idx.len();
        // Rightmost slot that can still advance.
        let mut i = k;
        loop {
            if i == 0 {
                self.done = true;
                break;
            }
            i -= 1;
            if self.idx[i] < self.n - k + i {
                self.idx[i] += 1;
                for j in (i + 1)..k {
                    self.idx[j] = self.idx[j - 1] + 1;
                }
                break;
            }
        }
        Some(out)
    }
}
