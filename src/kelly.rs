//! Kelly stake sizing and parlay construction.
//!
//! ```text
//! f* = (b*p - q) / b
//! ```
//!
//! with b = odds - 1 (net decimal odds), p = win probability, q = 1 - p.
//! Stakes use a fraction of f* and are capped at a share of the bankroll.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GpicksError, Result};

pub const DEFAULT_KELLY_FRACTION: f64 = 0.25;
pub const DEFAULT_MAX_STAKE_PCT: f64 = 0.05;
pub const DEFAULT_MAX_LEGS: usize = 6;
/// Largest candidate pool for the 2^n subset search.
pub const EXHAUSTIVE_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KellyStake {
    pub stake: f64,
    /// Applied stake as a percent of bankroll.
    pub kelly_pct: f64,
    /// Uncapped full-Kelly percent, negative when the bet has no edge.
    pub full_kelly_pct: f64,
    /// `p * odds - 1`
    pub edge: f64,
}

/// Fractional Kelly stake.
///
/// # Arguments
/// * `p` - Win probability (0-1)
/// * `odds` - Decimal odds (2.0 = even money)
/// * `bankroll` - Current balance; everything is zero when this is not positive
/// * `fraction` - Share of full Kelly to bet (0.25 = quarter Kelly)
/// * `max_pct` - Cap on the stake as a share of bankroll
pub fn kelly_stake(p: f64, odds: f64, bankroll: f64, fraction: f64, max_pct: f64) -> KellyStake {
    if bankroll <= 0.0 {
        return KellyStake::default();
    }
    let full = full_kelly(p, odds);
    let applied = clamp(full * fraction, 0.0, max_pct);
    KellyStake {
        stake: bankroll * applied,
        kelly_pct: applied * 100.0,
        full_kelly_pct: full * 100.0,
        edge: p * odds - 1.0,
    }
}

/// `(b*p - q) / b`, or 0 when there are no net odds or no chance to win.
pub fn full_kelly(p: f64, odds: f64) -> f64 {
    let b = odds - 1.0;
    if b <= 0.0 || p <= 0.0 {
        return 0.0;
    }
    (b * p - (1.0 - p)) / b
}

/// Expected value of a stake at decimal odds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OddsEv {
    pub win_probability: f64,
    pub expected_value: f64,
    pub ev_percent: f64,
    pub expected_return: f64,
    pub expected_loss: f64,
    /// `1 / odds`, the break-even probability.
    pub implied_probability: f64,
}

/// EV of staking `stake` at decimal `odds` with win probability `p`.
///
/// `expected_return = p * odds * stake`, `ev = expected_return - stake`.
/// Percentages are zero when the stake is not positive; the implied
/// probability is zero for non-positive odds.
pub fn pick_ev(p: f64, odds: f64, stake: f64) -> OddsEv {
    let expected_return = p * odds * stake;
    let expected_value = expected_return - stake;
    OddsEv {
        win_probability: p,
        expected_value,
        ev_percent: if stake > 0.0 { expected_value / stake * 100.0 } else { 0.0 },
        expected_return,
        expected_loss: (1.0 - p) * stake,
        implied_probability: if odds > 0.0 { 1.0 / odds } else { 0.0 },
    }
}

/// EV of a parlay slip priced at `total_odds`, assuming independent legs.
/// An empty slip has no chance to win.
pub fn slip_ev(probs: &[f64], total_odds: f64, stake: f64) -> OddsEv {
    let p = if probs.is_empty() {
        0.0
    } else {
        probs.iter().product()
    };
    pick_ev(p, total_odds, stake)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlayPlan {
    pub size: usize,
    pub ev: f64,
    pub probability: f64,
    pub odds: f64,
    /// Indices into the caller's input lists.
    pub legs: Vec<usize>,
}

impl ParlayPlan {
    fn from_legs(probs: &[f64], odds: &[f64], legs: Vec<usize>) -> Self {
        let probability = legs.iter().map(|&i| probs[i]).product::<f64>();
        let parlay_odds = legs.iter().map(|&i| odds[i]).product::<f64>();
        Self {
            size: legs.len(),
            ev: probability * parlay_odds - 1.0,
            probability,
            odds: parlay_odds,
            legs,
        }
    }
}

fn check_lengths(probs: &[f64], odds: &[f64]) -> Result<()> {
    if probs.len() != odds.len() {
        return Err(GpicksError::LengthMismatch {
            left_name: "probs",
            left: probs.len(),
            right_name: "odds",
            right: odds.len(),
        });
    }
    Ok(())
}

/// Greedy parlay search: legs ranked by single-leg edge, best prefix wins.
///
/// Returns `None` for an empty input or `max_legs == 0`.
pub fn optimize_parlay_size(probs: &[f64], odds: &[f64], max_legs: usize) -> Result<Option<ParlayPlan>> {
    check_lengths(probs, odds)?;
    let mut order = (0..probs.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| {
        let ea = probs[a] * odds[a] - 1.0;
        let eb = probs[b] * odds[b] - 1.0;
        eb.partial_cmp(&ea).unwrap_or(Ordering::Equal)
    });

    let mut best: Option<ParlayPlan> = None;
    for size in 1..=max_legs.min(probs.len()) {
        let plan = ParlayPlan::from_legs(probs, odds, order[..size].to_vec());
        if best.as_ref().is_none_or(|b| plan.ev > b.ev) {
            best = Some(plan);
        }
    }
    Ok(best)
}

/// Exact search over every subset of at most `max_legs` legs.
pub fn optimize_parlay_exhaustive(
    probs: &[f64],
    odds: &[f64],
    max_legs: usize,
) -> Result<Option<ParlayPlan>> {
    check_lengths(probs, odds)?;
    let n = probs.len();
    if n > EXHAUSTIVE_LIMIT {
        return Err(GpicksError::PoolTooLarge {
            got: n,
            limit: EXHAUSTIVE_LIMIT,
        });
    }

    let mut best: Option<(f64, u32)> = None;
    for mask in 1u32..(1u32 << n) {
        if mask.count_ones() as usize > max_legs {
            continue;
        }
        let mut p = 1.0;
        let mut o = 1.0;
        for i in 0..n {
            if mask & (1 << i) != 0 {
                p *= probs[i];
                o *= odds[i];
            }
        }
        let ev = p * o - 1.0;
        if best.is_none_or(|(b, _)| ev > b) {
            best = Some((ev, mask));
        }
    }
    Ok(best.map(|(_, mask)| {
        let legs = (0..n).filter(|i| mask & (1 << i) != 0).collect();
        ParlayPlan::from_legs(probs, odds, legs)
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskTolerance {
    /// Unknown names fall back to medium.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "low" => RiskTolerance::Low,
            "high" => RiskTolerance::High,
            _ => RiskTolerance::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTolerance::Low => "low",
            RiskTolerance::Medium => "medium",
            RiskTolerance::High => "high",
        }
    }

    pub fn config(&self) -> RiskConfig {
        match self {
            RiskTolerance::Low => RiskConfig {
                max_legs: 3,
                min_prob: 0.6,
                kelly_fraction: 0.10,
            },
            RiskTolerance::Medium => RiskConfig {
                max_legs: 4,
                min_prob: 0.5,
                kelly_fraction: 0.25,
            },
            RiskTolerance::High => RiskConfig {
                max_legs: 6,
                min_prob: 0.4,
                kelly_fraction: 0.40,
            },
        }
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    pub max_legs: usize,
    pub min_prob: f64,
    pub kelly_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlayCandidate {
    pub id: String,
    pub win_probability: f64,
    pub odds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlayRecommendation {
    pub risk: RiskTolerance,
    pub config: RiskConfig,
    pub qualified: usize,
    /// Legs index into the full candidate list.
    pub plan: Option<ParlayPlan>,
    pub stake: f64,
}

/// Filters candidates by the risk preset's probability floor, optimises a
/// parlay over the survivors and sizes it with the preset's Kelly fraction.
/// The stake never exceeds `budget` and is zero without positive EV.
pub fn recommend_parlay_structure(
    candidates: &[ParlayCandidate],
    budget: f64,
    bankroll: f64,
    risk: RiskTolerance,
    max_pct: f64,
) -> Result<ParlayRecommendation> {
    let config = risk.config();
    let qualified = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.win_probability >= config.min_prob)
        .map(|(i, _)| i)
        .collect::<Vec<_>>();
    let probs = qualified
        .iter()
        .map(|&i| candidates[i].win_probability)
        .collect::<Vec<_>>();
    let odds = qualified.iter().map(|&i| candidates[i].odds).collect::<Vec<_>>();

    let plan = optimize_parlay_size(&probs, &odds, config.max_legs)?.map(|mut plan| {
        plan.legs = plan.legs.iter().map(|&i| qualified[i]).collect();
        plan
    });
    let stake = match &plan {
        Some(plan) if plan.ev > 0.0 => {
            let sized = kelly_stake(plan.probability, plan.odds, bankroll, config.kelly_fraction, max_pct);
            sized.stake.min(budget)
        }
        _ => 0.0,
    };

    Ok(ParlayRecommendation {
        risk,
        config,
        qualified: qualified.len(),
        plan,
        stake,
    })
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quarter_kelly_is_capped() {
        let k = kelly_stake(0.6, 2.0, 1000.0, 0.25, 0.05);
        // full = (0.6 - 0.4) / 1 = 0.2, quarter = 0.05
        assert_relative_eq!(k.full_kelly_pct, 20.0, epsilon = 1e-9);
        assert_relative_eq!(k.kelly_pct, 5.0, epsilon = 1e-9);
        assert_relative_eq!(k.stake, 50.0, epsilon = 1e-9);
        assert_relative_eq!(k.edge, 0.2, epsilon = 1e-12);

        let capped = kelly_stake(0.9, 3.0, 1000.0, 0.5, 0.05);
        assert_relative_eq!(capped.stake, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn negative_edge_stakes_nothing() {
        let k = kelly_stake(0.4, 2.0, 1000.0, 0.25, 0.05);
        assert_eq!(k.stake, 0.0);
        assert!(k.full_kelly_pct < 0.0);
        assert_relative_eq!(k.edge, -0.2, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(kelly_stake(0.6, 2.0, 0.0, 0.25, 0.05), KellyStake::default());
        assert_eq!(kelly_stake(0.6, 1.0, 100.0, 0.25, 0.05).stake, 0.0);
        assert_eq!(kelly_stake(0.0, 3.0, 100.0, 0.25, 0.05).stake, 0.0);
    }

    #[test]
    fn stake_never_exceeds_cap() {
        for pi in 1..20 {
            for oi in 0..20 {
                let p = pi as f64 / 20.0;
                let odds = 1.1 + oi as f64 * 0.5;
                let k = kelly_stake(p, odds, 500.0, 0.25, 0.05);
                assert!(k.stake >= 0.0);
                assert!(k.stake <= 0.05 * 500.0 + 1e-9);
                assert_relative_eq!(k.edge, p * odds - 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn greedy_returns_original_indices() {
        let probs = [0.5, 0.7, 0.6];
        let odds = [1.8, 1.9, 1.9];
        // edges: -0.10, 0.33, 0.14
        let plan = optimize_parlay_size(&probs, &odds, 3).unwrap().unwrap();
        assert_eq!(plan.legs, vec![1, 2]);
        assert_eq!(plan.size, 2);
        assert_relative_eq!(plan.probability, 0.42, epsilon = 1e-12);
        assert_relative_eq!(plan.odds, 3.61, epsilon = 1e-12);
        assert_relative_eq!(plan.ev, 0.42 * 3.61 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = optimize_parlay_size(&[0.5, 0.6], &[2.0], 3).unwrap_err();
        assert!(matches!(err, GpicksError::LengthMismatch { left: 2, right: 1, .. }));
        assert!(optimize_parlay_exhaustive(&[0.5], &[2.0, 2.0], 3).is_err());
        assert_eq!(optimize_parlay_size(&[], &[], 3).unwrap(), None);
    }

    #[test]
    fn exhaustive_is_never_worse_than_greedy() {
        let probs = [0.55, 0.62, 0.48, 0.70, 0.58, 0.66];
        let odds = [1.9, 1.7, 2.4, 1.5, 1.95, 1.8];
        for max_legs in 1..=6 {
            let greedy = optimize_parlay_size(&probs, &odds, max_legs).unwrap().unwrap();
            let exact = optimize_parlay_exhaustive(&probs, &odds, max_legs).unwrap().unwrap();
            assert!(exact.ev >= greedy.ev - 1e-12);
            assert!(exact.size <= max_legs);
        }
        let too_many = vec![0.5; 21];
        assert!(matches!(
            optimize_parlay_exhaustive(&too_many, &too_many, 3),
            Err(GpicksError::PoolTooLarge { got: 21, limit: 20 })
        ));
    }

    #[test]
    fn recommendation_maps_legs_back_to_candidates() {
        let candidates = vec![
            ParlayCandidate { id: "a".into(), win_probability: 0.45, odds: 3.0 },
            ParlayCandidate { id: "b".into(), win_probability: 0.65, odds: 1.9 },
            ParlayCandidate { id: "c".into(), win_probability: 0.62, odds: 1.9 },
        ];
        let rec = recommend_parlay_structure(&candidates, 40.0, 1000.0, RiskTolerance::Low, 0.05).unwrap();
        assert_eq!(rec.qualified, 2);
        let plan = rec.plan.unwrap();
        assert!(plan.legs.iter().all(|&i| i == 1 || i == 2));
        assert!(rec.stake > 0.0 && rec.stake <= 40.0);

        let tight = recommend_parlay_structure(&candidates, 1.0, 1000.0, RiskTolerance::High, 0.05).unwrap();
        assert_eq!(tight.qualified, 3);
        assert!(tight.stake <= 1.0);
    }

    #[test]
    fn no_edge_means_no_stake() {
        let candidates = vec![ParlayCandidate { id: "a".into(), win_probability: 0.55, odds: 1.5 }];
        let rec = recommend_parlay_structure(&candidates, 100.0, 1000.0, RiskTolerance::Medium, 0.05).unwrap();
        assert!(rec.plan.is_some());
        assert_eq!(rec.stake, 0.0);
        let empty = recommend_parlay_structure(&candidates, 100.0, 1000.0, RiskTolerance::Low, 0.05).unwrap();
        assert_eq!(empty.qualified, 0);
        assert!(empty.plan.is_none());
        assert_eq!(RiskTolerance::parse("weird"), RiskTolerance::Medium);
    }

    #[test]
    fn pick_ev_at_standard_juice() {
        let e = pick_ev(0.55, 1.91, 100.0);
        assert_relative_eq!(e.expected_return, 105.05, epsilon = 1e-9);
        assert_relative_eq!(e.expected_value, 5.05, epsilon = 1e-9);
        assert_relative_eq!(e.ev_percent, 5.05, epsilon = 1e-9);
        assert_relative_eq!(e.expected_loss, 45.0, epsilon = 1e-9);
        assert_relative_eq!(e.implied_probability, 1.0 / 1.91, epsilon = 1e-12);

        let zero = pick_ev(0.55, 0.0, 0.0);
        assert_eq!(zero.ev_percent, 0.0);
        assert_eq!(zero.implied_probability, 0.0);
    }

    #[test]
    fn slip_ev_multiplies_leg_probabilities() {
        let e = slip_ev(&[0.6, 0.65, 0.7], 6.0, 10.0);
        assert_relative_eq!(e.win_probability, 0.273, epsilon = 1e-12);
        assert_relative_eq!(e.expected_return, 0.273 * 60.0, epsilon = 1e-9);
        assert_relative_eq!(e.ev_percent, (0.273 * 6.0 - 1.0) * 100.0, epsilon = 1e-9);
        assert_eq!(slip_ev(&[], 6.0, 10.0).win_probability, 0.0);
    }
}
