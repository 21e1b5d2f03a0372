use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::params::ScoringParams;
use crate::pick::{RoleArchetype, StatType};

/// Games of history used by [`player_history`] when no window is given.
pub const DEFAULT_LOOKBACK: usize = 10;
pub const DEFAULT_TREND_WINDOW: usize = 5;
const MIN_HISTORY: usize = 3;

/// Standard deviation assumed around a projection.
///
/// `max(line * pct_of_line, absolute_floor) * archetype_volatility`, with the
/// table defaults for stats or archetypes the tuning set does not list.
pub fn sigma(params: &ScoringParams, stat: &StatType, line: f64, role: &RoleArchetype) -> f64 {
    let rule = params.sigma_rule(stat.as_str());
    let vol_mult = params.archetype_volatility(role.as_str());
    let base = (line * rule.pct_of_line).max(rule.absolute_floor);
    base * vol_mult
}

/// How a player's recent games sit against a prop line.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryStats {
    pub games: usize,
    pub mean: f64,
    /// Population standard deviation of the window.
    pub std_dev: f64,
    /// `(mean - line) / std_dev`, 0 for a flat history.
    pub z_score: f64,
    /// `|z_score|`
    pub sigma: f64,
    /// Share of games at or above the line.
    pub hit_rate: f64,
    /// `1 / (1 + std_dev)`, 1 for a flat history.
    pub consistency: f64,
}

/// Descriptive stats over the last `lookback` games. Fewer than three games
/// gives all zeros.
pub fn player_history(performances: &[f64], line: f64, lookback: usize) -> HistoryStats {
    if performances.len() < MIN_HISTORY {
        return HistoryStats::default();
    }
    let window = &performances[performances.len().saturating_sub(lookback.max(1))..];
    let mean = window.iter().mean();
    let std_dev = window.iter().population_std_dev();
    let z_score = if std_dev > 0.0 { (mean - line) / std_dev } else { 0.0 };
    let hits = window.iter().filter(|v| **v >= line).count();
    HistoryStats {
        games: window.len(),
        mean,
        std_dev,
        z_score,
        sigma: z_score.abs(),
        hit_rate: hits as f64 / window.len() as f64,
        consistency: if std_dev > 0.0 { 1.0 / (1.0 + std_dev) } else { 1.0 },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Trend {
    /// Least-squares slope per game.
    pub slope: f64,
    /// R² of the linear fit.
    pub strength: f64,
    /// Last game minus the mean of the games before it in the window.
    pub momentum: f64,
}

/// Linear trend over the last `window` games; zeros when the history is
/// shorter than the window or the window is under two games.
pub fn trend(performances: &[f64], window: usize) -> Trend {
    if window < 2 || performances.len() < window {
        return Trend::default();
    }
    let ys = &performances[performances.len() - window..];
    let n = ys.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = ys.iter().mean();
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (i, y) in ys.iter().enumerate() {
        let fit = slope * i as f64 + intercept;
        ss_res += (y - fit).powi(2);
        ss_tot += (y - mean_y).powi(2);
    }
    let strength = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };
    let earlier = ys[..ys.len() - 1].iter().mean();

    Trend {
        slope,
        strength,
        momentum: ys[ys.len() - 1] - earlier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn passing_yards_qb_matches_reference() {
        let params = ScoringParams::reference();
        let s = sigma(params, &StatType::PassingYards, 275.5, &RoleArchetype::Qb);
        assert_relative_eq!(s, 275.5 * 0.22 * 0.9, epsilon = 1e-9);
        assert_relative_eq!(s, 54.549, epsilon = 1e-3);
    }

    #[test]
    fn floor_applies_for_small_lines() {
        let params = ScoringParams::reference();
        let s = sigma(params, &StatType::Receptions, 2.5, &RoleArchetype::SlotWr);
        assert_relative_eq!(s, 1.2, epsilon = 1e-12);
    }

    #[test]
    fn unknown_categories_use_defaults() {
        let params = ScoringParams::reference();
        let stat = StatType::parse("tackles");
        let role = RoleArchetype::parse("lb1");
        assert_relative_eq!(sigma(params, &stat, 10.0, &role), 10.0 * 1.1, epsilon = 1e-12);
        assert_relative_eq!(sigma(params, &stat, 100.0, &role), 30.0 * 1.1, epsilon = 1e-12);
    }

    #[test]
    fn every_rule_respects_floor_and_scales_linearly_above_it() {
        let params = ScoringParams::reference();
        for (name, rule) in params.sigma_rules() {
            let stat = StatType::parse(name);
            for role in [RoleArchetype::AlphaWr, RoleArchetype::Te2, RoleArchetype::Other] {
                let vol = params.archetype_volatility(role.as_str());
                for line in [0.5, 5.0, 50.0, 500.0] {
                    let s = sigma(params, &stat, line, &role);
                    assert!(s >= rule.absolute_floor * vol - 1e-12);
                }
                let above = rule.absolute_floor / rule.pct_of_line * 2.0;
                let s1 = sigma(params, &stat, above, &role);
                let s2 = sigma(params, &stat, above * 2.0, &role);
                assert_relative_eq!(s2, s1 * 2.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn history_against_the_line() {
        let games = [40.0, 62.0, 71.0, 55.0, 58.0];
        let h = player_history(&games, 55.5, DEFAULT_LOOKBACK);
        assert_eq!(h.games, 5);
        assert_relative_eq!(h.mean, 57.2, epsilon = 1e-9);
        // population variance: (295.84 + 23.04 + 190.44 + 4.84 + 0.64) / 5
        assert_relative_eq!(h.std_dev, 102.96_f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(h.z_score, 1.7 / 102.96_f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(h.hit_rate, 0.6, epsilon = 1e-12);
        assert_relative_eq!(h.consistency, 1.0 / (1.0 + h.std_dev), epsilon = 1e-12);
    }

    #[test]
    fn history_uses_the_lookback_window_and_needs_three_games() {
        assert_eq!(player_history(&[10.0, 20.0], 5.0, 10), HistoryStats::default());
        let h = player_history(&[100.0, 100.0, 3.0, 4.0, 5.0], 4.0, 3);
        assert_eq!(h.games, 3);
        assert_relative_eq!(h.mean, 4.0, epsilon = 1e-12);
        assert_relative_eq!(h.hit_rate, 2.0 / 3.0, epsilon = 1e-12);

        let flat = player_history(&[7.0, 7.0, 7.0], 6.5, 10);
        assert_eq!(flat.z_score, 0.0);
        assert_eq!(flat.consistency, 1.0);
        assert_eq!(flat.hit_rate, 1.0);
    }

    #[test]
    fn trend_slope_strength_and_momentum() {
        let t = trend(&[0.0, 10.0, 20.0, 30.0, 40.0, 50.0], DEFAULT_TREND_WINDOW);
        assert_relative_eq!(t.slope, 10.0, epsilon = 1e-9);
        assert_relative_eq!(t.strength, 1.0, epsilon = 1e-9);
        // 50 - mean(10, 20, 30, 40)
        assert_relative_eq!(t.momentum, 25.0, epsilon = 1e-9);

        let flat = trend(&[5.0; 6], 5);
        assert_eq!(flat.slope, 0.0);
        assert_eq!(flat.strength, 0.0);
        assert_eq!(trend(&[1.0, 2.0], 5), Trend::default());
    }
}
