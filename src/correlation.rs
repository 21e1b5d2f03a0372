use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::params::ScoringParams;
use crate::pick::{GameScript, Pick, Position};

pub const NEUTRAL_TOTAL_LINE: f64 = 45.0;
const PARTNER_MIN_CORRELATION: f64 = 0.1;

/// Scenario a slip is evaluated under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptContext {
    pub name: String,
    pub total_line: f64,
}

impl ScriptContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total_line: NEUTRAL_TOTAL_LINE,
        }
    }

    pub fn with_total_line(mut self, total_line: f64) -> Self {
        self.total_line = total_line;
        self
    }

    pub fn script(&self) -> GameScript {
        GameScript::from_name(&self.name)
    }
}

impl Default for ScriptContext {
    fn default() -> Self {
        Self::new("neutral")
    }
}

/// Pairwise correlation source. Implementations are pure and symmetric.
pub trait CorrelationModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn pair_correlation(&self, a: &Pick, b: &Pick, ctx: &ScriptContext) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationKind {
    #[default]
    Priors,
    Position,
}

impl CorrelationKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "priors" | "stat" | "stat_pair" => Some(CorrelationKind::Priors),
            "position" | "positions" => Some(CorrelationKind::Position),
            _ => None,
        }
    }

    pub fn build(self, params: Arc<ScoringParams>) -> Box<dyn CorrelationModel> {
        match self {
            CorrelationKind::Priors => Box::new(StatPairPriors::new(params)),
            CorrelationKind::Position => Box::new(PositionModel::new(params)),
        }
    }
}

/// Signed priors keyed by `(stat_a, stat_b, script)`. The pair is looked up
/// in sorted order first, then reversed, so an asymmetric table still gives
/// one value per pair.
pub struct StatPairPriors {
    params: Arc<ScoringParams>,
}

impl StatPairPriors {
    pub fn new(params: Arc<ScoringParams>) -> Self {
        Self { params }
    }

    pub fn prior(&self, stat_a: &str, stat_b: &str, script: &str) -> f64 {
        let (lo, hi) = if stat_a <= stat_b { (stat_a, stat_b) } else { (stat_b, stat_a) };
        self.params
            .correlation_prior(lo, hi, script)
            .or_else(|| self.params.correlation_prior(hi, lo, script))
            .unwrap_or(0.0)
    }
}

impl CorrelationModel for StatPairPriors {
    fn name(&self) -> &'static str {
        "priors"
    }

    fn pair_correlation(&self, a: &Pick, b: &Pick, ctx: &ScriptContext) -> f64 {
        self.prior(a.stat_type.as_str(), b.stat_type.as_str(), &ctx.name)
    }
}

/// Position matrix scaled by team stacking, script fit and the game total.
pub struct PositionModel {
    params: Arc<ScoringParams>,
}

impl PositionModel {
    pub fn new(params: Arc<ScoringParams>) -> Self {
        Self { params }
    }

    /// Matrix cell for the pair in position order, falling back to the
    /// mirrored cell.
    fn base(&self, a: Position, b: Position) -> f64 {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.params
            .position_entry(lo, hi)
            .or_else(|| self.params.position_entry(hi, lo))
            .unwrap_or(0.0)
    }

    fn script_factor(&self, a: &Pick, b: &Pick, script: GameScript) -> f64 {
        let mult = |p: &Pick| {
            p.resolved_position()
                .map(|pos| self.params.script_multiplier(script, pos))
                .unwrap_or(1.0)
        };
        let (m1, m2) = (mult(a), mult(b));
        if m1 > 1.0 && m2 > 1.0 {
            1.2
        } else if m1 < 1.0 && m2 < 1.0 {
            1.1
        } else {
            0.9
        }
    }
}

impl CorrelationModel for PositionModel {
    fn name(&self) -> &'static str {
        "position"
    }

    fn pair_correlation(&self, a: &Pick, b: &Pick, ctx: &ScriptContext) -> f64 {
        let base = match (a.resolved_position(), b.resolved_position()) {
            (Some(pa), Some(pb)) => self.base(pa, pb),
            _ => 0.0,
        };
        let stack = if same_team(a, b) { 1.5 } else { 0.3 };
        let script = self.script_factor(a, b, ctx.script());
        let total = 1.0 + (ctx.total_line - NEUTRAL_TOTAL_LINE) * 0.01;
        (base * stack * script * total).clamp(-1.0, 1.0)
    }
}

fn same_team(a: &Pick, b: &Pick) -> bool {
    let ta = a.team.trim();
    let tb = b.team.trim();
    !ta.is_empty() && ta.eq_ignore_ascii_case(tb)
}

/// Symmetric n×n matrix with unit diagonal.
pub fn lineup_correlation_matrix(
    model: &dyn CorrelationModel,
    picks: &[Pick],
    ctx: &ScriptContext,
) -> Vec<Vec<f64>> {
    let n = picks.len();
    let mut out = vec![vec![0.0; n]; n];
    for i in 0..n {
        out[i][i] = 1.0;
        for j in (i + 1)..n {
            let c = model.pair_correlation(&picks[i], &picks[j], ctx);
            out[i][j] = c;
            out[j][i] = c;
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairCorrelation {
    pub correlation: f64,
    pub significance: f64,
    pub sample_size: usize,
}

/// Pearson correlation of two historical series plus a rough t-based
/// significance proxy in [0, 1].
pub fn empirical_pair_correlation(xs: &[f64], ys: &[f64]) -> PairCorrelation {
    if xs.len() != ys.len() || xs.len() < 3 {
        return PairCorrelation {
            correlation: 0.0,
            significance: 0.0,
            sample_size: 0,
        };
    }
    let n = xs.len();
    let nf = n as f64;
    let mean_x = xs.iter().sum::<f64>() / nf;
    let mean_y = ys.iter().sum::<f64>() / nf;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    let denom = (var_x * var_y).sqrt();
    let r = if denom > 0.0 {
        (cov / denom).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    let t_stat = if r.abs() < 1.0 {
        r * ((nf - 2.0) / (1.0 - r * r)).sqrt()
    } else {
        0.0
    };
    PairCorrelation {
        correlation: r,
        significance: (t_stat.abs() / 2.0).min(1.0),
        sample_size: n,
    }
}

/// Probability of each game script given pace, spread and total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptPriors {
    pub shootout: f64,
    pub control: f64,
    pub neutral: f64,
    pub blowout: f64,
    pub defensive: f64,
}

impl Default for ScriptPriors {
    fn default() -> Self {
        Self {
            shootout: 0.25,
            control: 0.35,
            neutral: 0.30,
            blowout: 0.07,
            defensive: 0.03,
        }
    }
}

impl ScriptPriors {
    pub fn get(&self, script: GameScript) -> f64 {
        match script {
            GameScript::Shootout => self.shootout,
            GameScript::Control => self.control,
            GameScript::Neutral => self.neutral,
            GameScript::Blowout => self.blowout,
            GameScript::Defensive => self.defensive,
        }
    }

    pub fn most_likely(&self) -> GameScript {
        GameScript::ALL
            .into_iter()
            .max_by(|a, b| self.get(*a).partial_cmp(&self.get(*b)).unwrap_or(Ordering::Equal))
            .unwrap_or(GameScript::Neutral)
    }

    fn total(&self) -> f64 {
        self.shootout + self.control + self.neutral + self.blowout + self.defensive
    }
}

pub fn game_script_priors(team_pace: f64, opp_pace: f64, spread: f64, total_line: f64) -> ScriptPriors {
    let mut p = ScriptPriors::default();

    if total_line > 50.0 {
        p.shootout += 0.15;
        p.defensive -= 0.05;
        p.control -= 0.10;
    } else if total_line < 42.0 {
        p.defensive += 0.10;
        p.control += 0.10;
        p.shootout -= 0.15;
        p.neutral -= 0.05;
    }

    if spread.abs() > 7.0 {
        p.blowout += 0.10;
        p.neutral -= 0.05;
        p.control -= 0.05;
    }

    let avg_pace = (team_pace + opp_pace) / 2.0;
    if avg_pace > 68.0 {
        p.shootout += 0.05;
        p.control -= 0.05;
    } else if avg_pace < 62.0 {
        p.control += 0.05;
        p.shootout -= 0.05;
    }

    // Stacked adjustments can push a small bucket below zero.
    for v in [
        &mut p.shootout,
        &mut p.control,
        &mut p.neutral,
        &mut p.blowout,
        &mut p.defensive,
    ] {
        *v = v.max(0.0);
    }
    let total = p.total();
    ScriptPriors {
        shootout: p.shootout / total,
        control: p.control / total,
        neutral: p.neutral / total,
        blowout: p.blowout / total,
        defensive: p.defensive / total,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub pick_id: String,
    pub player: String,
    pub correlation: f64,
    pub ev_boost: f64,
}

/// Strongest positively correlated partners for an anchor pick.
pub fn best_partners(
    model: &dyn CorrelationModel,
    anchor: &Pick,
    pool: &[Pick],
    ctx: &ScriptContext,
    max: usize,
) -> Vec<Partner> {
    let mut out = pool
        .iter()
        .filter(|p| p.id != anchor.id)
        .filter_map(|p| {
            let correlation = model.pair_correlation(anchor, p, ctx);
            (correlation > PARTNER_MIN_CORRELATION).then(|| Partner {
                pick_id: p.id.clone(),
                player: p.player.clone(),
                correlation,
                ev_boost: correlation * 0.1,
            })
        })
        .collect::<Vec<_>>();
    out.sort_by(|a, b| {
        b.correlation
            .partial_cmp(&a.correlation)
            .unwrap_or(Ordering::Equal)
    });
    out.truncate(max);
    out
}
